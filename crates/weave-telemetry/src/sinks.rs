//! Pluggable event sinks.

use crate::events::{CollisionEvent, EventKind};

/// Consumer of collision events.
pub trait EventSink: Send {
    fn handle(&mut self, event: &CollisionEvent);

    /// Called once the run ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    fn name(&self) -> &str;
}

/// Collects events in memory for tests and inspection.
#[derive(Debug, Default)]
pub struct VecSink {
    pub events: Vec<CollisionEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events of frame `frame`, in emission order.
    pub fn frame(&self, frame: u32) -> impl Iterator<Item = &CollisionEvent> {
        self.events.iter().filter(move |e| e.frame == frame)
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &CollisionEvent) {
        self.events.push(event.clone());
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// Forwards events to `tracing`.
///
/// Per-substep events go out at `debug`, frame completions at `info`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &CollisionEvent) {
        match &event.kind {
            EventKind::FrameCompleted { wall_time_ms } => {
                tracing::info!(frame = event.frame, wall_time_ms, "frame_completed");
            }
            kind => {
                tracing::debug!(frame = event.frame, event = ?kind, "collision_event");
            }
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
