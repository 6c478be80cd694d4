//! Event bus: channel-backed dispatch to pluggable sinks.
//!
//! Producers hold a cloned [`Sender`] and may emit from worker threads.
//! Events are delivered to sinks only when the owner flushes.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::events::CollisionEvent;
use crate::sinks::EventSink;

/// Channel-backed bus carrying collision events to registered sinks.
pub struct EventBus {
    sender: Sender<CollisionEvent>,
    receiver: Receiver<CollisionEvent>,
    sinks: Vec<Box<dyn EventSink>>,
    /// A disabled bus drops events on emit.
    enabled: bool,
}

impl EventBus {
    /// Creates an enabled bus with no sinks.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            sinks: Vec::new(),
            enabled: true,
        }
    }

    /// Registers a sink to receive flushed events.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Enables or disables the bus. A disabled bus drops emitted events.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns true if the bus is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Handle for emitting from other threads. Ignores [`set_enabled`](Self::set_enabled).
    pub fn sender(&self) -> Sender<CollisionEvent> {
        self.sender.clone()
    }

    /// Queues an event. No-op while the bus is disabled.
    pub fn emit(&self, event: CollisionEvent) {
        if !self.enabled {
            return;
        }
        // The receiver lives as long as the bus, so sending cannot fail.
        let _ = self.sender.send(event);
    }

    /// Takes every pending event without dispatching it.
    pub fn drain(&mut self) -> Vec<CollisionEvent> {
        self.receiver.try_iter().collect()
    }

    /// Dispatches pending events to all registered sinks.
    pub fn flush(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            for sink in &mut self.sinks {
                sink.handle(&event);
            }
        }
    }

    /// Dispatches pending events to `sink` only.
    pub fn flush_to(&mut self, sink: &mut dyn EventSink) {
        for event in self.receiver.try_iter() {
            sink.handle(&event);
        }
    }

    /// Flushes, then finalizes every registered sink.
    pub fn finalize(&mut self) {
        self.flush();
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    /// Returns the number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
