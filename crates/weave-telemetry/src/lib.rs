//! # weave-telemetry
//!
//! Event bus for collision telemetry. The driver emits structured
//! events (substeps, grid builds, resolved contacts, frame timing)
//! that pluggable sinks consume.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{CollisionEvent, EventKind};
pub use sinks::{EventSink, TracingSink, VecSink};
