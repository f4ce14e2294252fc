//! Structured run/node lifecycle events with pluggable sinks.
//!
//! Producers (the runner, the scheduler, handlers via
//! [`HandlerContext`](crate::handler::HandlerContext)) push [`Event`]s into a
//! flume channel; a background listener task broadcasts each event to every
//! configured [`EventSink`].

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::{EventBus, EventBusConfig, SinkConfig};
pub use event::{Event, NodeEvent, RUN_COMPLETE_SCOPE, RUN_START_SCOPE};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
