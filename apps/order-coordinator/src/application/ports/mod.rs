//! Application Ports (Driven)
//!
//! Ports define interfaces for interacting with external systems:
//! - the execution engine that accepts order calls
//! - the order event stream that reports their outcomes

mod engine_port;
mod event_stream_port;

pub use engine_port::{EngineError, ExecutionEnginePort, OrderSpec};
pub use event_stream_port::{OrderEventSink, OrderEventStream};
