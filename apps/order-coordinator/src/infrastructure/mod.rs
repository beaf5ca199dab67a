//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - `broadcast/`: the order event hub (implements `OrderEventStream`)
//! - `engine/`: the in-process paper execution engine (implements
//!   `ExecutionEnginePort`)

pub mod broadcast;
pub mod engine;
