//! Application Layer
//!
//! Orchestrates the domain through ports:
//!
//! - **Ports**: the execution engine and its event stream
//! - **Commands**: one engine call resolved from the event stream
//! - **Compose**: parallel and sequential combination of command outcomes
//! - **Use Cases**: merge and close orchestrations over positions
//! - **Services**: the coordinator owning registry, executor and tasks

pub mod commands;
pub mod compose;
pub mod ports;
pub mod services;
pub mod use_cases;
