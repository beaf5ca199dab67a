//! Execution engine adapters.

mod paper;

pub use paper::PaperEngine;
