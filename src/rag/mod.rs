//! Retrieval-augmented answers: prompt formatting and the engine lifecycle.

pub mod engine;
pub mod prompt;

pub use engine::{ChatOutcome, EngineDebugInfo, EngineState, RagEngine, build_engine};
pub use prompt::{ChatRole, HistoryEntry};
