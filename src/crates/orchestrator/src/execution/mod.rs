//! Analysis Execution Module
//!
//! Streams the word-sense stage, runs the remaining stages concurrently and
//! merges everything into one ordered event feed.

pub mod events;
pub mod streaming;

pub use events::AnalysisEvent;
pub use streaming::{
    AnalysisOrchestrator, AnalysisStream, AnalysisStreamHandler, DEFAULT_EVENT_BUFFER,
};
