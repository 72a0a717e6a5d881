//! inbox-assistant: AI assistant over the inbox
//!
//! This crate builds analysis and question prompts from inbox state, runs
//! them as cancellable streaming operations, and records the exchange in a
//! transient turn history.

pub mod assistant;
pub mod client;
pub mod error;
pub mod events;
pub mod handle;
pub mod history;
pub mod outcome;
pub mod prompt;

#[cfg(test)]
mod testing;

pub use assistant::{Assistant, AssistantConfig, NOTHING_TO_ANALYZE};
pub use client::{ClientConfig, OperationStream, RetryConfig, StreamingClient};
pub use error::{Error, Result};
pub use events::{AssistantEvent, ClientEvent};
pub use handle::{ClientHandle, Phase};
pub use history::{Role, Turn, TurnHistory};
pub use outcome::{CancelReason, EMPTY_COMPLETION, Outcome, OutcomeKind, Truncation};
pub use prompt::{AnalysisLimits, AnalysisRequest, AnalysisScope};
