//! Event types for streaming operations and the assistant panel

use serde::{Deserialize, Serialize};

use crate::{history::Turn, outcome::Outcome};

/// Events emitted by a single streaming operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A connection attempt started (1-based)
    Sending { attempt: u32 },

    /// The previous attempt failed to connect and will be retried
    Retrying {
        attempt: u32,
        delay_ms: u64,
        error: String,
    },

    /// The first chunk of the response arrived
    Streaming,

    /// Accumulated text after a newly accepted fragment
    Partial { text: String },

    /// The operation ended; always the last event
    Finished { outcome: Outcome },
}

/// Events broadcast by the assistant to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantEvent {
    /// An analysis or question was sent to the backend
    OperationStarted { prompt_len: usize },

    /// A connection attempt failed and will be retried
    Retrying { attempt: u32, error: String },

    /// Accumulated assistant text so far
    Partial { text: String },

    /// A turn was appended to the history
    TurnAppended { turn: Turn },
}
