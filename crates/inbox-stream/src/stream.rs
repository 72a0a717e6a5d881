//! Streaming event types and utilities

use serde::{Deserialize, Serialize};

/// Events decoded from a generation stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental piece of generated text
    Fragment { text: String },
    /// Backend signalled the end of the response
    Done,
    /// Backend reported a fatal error
    Error { message: String },
}

impl StreamEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}

/// Accumulates fragments of one response
#[derive(Debug, Default, Clone)]
pub struct TextAccumulator {
    text: String,
    fragments: usize,
}

impl TextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of fragments received
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Whether no text has arrived at all
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
