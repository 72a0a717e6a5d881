//! Terminal outcomes of streaming operations

use serde::{Deserialize, Serialize};

/// Rendered in place of a completed response that carried no text
pub const EMPTY_COMPLETION: &str = "The model finished without a response.";

/// Why an operation was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// A newer operation was started on the same client
    Superseded,
    /// The user asked to stop
    User,
    /// No data arrived within the inactivity window
    Timeout { after_secs: u64 },
}

/// How an operation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeKind {
    Completed,
    Cancelled { reason: CancelReason },
    Failed { error: String },
}

/// Input was cut down before prompting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    /// Messages in scope
    pub total: usize,
    /// Most recent messages actually sent
    pub kept: usize,
}

/// The single final result of a streaming operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub kind: OutcomeKind,
    /// Text accumulated before the operation ended, possibly partial
    pub text: String,
    /// Connection attempts made, including retries
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation: Option<Truncation>,
}

impl Outcome {
    pub fn completed(text: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Completed, text)
    }

    pub fn cancelled(reason: CancelReason, text: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Cancelled { reason }, text)
    }

    pub fn failed(error: impl ToString, text: impl Into<String>) -> Self {
        Self::new(
            OutcomeKind::Failed {
                error: error.to_string(),
            },
            text,
        )
    }

    fn new(kind: OutcomeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            attempts: 1,
            truncation: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.kind, OutcomeKind::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, OutcomeKind::Cancelled { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.kind, OutcomeKind::Failed { .. })
    }

    /// Short tag describing how an unsuccessful operation ended
    pub fn annotation(&self) -> Option<String> {
        match &self.kind {
            OutcomeKind::Completed => None,
            OutcomeKind::Cancelled { reason } => Some(match reason {
                CancelReason::Superseded => "[superseded by a newer request]".to_string(),
                CancelReason::User => "[request cancelled]".to_string(),
                CancelReason::Timeout { after_secs } => {
                    format!("[timed out after {}s without data]", after_secs)
                }
            }),
            OutcomeKind::Failed { error } => Some(format!("[error: {}]", error)),
        }
    }

    /// Note describing input truncation, if any
    pub fn truncation_note(&self) -> Option<String> {
        self.truncation.map(|t| {
            format!(
                "[Analyzed only the most recent {} of {} messages]",
                t.kept, t.total
            )
        })
    }

    /// Human-readable text for the assistant turn.
    ///
    /// Partial text is always kept; unsuccessful endings append their
    /// annotation, and the truncation note is prepended when input was cut.
    pub fn render(&self) -> String {
        let text = self.text.trim();
        let body = match (self.annotation(), text.is_empty()) {
            (None, false) => text.to_string(),
            (None, true) => EMPTY_COMPLETION.to_string(),
            (Some(annotation), false) => format!("{}\n\n{}", text, annotation),
            (Some(_), true) => match &self.kind {
                OutcomeKind::Cancelled {
                    reason: CancelReason::Superseded,
                } => "Request replaced by a newer one.".to_string(),
                OutcomeKind::Cancelled {
                    reason: CancelReason::Timeout { after_secs },
                } => format!("Request timed out: no data for {}s.", after_secs),
                OutcomeKind::Failed { error } => format!("Error: {}", error),
                _ => "Request cancelled.".to_string(),
            },
        };

        match self.truncation_note() {
            Some(note) => format!("{}\n\n{}", note, body),
            None => body,
        }
    }
}
