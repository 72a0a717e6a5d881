//! Prompt construction for analyses and questions

use std::{fmt::Write, str::FromStr};

use inbox_store::{InboxState, Message};
use serde::{Deserialize, Serialize};

use crate::{error::Error, outcome::Truncation};

/// Which messages of the active conversation an analysis covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisScope {
    /// Unread incoming messages
    Unread,
    /// The current selection
    Selected,
    /// The whole conversation
    All,
}

impl AnalysisScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisScope::Unread => "unread",
            AnalysisScope::Selected => "selected",
            AnalysisScope::All => "all",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            AnalysisScope::Unread => "new unread messages",
            AnalysisScope::Selected => "selected messages",
            AnalysisScope::All => "entire conversation",
        }
    }
}

impl std::fmt::Display for AnalysisScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unread" | "new" => Ok(AnalysisScope::Unread),
            "selected" | "selection" => Ok(AnalysisScope::Selected),
            "all" => Ok(AnalysisScope::All),
            other => Err(Error::InvalidScope(other.to_string())),
        }
    }
}

/// Input limits for prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisLimits {
    /// Inputs larger than this are truncated
    pub cap: usize,
    /// Most recent messages kept after truncation
    pub keep: usize,
    /// Recent messages included as context for a question
    pub ask_context: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            cap: 120,
            keep: 100,
            ask_context: 10,
        }
    }
}

/// A prompt ready to send, with what went into it
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub scope: AnalysisScope,
    pub prompt: String,
    /// Messages included in the prompt
    pub count: usize,
    pub truncation: Option<Truncation>,
}

/// Messages of the active conversation covered by `scope`, oldest first
pub fn scoped_messages(state: &InboxState, scope: AnalysisScope) -> Vec<&Message> {
    match scope {
        AnalysisScope::Unread => state
            .active_messages()
            .iter()
            .filter(|m| !m.is_outgoing && m.is_unread())
            .collect(),
        AnalysisScope::Selected => state.selected_messages(),
        AnalysisScope::All => state.active_messages().iter().collect(),
    }
}

/// Build the analysis prompt for `scope`, or `None` when nothing is in scope
pub fn build_analysis(
    state: &InboxState,
    scope: AnalysisScope,
    limits: &AnalysisLimits,
) -> Option<AnalysisRequest> {
    let mut messages = scoped_messages(state, scope);
    if messages.is_empty() {
        return None;
    }

    let total = messages.len();
    let truncation = if total > limits.cap {
        let keep = limits.keep.clamp(1, limits.cap.max(1));
        messages.drain(..total - keep);
        tracing::debug!(total, keep, "Truncating analysis input");
        Some(Truncation { total, kept: keep })
    } else {
        None
    };

    let conversation = state
        .active_conversation()
        .map(|c| c.name.as_str())
        .unwrap_or("this conversation");

    let mut prompt = format!(
        "Analyze the following {} from the chat with {}.\n\
         Summarize the key points, call out questions or requests that need an answer, \
         and suggest what to reply.\n\nMessages:\n",
        scope.describe(),
        conversation
    );
    for (i, message) in messages.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, render_line(message));
    }

    Some(AnalysisRequest {
        scope,
        count: messages.len(),
        prompt,
        truncation,
    })
}

/// Build a prompt answering `question` in the context of the most recent
/// messages of the active conversation
pub fn build_question(state: &InboxState, question: &str, limits: &AnalysisLimits) -> String {
    let messages = state.active_messages();
    let recent = &messages[messages.len().saturating_sub(limits.ask_context)..];

    let mut prompt = String::new();
    if !recent.is_empty() {
        prompt.push_str("Recent messages:\n");
        for message in recent {
            let _ = writeln!(prompt, "{}", render_line(message));
        }
        prompt.push('\n');
    }
    let _ = write!(prompt, "Question: {}", question.trim());
    prompt
}

fn render_line(message: &Message) -> String {
    let author = if message.is_outgoing { "Me" } else { "Contact" };
    format!("{}: {}", author, message.body.preview())
}
