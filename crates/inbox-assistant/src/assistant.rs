//! The assistant panel: analyses and questions over the inbox

use std::sync::Arc;

use futures::StreamExt;
use inbox_store::InboxState;
use inbox_stream::{HttpBackend, HttpBackendConfig, StreamBackend};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::{
    client::{ClientConfig, StreamingClient},
    error::Result,
    events::{AssistantEvent, ClientEvent},
    handle::ClientHandle,
    history::{Turn, TurnHistory},
    outcome::{CancelReason, Outcome, Truncation},
    prompt::{self, AnalysisLimits, AnalysisScope},
};

/// Shown instead of a request when an analysis has nothing to cover
pub const NOTHING_TO_ANALYZE: &str = "No messages to analyze.";

/// Assistant configuration
#[derive(Debug, Clone, Default)]
pub struct AssistantConfig {
    pub client: ClientConfig,
    pub limits: AnalysisLimits,
}

/// Runs analyses and questions, keeping a transient turn history.
///
/// Outcomes are appended to the history only; the inbox conversations
/// are never written to.
pub struct Assistant {
    client: StreamingClient,
    limits: AnalysisLimits,
    history: Mutex<TurnHistory>,
    event_tx: broadcast::Sender<AssistantEvent>,
}

impl Assistant {
    pub fn new(backend: Arc<dyn StreamBackend>, config: AssistantConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            client: StreamingClient::new(backend, config.client),
            limits: config.limits,
            history: Mutex::new(TurnHistory::new()),
            event_tx,
        }
    }

    /// Create an assistant talking to an HTTP streaming endpoint
    pub fn http(backend: HttpBackendConfig, config: AssistantConfig) -> Result<Self> {
        let backend = HttpBackend::new(backend)?;
        Ok(Self::new(Arc::new(backend), config))
    }

    /// Subscribe to assistant events
    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle onto the running operation
    pub fn handle(&self) -> ClientHandle {
        self.client.handle()
    }

    /// Cancel the operation in flight, if any
    pub fn cancel(&self) {
        self.client.cancel();
    }

    pub fn history(&self) -> Vec<Turn> {
        self.history.lock().turns().to_vec()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Analyze messages of the active conversation.
    ///
    /// Returns `None` without contacting the backend when nothing is in
    /// scope; a single explanatory turn is appended instead.
    pub async fn analyze(&self, state: &InboxState, scope: AnalysisScope) -> Option<Outcome> {
        let Some(request) = prompt::build_analysis(state, scope, &self.limits) else {
            tracing::debug!(%scope, "Nothing to analyze");
            self.append(Turn::assistant(NOTHING_TO_ANALYZE));
            return None;
        };

        self.append(Turn::user(format!(
            "Analyze {} messages ({})",
            scope, request.count
        )));
        Some(self.run(request.prompt, request.truncation).await)
    }

    /// Ask a free-form question about the active conversation.
    ///
    /// Blank questions are ignored.
    pub async fn ask(&self, state: &InboxState, question: &str) -> Option<Outcome> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        let prompt = prompt::build_question(state, question, &self.limits);
        self.append(Turn::user(question));
        Some(self.run(prompt, None).await)
    }

    async fn run(&self, prompt: String, truncation: Option<Truncation>) -> Outcome {
        let _ = self.event_tx.send(AssistantEvent::OperationStarted {
            prompt_len: prompt.len(),
        });

        let mut stream = self.client.start(prompt);
        let mut finished = None;
        while let Some(event) = stream.next().await {
            match event {
                ClientEvent::Partial { text } => {
                    let _ = self.event_tx.send(AssistantEvent::Partial { text });
                }
                ClientEvent::Retrying { attempt, error, .. } => {
                    let _ = self.event_tx.send(AssistantEvent::Retrying { attempt, error });
                }
                ClientEvent::Finished { outcome } => {
                    finished = Some(outcome);
                    break;
                }
                ClientEvent::Sending { .. } | ClientEvent::Streaming => {}
            }
        }

        let mut outcome =
            finished.unwrap_or_else(|| Outcome::cancelled(CancelReason::User, String::new()));
        outcome.truncation = truncation;
        self.append(Turn::assistant(outcome.render()));
        outcome
    }

    fn append(&self, turn: Turn) {
        self.history.lock().push(turn.clone());
        let _ = self.event_tx.send(AssistantEvent::TurnAppended { turn });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        history::Role,
        outcome::OutcomeKind,
        testing::{Attempt, ScriptedBackend, Step, done, fragment},
    };
    use chrono::{Duration, TimeZone, Utc};
    use inbox_store::{Command, Conversation, Message, MessageBody};

    fn inbox(count: usize, unread: usize) -> InboxState {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let messages: Vec<_> = (0..count)
            .map(|i| {
                Message::incoming(
                    format!("m{}", i),
                    MessageBody::text(format!("message {}", i)),
                    base + Duration::minutes(i as i64),
                )
                .with_read(i + unread < count)
            })
            .collect();

        InboxState::default()
            .apply(Command::SetConversations(vec![Conversation::new("c1", "Bob", base)]))
            .unwrap()
            .apply(Command::SetMessages {
                conversation_id: "c1".into(),
                messages,
            })
            .unwrap()
            .apply(Command::SelectConversation("c1".into()))
            .unwrap()
    }

    fn assistant(backend: &Arc<ScriptedBackend>) -> Assistant {
        Assistant::new(backend.clone(), AssistantConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_appends_user_and_assistant_turns() {
        let backend = Arc::new(ScriptedBackend::new(vec![Attempt::Respond(vec![
            fragment("Hel"),
            fragment("lo, wor"),
            fragment("ld"),
            done(),
        ])]));
        let assistant = assistant(&backend);
        let state = inbox(5, 2);

        let outcome = assistant.analyze(&state, AnalysisScope::Unread).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.text, "Hello, world");

        let history = assistant.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "Hello, world");

        let prompts = backend.prompts();
        assert!(prompts[0].contains("1. Contact: message 3"));
        assert!(prompts[0].contains("2. Contact: message 4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_to_analyze_skips_backend() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let assistant = assistant(&backend);
        let state = inbox(5, 0);

        assert!(assistant.analyze(&state, AnalysisScope::Unread).await.is_none());
        assert_eq!(backend.opened(), 0);

        let history = assistant.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Assistant);
        assert_eq!(history[0].content, NOTHING_TO_ANALYZE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_truncated_analysis_reports_note() {
        let backend = Arc::new(ScriptedBackend::new(vec![Attempt::Respond(vec![
            fragment("Long thread."),
            done(),
        ])]));
        let assistant = assistant(&backend);
        let state = inbox(150, 0);

        let outcome = assistant.analyze(&state, AnalysisScope::All).await.unwrap();
        assert_eq!(outcome.truncation, Some(Truncation { total: 150, kept: 100 }));

        let prompt = &backend.prompts()[0];
        assert_eq!(prompt.lines().filter(|l| l.contains(". Contact: ")).count(), 100);

        let history = assistant.history();
        assert!(history[1].content.starts_with("[Analyzed only the most recent 100 of 150 messages]"));
        assert!(history[1].content.ends_with("Long thread."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_question_is_ignored() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let assistant = assistant(&backend);
        assert!(assistant.ask(&inbox(3, 0), "   ").await.is_none());
        assert!(assistant.history().is_empty());
        assert_eq!(backend.opened(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_question_failure_still_produces_one_turn() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Attempt::Refuse,
            Attempt::Refuse,
            Attempt::Refuse,
        ]));
        let assistant = assistant(&backend);
        let mut events = assistant.subscribe();

        let outcome = assistant.ask(&inbox(3, 0), "What now?").await.unwrap();
        assert!(outcome.is_failed());
        assert_eq!(outcome.attempts, 3);

        let history = assistant.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "What now?");
        assert!(history[1].content.starts_with("Error: Connection failed"));

        let mut retries = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, AssistantEvent::Retrying { .. }) {
                retries += 1;
            }
        }
        assert_eq!(retries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partials_are_broadcast() {
        let backend = Arc::new(ScriptedBackend::new(vec![Attempt::Respond(vec![
            fragment("a"),
            fragment("b"),
            done(),
        ])]));
        let assistant = assistant(&backend);
        let mut events = assistant.subscribe();

        assistant.ask(&inbox(3, 0), "Summarize").await.unwrap();

        let mut partials = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let AssistantEvent::Partial { text } = event {
                partials.push(text);
            }
        }
        assert_eq!(partials, vec!["a", "ab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_operation_supersedes_running_one() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Attempt::Respond(vec![fragment("old"), Step::Hang]),
            Attempt::Respond(vec![fragment("new"), done()]),
        ]));
        let assistant = assistant(&backend);
        let state = inbox(3, 0);

        let (first, second) = tokio::join!(
            assistant.ask(&state, "first"),
            assistant.ask(&state, "second"),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(
            first.kind,
            OutcomeKind::Cancelled {
                reason: CancelReason::Superseded
            }
        );
        assert_eq!(first.text, "old");
        assert!(second.is_completed());
        assert_eq!(second.text, "new");

        let replies: Vec<_> = assistant
            .history()
            .into_iter()
            .filter(|t| t.role == Role::Assistant)
            .collect();
        assert_eq!(replies.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_partial_text() {
        let backend = Arc::new(ScriptedBackend::new(vec![Attempt::Respond(vec![
            fragment("Partial resu"),
            Step::Hang,
        ])]));
        let assistant = Arc::new(assistant(&backend));
        let mut events = assistant.subscribe();

        let task = {
            let assistant = Arc::clone(&assistant);
            let state = inbox(3, 0);
            tokio::spawn(async move { assistant.ask(&state, "Summarize").await })
        };

        loop {
            if let Ok(AssistantEvent::Partial { .. }) = events.recv().await {
                break;
            }
        }
        assistant.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(
            outcome.kind,
            OutcomeKind::Cancelled {
                reason: CancelReason::User
            }
        );
        let history = assistant.history();
        assert_eq!(history.last().unwrap().content, "Partial resu\n\n[request cancelled]");
    }
}
