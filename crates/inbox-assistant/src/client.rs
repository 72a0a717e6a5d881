//! Streaming operations against a generation backend
//!
//! A [`StreamingClient`] runs at most one operation at a time. Starting a
//! new operation cancels the one in flight. Every operation ends with
//! exactly one [`ClientEvent::Finished`] carrying its [`Outcome`].

use std::{pin::Pin, sync::Arc, time::Duration};

use async_stream::stream;
use futures::StreamExt;
use inbox_stream::{Error, StreamBackend, StreamEvent, TextAccumulator, WireDecoder};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::Stream;

use crate::{
    events::ClientEvent,
    handle::{ClientHandle, OperationGuard, Phase},
    outcome::{CancelReason, Outcome, OutcomeKind},
};

/// Retry configuration for connection failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Configuration for streaming operations
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub retry: RetryConfig,
    /// Cancel when no data arrives for this long
    pub inactivity_timeout: Duration,
    /// How often the inactivity check runs
    pub tick: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            inactivity_timeout: Duration::from_secs(60),
            tick: Duration::from_secs(1),
        }
    }
}

/// A stream of events for one operation
pub type OperationStream = Pin<Box<dyn Stream<Item = ClientEvent> + Send>>;

/// Why reading the response stopped
enum Ending {
    Done,
    EndOfData,
    Cancelled(CancelReason),
    Failed(Error),
}

enum Wake {
    Idle,
    Stop(CancelReason),
    Chunk(Option<inbox_stream::Result<Vec<u8>>>),
}

/// Runs prompts against a backend, one operation at a time
pub struct StreamingClient {
    backend: Arc<dyn StreamBackend>,
    config: ClientConfig,
    handle: ClientHandle,
}

impl StreamingClient {
    pub fn new(backend: Arc<dyn StreamBackend>, config: ClientConfig) -> Self {
        Self {
            backend,
            config,
            handle: ClientHandle::new(),
        }
    }

    /// Get a cloneable handle for observing or aborting operations
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Cancel the operation in flight, if any.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Start an operation for `prompt`.
    ///
    /// The previous operation, if still running, is cancelled immediately
    /// and reports [`CancelReason::Superseded`] on its own stream. Dropping
    /// the returned stream aborts the request.
    pub fn start(&self, prompt: impl Into<String>) -> OperationStream {
        let prompt = prompt.into();
        let control = self.handle.begin();
        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();
        let handle = self.handle.clone();
        let guard = OperationGuard {
            handle: handle.clone(),
            control: Arc::clone(&control),
        };

        Box::pin(stream! {
            let _guard = guard;
            let id = control.id;
            let timeout = CancelReason::Timeout {
                after_secs: config.inactivity_timeout.as_secs(),
            };

            let mut ticker = tokio::time::interval(config.tick.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_activity = Instant::now();
            let mut text = TextAccumulator::new();
            let mut attempt = 0u32;

            let mut outcome = 'operation: loop {
                handle.set_phase(id, Phase::Sending);
                yield ClientEvent::Sending { attempt: attempt + 1 };

                let open = backend.open(&prompt);
                tokio::pin!(open);
                let opened = loop {
                    tokio::select! {
                        biased;
                        _ = control.token.cancelled() => break Err(control.reason()),
                        result = &mut open => break Ok(result),
                        _ = ticker.tick() => {
                            if last_activity.elapsed() >= config.inactivity_timeout {
                                break Err(timeout);
                            }
                        }
                    }
                };

                let mut body = match opened {
                    Err(reason) => break 'operation Outcome::cancelled(reason, text.text()),
                    Ok(Ok(body)) => body,
                    Ok(Err(e)) if e.is_transient() && attempt < config.retry.max_retries => {
                        attempt += 1;
                        tracing::warn!(
                            "Connection failed (attempt {}/{}): {}. Retrying in {:?}...",
                            attempt,
                            config.retry.max_retries + 1,
                            e,
                            config.retry.backoff
                        );
                        yield ClientEvent::Retrying {
                            attempt,
                            delay_ms: config.retry.backoff.as_millis() as u64,
                            error: e.to_string(),
                        };

                        let waited = tokio::select! {
                            biased;
                            _ = control.token.cancelled() => false,
                            _ = tokio::time::sleep(config.retry.backoff) => true,
                        };
                        if !waited {
                            break 'operation Outcome::cancelled(control.reason(), text.text());
                        }
                        last_activity = Instant::now();
                        continue 'operation;
                    }
                    Ok(Err(e)) => break 'operation Outcome::failed(e, text.text()),
                };

                let mut decoder = WireDecoder::new();
                let mut streaming = false;

                let ending = 'read: loop {
                    let wake = tokio::select! {
                        biased;
                        _ = control.token.cancelled() => Wake::Stop(control.reason()),
                        chunk = body.next() => Wake::Chunk(chunk),
                        _ = ticker.tick() => {
                            if last_activity.elapsed() >= config.inactivity_timeout {
                                Wake::Stop(timeout)
                            } else {
                                Wake::Idle
                            }
                        }
                    };

                    let (events, end_of_data) = match wake {
                        Wake::Idle => continue 'read,
                        Wake::Stop(reason) => break 'read Ending::Cancelled(reason),
                        Wake::Chunk(Some(Err(e))) => break 'read Ending::Failed(e),
                        Wake::Chunk(Some(Ok(bytes))) => {
                            last_activity = Instant::now();
                            if !streaming {
                                streaming = true;
                                handle.set_phase(id, Phase::Streaming);
                                yield ClientEvent::Streaming;
                            }
                            (decoder.feed(&bytes), false)
                        }
                        Wake::Chunk(None) => (decoder.finish(), true),
                    };

                    let mut terminal = None;
                    for event in events {
                        match event {
                            StreamEvent::Fragment { text: fragment } => {
                                text.push(&fragment);
                                yield ClientEvent::Partial { text: text.text().to_string() };
                            }
                            StreamEvent::Done => {
                                terminal = Some(Ending::Done);
                                break;
                            }
                            StreamEvent::Error { message } => {
                                terminal = Some(Ending::Failed(Error::Backend(message)));
                                break;
                            }
                        }
                    }

                    if let Some(ending) = terminal {
                        break 'read ending;
                    }
                    if end_of_data {
                        break 'read Ending::EndOfData;
                    }
                };

                if decoder.skipped() > 0 {
                    tracing::debug!(skipped = decoder.skipped(), "Skipped malformed lines");
                }

                break 'operation match ending {
                    Ending::Done => Outcome::completed(text.text()),
                    Ending::EndOfData if text.is_empty() => {
                        Outcome::failed(Error::EmptyResponse, text.text())
                    }
                    Ending::EndOfData => Outcome::completed(text.text()),
                    Ending::Cancelled(reason) => Outcome::cancelled(reason, text.text()),
                    Ending::Failed(e) => Outcome::failed(e, text.text()),
                };
            };

            outcome.attempts = attempt + 1;
            let phase = match &outcome.kind {
                OutcomeKind::Completed => Phase::Completed,
                OutcomeKind::Cancelled { .. } => Phase::Cancelled,
                OutcomeKind::Failed { .. } => Phase::Failed,
            };
            tracing::info!(
                operation = id,
                attempts = outcome.attempts,
                chars = outcome.text.len(),
                kind = ?outcome.kind,
                "Operation finished"
            );
            handle.finish(id, phase);
            yield ClientEvent::Finished { outcome };
        })
    }
}
