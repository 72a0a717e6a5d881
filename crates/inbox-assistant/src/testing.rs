//! Scripted backend for exercising streaming operations

use std::{collections::VecDeque, time::Duration};

use async_stream::stream;
use async_trait::async_trait;
use inbox_stream::{ByteStream, Error, Result, StreamBackend};
use parking_lot::Mutex;

pub(crate) enum Step {
    Chunk(String),
    Delay(Duration),
    Fail(String),
    Hang,
}

pub(crate) enum Attempt {
    Refuse,
    Status(u16),
    Stall,
    Respond(Vec<Step>),
}

/// One `data:` line carrying a text fragment
pub(crate) fn fragment(text: &str) -> Step {
    Step::Chunk(format!(
        "data: {}\n\n",
        serde_json::json!({ "text": text })
    ))
}

pub(crate) fn done() -> Step {
    Step::Chunk("data: [DONE]\n\n".to_string())
}

pub(crate) fn raw(chunk: &str) -> Step {
    Step::Chunk(chunk.to_string())
}

/// Answers each `open` with the next scripted attempt
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    attempts: Mutex<VecDeque<Attempt>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub(crate) fn new(attempts: Vec<Attempt>) -> Self {
        Self {
            attempts: Mutex::new(attempts.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn opened(&self) -> usize {
        self.prompts.lock().len()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl StreamBackend for ScriptedBackend {
    async fn open(&self, prompt: &str) -> Result<ByteStream> {
        self.prompts.lock().push(prompt.to_string());
        let attempt = self
            .attempts
            .lock()
            .pop_front()
            .unwrap_or(Attempt::Respond(Vec::new()));

        match attempt {
            Attempt::Refuse => Err(Error::Connect("connection refused".into())),
            Attempt::Status(status) => Err(Error::Status {
                status,
                body: "unavailable".into(),
            }),
            Attempt::Stall => {
                futures::future::pending::<()>().await;
                Err(Error::EmptyResponse)
            }
            Attempt::Respond(steps) => Ok(Box::pin(stream! {
                for step in steps {
                    match step {
                        Step::Chunk(chunk) => yield Ok(chunk.into_bytes()),
                        Step::Delay(delay) => tokio::time::sleep(delay).await,
                        Step::Fail(message) => {
                            yield Err(Error::Transport(message));
                            return;
                        }
                        Step::Hang => futures::future::pending::<()>().await,
                    }
                }
            })),
        }
    }
}
