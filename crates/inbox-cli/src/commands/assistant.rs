//! Assistant commands: stream an analysis or an answer to stdout

use std::{io::Write, sync::Arc};

use anyhow::{Result, bail};
use inbox_assistant::{AnalysisScope, Assistant, AssistantEvent, NOTHING_TO_ANALYZE, Outcome};
use inbox_store::InboxState;
use tokio::sync::broadcast::error::RecvError;

use crate::config::Config;

pub enum Request {
    Analyze(AnalysisScope),
    Ask(String),
}

pub async fn run(config: &Config, state: &InboxState, request: Request) -> Result<()> {
    if state.active_conversation().is_none() {
        bail!("No conversation selected; run `inbox select <conversation>` first");
    }
    if matches!(&request, Request::Ask(question) if question.trim().is_empty()) {
        bail!("Question is empty");
    }

    let assistant = Arc::new(Assistant::http(config.backend(), config.assistant())?);
    tracing::debug!(endpoint = %config.endpoint, "Assistant ready");

    let printer = tokio::spawn(print_partials(assistant.subscribe()));

    let handle = assistant.handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.abort();
        }
    });

    let outcome = match request {
        Request::Analyze(scope) => assistant.analyze(state, scope).await,
        Request::Ask(question) => assistant.ask(state, &question).await,
    };
    interrupt.abort();

    // Closing the event channel lets the printer drain and stop
    drop(assistant);
    let printed = printer.await?;

    match outcome {
        None => println!("{}", NOTHING_TO_ANALYZE),
        Some(outcome) => print_outcome(&outcome, printed),
    }
    Ok(())
}

/// Print each partial's new suffix as it arrives; returns bytes printed
async fn print_partials(mut events: tokio::sync::broadcast::Receiver<AssistantEvent>) -> usize {
    let mut printed = 0;
    let mut stdout = std::io::stdout();
    loop {
        match events.recv().await {
            Ok(AssistantEvent::Partial { text }) => {
                if let Some(delta) = text.get(printed..) {
                    let _ = write!(stdout, "{}", delta);
                    let _ = stdout.flush();
                    printed = text.len();
                }
            }
            Ok(AssistantEvent::Retrying { attempt, error }) => {
                eprintln!("{} (retry {})", error, attempt);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Missed assistant events");
            }
            Err(RecvError::Closed) => break,
        }
    }
    printed
}

fn print_outcome(outcome: &Outcome, printed: usize) {
    if printed == 0 {
        println!("{}", outcome.render());
        return;
    }

    println!();
    if let Some(annotation) = outcome.annotation() {
        println!("\n{}", annotation);
    }
    if let Some(note) = outcome.truncation_note() {
        eprintln!("{}", note);
    }
}
