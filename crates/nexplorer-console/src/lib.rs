pub mod command;
pub mod input;
pub mod render;

use anyhow::Result;
use command::{parse_input, ConsoleCommand, HELP};
use nexplorer_core::{
    spawn_request, ActionRouter, DispatchOutcome, Event, EventBus, LogLevel, ModelClient,
    SessionState, TransferQueue,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub use input::{ConsoleConfirmer, InputLines};

pub struct ConsoleContext {
    pub router: ActionRouter,
    pub state: SessionState,
    pub model: Arc<dyn ModelClient>,
    pub queue: TransferQueue,
    pub bus: EventBus,
    pub events: mpsc::Receiver<Event>,
    pub input: InputLines,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub async fn run(mut ctx: ConsoleContext) -> Result<()> {
    let mut shown = 0;
    ctx.router.browser().refresh(&mut ctx.state).await;
    render::print_new_log(&ctx.state.log, &mut shown)?;
    render::print_listing(&ctx.state)?;

    loop {
        render::print_input_marker(&ctx.state)?;
        let flow = tokio::select! {
            line = ctx.input.next_line() => match line {
                Some(line) => handle_line(&mut ctx, &line).await?,
                None => Flow::Quit,
            },
            Some(event) = ctx.events.recv() => {
                // The marker line is still open; start the output below it.
                render::print_text("")?;
                handle_event(&mut ctx, event).await?;
                Flow::Continue
            }
        };
        render::print_new_log(&ctx.state.log, &mut shown)?;
        if flow == Flow::Quit {
            break;
        }
    }

    info!("console closing");
    if let Err(err) = ctx.router.browser().executor().backend().close().await {
        warn!(error = %err, "backend close failed");
    }
    Ok(())
}

async fn handle_line(ctx: &mut ConsoleContext, line: &str) -> Result<Flow> {
    let command = match parse_input(line) {
        Ok(command) => command,
        Err(message) => {
            ctx.state.log.push(LogLevel::Warning, message);
            return Ok(Flow::Continue);
        }
    };
    let browser = ctx.router.browser();
    let state = &mut ctx.state;
    match command {
        ConsoleCommand::Empty => {}
        ConsoleCommand::Quit => return Ok(Flow::Quit),
        ConsoleCommand::Help => render::print_text(HELP)?,
        ConsoleCommand::Pwd => {
            render::print_text(&format!("{} {}", state.mode.label(), state.current_path()))?
        }
        ConsoleCommand::List => {
            browser.refresh(state).await;
            render::print_listing(state)?;
        }
        ConsoleCommand::Enter(name) => match browser.open(state, &name).await {
            Ok(()) => render::print_listing(state)?,
            Err(err) => state.log.push(LogLevel::Warning, err.to_string()),
        },
        ConsoleCommand::Up => {
            if browser.back(state).await {
                render::print_listing(state)?;
            } else {
                state.log.push(LogLevel::System, "Already at the top.");
            }
        }
        ConsoleCommand::Forward => {
            if browser.forward(state).await {
                render::print_listing(state)?;
            } else {
                state.log.push(LogLevel::System, "Nothing to go forward to.");
            }
        }
        ConsoleCommand::Select(name) => {
            if browser.select(state, &name).await {
                if let Some(preview) = &state.preview {
                    render::print_preview(preview)?;
                }
            } else {
                state
                    .log
                    .push(LogLevel::Warning, format!("No entry named {name}"));
            }
        }
        ConsoleCommand::Get { name, destination } => {
            match browser.download_request(state, &name, &destination) {
                Ok(request) => {
                    state.log.push(
                        LogLevel::System,
                        format!("Downloading {} to {}...", request.source, request.destination),
                    );
                    if let Err(err) = ctx.queue.enqueue(request).await {
                        state.log.push(LogLevel::Error, err.to_string());
                    }
                }
                Err(err) => state.log.push(LogLevel::Warning, err.to_string()),
            }
        }
        ConsoleCommand::Utterance(text) => {
            if let Ok(pending) = ctx.router.begin_request(state, &text) {
                spawn_request(ctx.model.clone(), pending.id, pending.request, ctx.bus.clone());
            }
        }
    }
    Ok(Flow::Continue)
}

async fn handle_event(ctx: &mut ConsoleContext, event: Event) -> Result<()> {
    match event {
        Event::ModelReply { request_id, result } => match result {
            Ok(reply) => {
                let outcome = ctx
                    .router
                    .handle_reply(&mut ctx.state, request_id, &reply)
                    .await;
                match outcome {
                    DispatchOutcome::Navigated => render::print_listing(&ctx.state)?,
                    DispatchOutcome::SearchMatched { .. } => {
                        render::print_listing(&ctx.state)?;
                        if let Some(preview) = &ctx.state.preview {
                            render::print_preview(preview)?;
                        }
                    }
                    DispatchOutcome::CopyApproved(request) => {
                        if let Err(err) = ctx.queue.enqueue(request).await {
                            ctx.state.log.push(LogLevel::Error, err.to_string());
                        }
                    }
                    DispatchOutcome::Answered
                    | DispatchOutcome::SearchEmpty
                    | DispatchOutcome::CopyRejected(_)
                    | DispatchOutcome::Rejected(_)
                    | DispatchOutcome::Ignored => {}
                }
            }
            Err(error) => ctx.router.handle_failure(&mut ctx.state, request_id, &error),
        },
        Event::TransferFinished {
            job_id,
            request,
            result,
        } => {
            info!(%job_id, ok = result.is_ok(), "transfer finished");
            ctx.router
                .complete_transfer(&mut ctx.state, &request, result)
                .await;
        }
    }
    Ok(())
}
