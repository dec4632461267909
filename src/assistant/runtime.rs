//! Async driver for an [`AssistantSession`]
//!
//! Host input arrives on one channel, session events leave on another and
//! timers are slept on in between. The session itself never spawns.

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use super::session::{AssistantEvent, AssistantSession};
use crate::voice::RecognitionEvent;

/// Host input
#[derive(Debug, Clone)]
pub enum Command {
    /// Start listening
    StartListening,
    /// Stop listening
    StopListening,
    /// Toggle listening
    ToggleListening,
    /// Engine callback
    Recognition(RecognitionEvent),
    /// Typed input
    Text(String),
    /// Host router moved
    SetRoute(String),
    /// Speak arbitrary text
    Speak {
        /// Text to speak
        text: String,
        /// Preferred language
        language: Option<String>,
    },
    /// Silence speech
    StopSpeaking,
    /// Dismiss the assistant; the loop keeps running
    Close,
    /// End the loop
    Shutdown,
}

/// Drive `session` until `Shutdown`, the command channel closes or the
/// event receiver is dropped
///
/// Returns the session so the caller can inspect its final state.
pub async fn run(
    mut session: AssistantSession,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<AssistantEvent>,
) -> AssistantSession {
    tracing::debug!(session = %session.id(), "assistant runtime started");

    loop {
        if !forward(&mut session, &events).await {
            tracing::debug!("event receiver dropped");
            break;
        }

        let deadline = session.next_deadline();
        tokio::select! {
            command = commands.recv() => {
                match command {
                    None | Some(Command::Shutdown) => {
                        tracing::debug!("shutdown requested");
                        break;
                    }
                    Some(command) => apply(&mut session, command),
                }
            }
            () = wait_for(deadline) => {
                session.poll(Instant::now());
            }
        }
    }

    session.stop_listening();
    forward(&mut session, &events).await;
    session
}

fn apply(session: &mut AssistantSession, command: Command) {
    let now = Instant::now();
    match command {
        Command::StartListening => session.start_listening(),
        Command::StopListening => session.stop_listening(),
        Command::ToggleListening => session.toggle_listening(),
        Command::Recognition(event) => session.handle_recognition(event, now),
        Command::Text(text) => {
            session.submit_text(&text, now);
        }
        Command::SetRoute(route) => session.set_route(route),
        Command::Speak { text, language } => session.speak(&text, language.as_deref()),
        Command::StopSpeaking => session.stop_speaking(),
        Command::Close => session.close(),
        Command::Shutdown => {}
    }
}

async fn forward(session: &mut AssistantSession, events: &mpsc::Sender<AssistantEvent>) -> bool {
    for event in session.drain_events() {
        if events.send(event).await.is_err() {
            return false;
        }
    }
    true
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
