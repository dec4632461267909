//! Assistant session integration tests
//!
//! End-to-end: transcript in, navigation, speech and conversation out.

use std::time::Duration;

use carevoice::assistant::{Command, run};
use carevoice::voice::{RecognitionErrorKind, RecognitionEvent, Role, Utterance};
use carevoice::{AssistantEvent, AssistantSession, CommandMatch, Config, Notice};
use tokio::sync::mpsc;
use tokio::time::Instant;

mod common;

use common::{FakeBackend, FakeSynthesizer, builtin_matcher, session, session_with};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn final_result(text: &str) -> RecognitionEvent {
    RecognitionEvent::Result(vec![Utterance::final_text(text)])
}

#[test]
fn test_scenario_navigation() {
    let mut t = session();
    let result = t.session.submit_text("go to caregivers page", Instant::now());

    assert_eq!(
        result,
        Some(CommandMatch::Navigation {
            route: "/caregivers".to_string(),
            response: "Navigating to the caregivers page.".to_string(),
        })
    );
    assert_eq!(t.session.current_route(), "/caregivers");

    let events = t.session.drain_events();
    assert!(events.contains(&AssistantEvent::Navigate {
        route: "/caregivers".to_string()
    }));

    let spoken = &t.speech.lock().unwrap().spoken;
    assert_eq!(
        spoken[0],
        (
            "Navigating to the caregivers page.".to_string(),
            Some("Samantha".to_string())
        )
    );
}

#[test]
fn test_scenario_repeated_phrase_collapses() {
    let mut t = session();
    let result = t.session.submit_text(
        "go to caregivers page go to caregivers page go to caregivers page",
        Instant::now(),
    );

    assert_eq!(result.as_ref().and_then(CommandMatch::route), Some("/caregivers"));
    let user = &t.session.history().messages()[0];
    assert_eq!(user.role, Role::User);
    assert_eq!(user.content, "go to caregivers page");
}

#[test]
fn test_scenario_service_category() {
    let mut t = session();
    let result = t.session.submit_text("i need cooking help", Instant::now());
    assert_eq!(
        result,
        Some(CommandMatch::Navigation {
            route: "/services".to_string(),
            response: "We offer cooking assistance services. Let me show you those options."
                .to_string(),
        })
    );
}

#[test]
fn test_scenario_close_assistant() {
    for route in ["/", "/booking", "/nowhere"] {
        let mut t = session();
        t.session.set_route(route);
        t.session.start_listening();

        let result = t.session.submit_text("bye", Instant::now());
        assert_eq!(
            result,
            Some(CommandMatch::CloseAssistant {
                response: "Goodbye! Feel free to ask for help anytime.".to_string(),
            })
        );

        let events = t.session.drain_events();
        assert!(events.contains(&AssistantEvent::Close));
        assert!(t.session.history().is_empty());
        assert!(!t.session.is_listening());
        assert_eq!(t.session.next_deadline(), None);

        // The farewell is still spoken
        let spoken = &t.speech.lock().unwrap().spoken;
        assert_eq!(spoken.last().unwrap().0, "Goodbye! Feel free to ask for help anytime.");
    }
}

#[test]
fn test_scenario_fallback_on_services() {
    let mut t = session();
    t.session.set_route("/services");
    let result = t.session.submit_text("asdfgh nonsense", Instant::now());

    let matcher = builtin_matcher();
    let responses = &matcher.commands().pages().get("/services").general_responses;
    match result {
        Some(CommandMatch::Fallback { response }) => assert!(responses.contains(&response)),
        other => panic!("expected fallback, got {other:?}"),
    }
    assert_eq!(t.session.current_route(), "/services");
}

#[test]
fn test_scenario_where_am_i() {
    let mut t = session();
    t.session.set_route("/how-it-works");
    let result = t.session.submit_text("where am i", Instant::now());

    let matcher = builtin_matcher();
    let pages = matcher.commands().pages();
    let help = &pages.get("/how-it-works").help_text;
    let extra = pages.elaboration("/how-it-works").unwrap();

    match result {
        Some(CommandMatch::SpeakOnly { response }) => {
            assert!(response.contains(help.as_str()));
            assert!(response.contains(extra));
        }
        other => panic!("expected speak-only, got {other:?}"),
    }
}

#[test]
fn test_same_route_does_not_navigate() {
    let mut t = session();
    t.session.set_route("/profile");
    let result = t.session.submit_text("go to profile", Instant::now());

    assert!(matches!(result, Some(CommandMatch::SpeakOnly { .. })));
    assert!(
        !t.session
            .drain_events()
            .iter()
            .any(|e| matches!(e, AssistantEvent::Navigate { .. }))
    );
}

#[test]
fn test_debounce_collapses_transcript_updates() {
    let mut t = session();
    let t0 = Instant::now();
    t.session.start_listening();
    t.session.handle_recognition(RecognitionEvent::Started, t0);

    t.session.handle_recognition(final_result("go"), t0);
    t.session.handle_recognition(final_result("to"), t0 + ms(100));
    t.session.handle_recognition(final_result("caregivers"), t0 + ms(200));
    t.session.handle_recognition(final_result("page"), t0 + ms(1400));

    assert_eq!(t.session.next_deadline(), Some(t0 + ms(2900)));
    assert_eq!(t.session.poll(t0 + ms(1500)), None);
    assert_eq!(t.session.poll(t0 + ms(2899)), None);

    let result = t.session.poll(t0 + ms(2900));
    assert_eq!(result.as_ref().and_then(CommandMatch::route), Some("/caregivers"));
    assert_eq!(t.session.history().len(), 2);
    assert_eq!(t.session.history().messages()[0].content, "go to caregivers page");

    // Nothing left to dispatch
    assert_eq!(t.session.poll(t0 + ms(10_000)), None);
    assert_eq!(t.session.history().len(), 2);
}

#[test]
fn test_transcript_resets_between_commands() {
    let mut t = session();
    let t0 = Instant::now();
    t.session.start_listening();
    t.session.handle_recognition(RecognitionEvent::Started, t0);

    t.session.handle_recognition(final_result("show services"), t0);
    assert!(t.session.poll(t0 + ms(1500)).is_some());

    t.session.handle_recognition(final_result("go home"), t0 + ms(2000));
    let result = t.session.poll(t0 + ms(3500));
    assert_eq!(result.as_ref().and_then(CommandMatch::route), Some("/"));
}

#[test]
fn test_duplicate_within_cooldown_not_redispatched() {
    let mut t = session();
    let t0 = Instant::now();

    assert!(t.session.submit_text("what can you do", t0).is_some());
    assert!(t.session.submit_text("what can you do", t0 + ms(500)).is_none());
    assert!(t.session.submit_text("what can you do", t0 + ms(2500)).is_some());
    assert_eq!(t.session.history().len(), 4);
}

#[test]
fn test_recognizer_repeat_after_dispatch_is_dropped() {
    let mut t = session();
    let t0 = Instant::now();
    t.session.start_listening();
    t.session.handle_recognition(RecognitionEvent::Started, t0);

    t.session.handle_recognition(final_result("go home"), t0);
    assert!(t.session.poll(t0 + ms(1500)).is_some());
    assert_eq!(t.session.history().len(), 2);

    // Same phrase re-emitted shortly after the dispatch
    t.session.handle_recognition(final_result("go home"), t0 + ms(2100));
    assert_eq!(t.session.poll(t0 + ms(3600)), None);
    assert_eq!(t.session.history().len(), 2);

    // The dropped repeat does not prefix the next command
    t.session.handle_recognition(final_result("show services"), t0 + ms(4000));
    assert!(t.session.poll(t0 + ms(5500)).is_some());
    assert_eq!(t.session.history().messages()[2].content, "show services");
}

#[test]
fn test_stop_cancels_pending_dispatch() {
    let mut t = session();
    let t0 = Instant::now();
    t.session.start_listening();
    t.session.handle_recognition(RecognitionEvent::Started, t0);
    t.session.handle_recognition(final_result("go to caregivers page"), t0);
    assert!(t.session.next_deadline().is_some());

    t.session.stop_listening();
    assert_eq!(t.session.next_deadline(), None);
    assert_eq!(t.session.poll(t0 + Duration::from_secs(30)), None);
    assert!(t.session.history().is_empty());
    assert!(t.speech.lock().unwrap().spoken.is_empty());
}

#[test]
fn test_close_clears_everything() {
    let mut t = session();
    let t0 = Instant::now();
    t.session.submit_text("hello", t0);
    t.session.start_listening();
    t.session.handle_recognition(RecognitionEvent::Started, t0);
    t.session.handle_recognition(final_result("go home"), t0);
    t.session
        .handle_recognition(RecognitionEvent::Error(RecognitionErrorKind::Network), t0);

    t.session.close();
    assert!(t.session.history().is_empty());
    assert_eq!(t.session.next_deadline(), None);
    assert!(!t.session.is_listening());
    assert!(t.speech.lock().unwrap().cancels > 0);
}

#[test]
fn test_permission_denied_notice() {
    let mut t = session();
    let t0 = Instant::now();
    t.session.start_listening();
    t.session
        .handle_recognition(RecognitionEvent::Error(RecognitionErrorKind::NotAllowed), t0);

    let events = t.session.drain_events();
    assert!(events.contains(&AssistantEvent::Notice(Notice::PermissionDenied)));
    assert!(events.contains(&AssistantEvent::Listening { active: false }));
}

#[test]
fn test_exhausted_notice() {
    let mut t = session();
    let t0 = Instant::now();
    t.session.start_listening();
    for i in 0..3 {
        let at = t0 + Duration::from_secs(i * 10);
        t.session
            .handle_recognition(RecognitionEvent::Error(RecognitionErrorKind::Network), at);
        t.session.poll(at + Duration::from_secs(5));
    }

    let events = t.session.drain_events();
    assert!(events.contains(&AssistantEvent::Notice(Notice::RecognitionExhausted {
        attempts: 3
    })));
    assert_eq!(t.engine.lock().unwrap().starts, 3);
}

#[test]
fn test_unsupported_environment_falls_back_to_text() {
    let mut session = AssistantSession::new(
        builtin_matcher(),
        Box::new(FakeBackend::unsupported()),
        Box::new(FakeSynthesizer::new()),
        &Config::default(),
    )
    .unwrap();

    assert!(!session.supports_voice());
    let events = session.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        AssistantEvent::Notice(Notice::Unsupported { .. })
    ));

    session.start_listening();
    assert!(session.drain_events().is_empty());

    let result = session.submit_text("go home", Instant::now());
    assert_eq!(result.as_ref().and_then(CommandMatch::route), Some("/"));
}

#[test]
fn test_synthesis_failure_is_a_notice() {
    let mut t = session();
    t.speech.lock().unwrap().fail = true;

    let result = t.session.submit_text("go to about", Instant::now());
    assert_eq!(result.as_ref().and_then(CommandMatch::route), Some("/about"));

    let events = t.session.drain_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, AssistantEvent::Notice(Notice::SynthesisFailed { .. })))
    );
}

#[test]
fn test_auto_speak_off() {
    let mut config = Config::default();
    config.speech.auto_speak = false;
    let mut t = session_with(&config);

    t.session.submit_text("go home", Instant::now());
    assert!(t.speech.lock().unwrap().spoken.is_empty());
    assert_eq!(t.session.history().len(), 2);
}

#[test]
fn test_stop_talking_silences_output() {
    let mut t = session();
    let t0 = Instant::now();

    t.session.submit_text("what can you do", t0);
    let cancels = {
        let speech = t.speech.lock().unwrap();
        assert_eq!(speech.spoken.len(), 1);
        speech.cancels
    };

    let result = t.session.submit_text("stop talking", t0 + ms(500));
    assert!(matches!(result, Some(CommandMatch::StopSpeaking { .. })));

    let speech = t.speech.lock().unwrap();
    assert_eq!(speech.spoken.len(), 1);
    assert_eq!(speech.cancels, cancels + 1);
    drop(speech);

    // Acknowledged in the conversation, not aloud
    assert_eq!(t.session.history().len(), 4);
    assert_eq!(t.session.history().messages()[3].role, Role::Assistant);
}

#[test]
fn test_detected_language_picks_voice() {
    let mut t = session();
    let t0 = Instant::now();
    t.session.start_listening();
    t.session.handle_recognition(RecognitionEvent::Started, t0);
    t.session
        .handle_recognition(final_result("hola, necesito ayuda"), t0);

    assert!(t.session.drain_events().contains(&AssistantEvent::LanguageChanged {
        language: "es-ES".to_string()
    }));
    assert_eq!(t.session.language(), "es-ES");

    assert!(t.session.poll(t0 + ms(1500)).is_some());
    let spoken = &t.speech.lock().unwrap().spoken;
    assert_eq!(spoken[0].1.as_deref(), Some("Monica"));
}

#[tokio::test(start_paused = true)]
async fn test_runtime_dispatches_after_quiet_period() {
    let t = session();
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let handle = tokio::spawn(run(t.session, command_rx, event_tx));

    let start = Instant::now();
    command_tx.send(Command::StartListening).await.unwrap();
    command_tx
        .send(Command::Recognition(RecognitionEvent::Started))
        .await
        .unwrap();
    command_tx
        .send(Command::Recognition(final_result("show services")))
        .await
        .unwrap();

    loop {
        match event_rx.recv().await.unwrap() {
            AssistantEvent::Navigate { route } => {
                assert_eq!(route, "/services");
                break;
            }
            _ => continue,
        }
    }
    let elapsed = start.elapsed();
    assert!(elapsed >= ms(1500), "dispatched too early: {elapsed:?}");
    assert!(elapsed < ms(2000), "dispatched too late: {elapsed:?}");

    command_tx.send(Command::Shutdown).await.unwrap();
    let session = handle.await.unwrap();
    assert_eq!(session.current_route(), "/services");
}

#[tokio::test(start_paused = true)]
async fn test_runtime_stop_prevents_dispatch() {
    let t = session();
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let handle = tokio::spawn(run(t.session, command_rx, event_tx));

    command_tx.send(Command::StartListening).await.unwrap();
    command_tx
        .send(Command::Recognition(RecognitionEvent::Started))
        .await
        .unwrap();
    command_tx
        .send(Command::Recognition(final_result("go to caregivers page")))
        .await
        .unwrap();
    command_tx.send(Command::StopListening).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    command_tx.send(Command::Shutdown).await.unwrap();
    let session = handle.await.unwrap();

    let mut events = Vec::new();
    while let Some(event) = event_rx.recv().await {
        events.push(event);
    }
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, AssistantEvent::Navigate { .. } | AssistantEvent::Message(_)))
    );
    assert!(session.history().is_empty());
    assert_eq!(session.current_route(), "/");
}

#[tokio::test(start_paused = true)]
async fn test_runtime_text_and_close() {
    let t = session();
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let handle = tokio::spawn(run(t.session, command_rx, event_tx));

    command_tx
        .send(Command::Text("goodbye".to_string()))
        .await
        .unwrap();

    loop {
        if event_rx.recv().await.unwrap() == AssistantEvent::Close {
            break;
        }
    }

    drop(command_tx);
    let session = handle.await.unwrap();
    assert!(session.history().is_empty());
}
