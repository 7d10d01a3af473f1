mod common;

use common::*;
use embedchat_core::{
    escape_html, KeyValueStore, Message, RejectReason, RequestState, SendOutcome, Sender,
    TransportError,
};

#[tokio::test]
async fn test_user_message_is_escaped_in_transcript() {
    let transport = ScriptedTransport::new().reply("ok", None);
    let (pipeline, _view, _) = build_pipeline(transport);

    let text = r#"<script>alert("x")</script> & 'quotes'"#;
    pipeline.send_user_message(text).await;

    let transcript = pipeline.transcript();
    let user: Vec<&Message> = transcript
        .iter()
        .filter(|m| m.sender() == Sender::User)
        .collect();
    assert_eq!(user.len(), 1);
    assert_eq!(user[0].rendered_text(), escape_html(text));
    for raw in ['<', '>', '"', '\''] {
        assert!(!user[0].rendered_text().contains(raw));
    }
}

#[tokio::test]
async fn test_lifecycle_notifications_in_order() {
    let transport = ScriptedTransport::new().reply("**Hello** there", None);
    let (pipeline, view, _) = build_pipeline(transport);

    assert_eq!(pipeline.send_user_message("hi").await, SendOutcome::Delivered);

    assert_eq!(
        view.events(),
        vec![
            ViewEvent::SuggestionsHidden,
            ViewEvent::Appended(Sender::User, "hi".to_string()),
            ViewEvent::ClearInput,
            ViewEvent::InputEnabled(false),
            ViewEvent::Typing(true),
            ViewEvent::Typing(false),
            ViewEvent::Appended(Sender::Bot, "Hello there".to_string()),
            ViewEvent::InputEnabled(true),
            ViewEvent::Focus,
        ]
    );
}

#[tokio::test]
async fn test_request_carries_trimmed_text_and_session_id() {
    let transport = ScriptedTransport::new().reply("ok", None);
    let (pipeline, _view, durable) = build_pipeline(transport.clone());

    pipeline.send_user_message("\n  pricing?  ").await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message, "pricing?");
    assert_eq!(
        durable.get("navaura_session_id").unwrap(),
        Some(requests[0].session_id.clone())
    );
}

#[tokio::test]
async fn test_server_session_id_is_adopted_for_next_request() {
    let transport = ScriptedTransport::new()
        .reply("first", Some("srv-abc"))
        .reply("second", Some("srv-abc"));
    let (pipeline, view, durable) = build_pipeline(transport.clone());

    pipeline.send_user_message("one").await;
    assert_eq!(
        durable.get("navaura_session_id").unwrap().as_deref(),
        Some("srv-abc")
    );
    assert!(view
        .events()
        .contains(&ViewEvent::SessionAdopted("srv-abc".to_string())));

    view.clear();
    pipeline.send_user_message("two").await;

    let requests = transport.requests();
    assert_ne!(requests[0].session_id, "srv-abc");
    assert_eq!(requests[1].session_id, "srv-abc");
    // Same id again is not a new adoption
    assert!(!view
        .events()
        .iter()
        .any(|e| matches!(e, ViewEvent::SessionAdopted(_))));
}

#[tokio::test]
async fn test_transport_failure_appends_one_fallback() {
    for error in [
        TransportError::Network("offline".to_string()),
        TransportError::Status(503),
        TransportError::Decode("expected value".to_string()),
        TransportError::MissingResponse,
    ] {
        let transport = ScriptedTransport::new().fail(error.clone());
        let (pipeline, view, _) = build_pipeline(transport);

        let outcome = pipeline.send_user_message("help").await;
        assert_eq!(outcome, SendOutcome::FellBack(error));

        let transcript = pipeline.transcript();
        let bot: Vec<&Message> = transcript
            .iter()
            .filter(|m| m.sender() == Sender::Bot)
            .collect();
        assert_eq!(bot.len(), 1);
        assert!(bot[0].text().contains("namaskar@navaura.in"));
        assert!(bot[0]
            .rendered_text()
            .contains(r#"<a href="mailto:namaskar@navaura.in">"#));
        assert!(!bot[0].text().contains("503"));

        assert!(pipeline.is_input_enabled());
        assert!(!pipeline.is_typing());
        assert_eq!(pipeline.state(), RequestState::Idle);
        let events = view.events();
        assert_eq!(events.last(), Some(&ViewEvent::Focus));
        assert!(events.contains(&ViewEvent::InputEnabled(true)));
    }
}

#[tokio::test]
async fn test_widget_stays_usable_after_failure() {
    let transport = ScriptedTransport::new()
        .fail(TransportError::Status(500))
        .reply("back online", None);
    let (pipeline, _view, _) = build_pipeline(transport);

    pipeline.send_user_message("one").await;
    assert_eq!(
        pipeline.send_user_message("two").await,
        SendOutcome::Delivered
    );
    assert_eq!(
        pipeline.transcript().last().map(Message::text),
        Some("back online")
    );
}

#[tokio::test]
async fn test_send_during_flight_is_dropped() {
    let (transport, release) = GatedTransport::new();
    let (pipeline, view, _) = build_pipeline(transport.clone());

    let (first, (second, snapshot)) = tokio::join!(pipeline.send_user_message("one"), async {
        while !pipeline.is_in_flight() {
            tokio::task::yield_now().await;
        }
        assert_eq!(pipeline.state(), RequestState::AwaitingResponse);
        assert!(pipeline.is_typing());
        assert!(!pipeline.is_input_enabled());

        let before = pipeline.transcript().len();
        let events_before = view.events().len();
        let second = pipeline.send_user_message("two").await;
        let snapshot = (
            pipeline.transcript().len() == before,
            view.events().len() == events_before,
            pipeline.is_in_flight(),
        );

        release.send(bot_reply("done")).ok();
        (second, snapshot)
    });

    assert_eq!(first, SendOutcome::Delivered);
    assert_eq!(second, SendOutcome::Rejected(RejectReason::InFlight));
    assert_eq!(snapshot, (true, true, true));

    assert_eq!(transport.requests().len(), 1);
    let texts: Vec<String> = pipeline
        .transcript()
        .iter()
        .map(|m| m.text().to_string())
        .collect();
    assert_eq!(texts, vec!["one", "done"]);
}

#[tokio::test]
async fn test_typing_indicator_shown_once_per_request() {
    let transport = ScriptedTransport::new().reply("a", None).reply("b", None);
    let (pipeline, view, _) = build_pipeline(transport);

    pipeline.send_user_message("1").await;
    pipeline.send_user_message("2").await;

    let typing: Vec<ViewEvent> = view
        .events()
        .into_iter()
        .filter(|e| matches!(e, ViewEvent::Typing(_)))
        .collect();
    assert_eq!(
        typing,
        vec![
            ViewEvent::Typing(true),
            ViewEvent::Typing(false),
            ViewEvent::Typing(true),
            ViewEvent::Typing(false),
        ]
    );
}

#[tokio::test]
async fn test_suggestions_hidden_only_once() {
    let transport = ScriptedTransport::new().reply("a", None).reply("b", None);
    let (pipeline, view, _) = build_pipeline(transport);
    assert!(!pipeline.suggestions().is_empty());

    pipeline.send_user_message("Request a demo").await;
    pipeline.send_user_message("thanks").await;

    let hidden = view
        .events()
        .iter()
        .filter(|e| **e == ViewEvent::SuggestionsHidden)
        .count();
    assert_eq!(hidden, 1);
    assert!(pipeline.suggestions().is_empty());
}
