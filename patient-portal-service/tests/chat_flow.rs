use std::sync::Arc;
use std::time::Duration;

use care_flow::{ExecutionStatus, InMemorySessionStorage, MessageRole, Rating, SessionStorage};
use patient_portal_service::chat::ScriptedReplySource;
use patient_portal_service::identity::SessionUser;
use patient_portal_service::models::Language;
use patient_portal_service::tasks::session_keys;
use patient_portal_service::{AppState, create_chat_runner, create_chat_session};
use uuid::Uuid;

fn patient() -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: "sita@example.com".to_string(),
        full_name: Some("Sita Kumari".to_string()),
    }
}

fn instant_replies() -> Arc<ScriptedReplySource> {
    Arc::new(ScriptedReplySource::with_delay(Duration::ZERO))
}

async fn open_chat(storage: &Arc<InMemorySessionStorage>, language: Language) -> String {
    let session = create_chat_session(language, &patient()).await;
    let session_id = session.id.clone();
    storage.save(session).await.unwrap();
    session_id
}

#[tokio::test]
async fn replies_interleave_one_to_one_with_user_messages() {
    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = create_chat_runner(storage.clone(), instant_replies());
    let session_id = open_chat(&storage, Language::En).await;

    for round in 1..=3usize {
        let session = storage.get(&session_id).await.unwrap().unwrap();
        session
            .context
            .set(session_keys::USER_INPUT, format!("symptom report {}", round))
            .await;
        storage.save(session).await.unwrap();

        let result = runner.run(&session_id).await.unwrap();
        assert!(matches!(result.status, ExecutionStatus::WaitingForInput));
        assert!(result.response.is_some());

        let session = storage.get(&session_id).await.unwrap().unwrap();
        assert_eq!(session.context.user_message_count().await, round);
        assert_eq!(session.context.assistant_message_count().await, round);
    }

    // Transcript preserves strict user/assistant alternation
    let session = storage.get(&session_id).await.unwrap().unwrap();
    let transcript = session.context.transcript().await;
    assert_eq!(transcript.len(), 6);
    for (i, message) in transcript.iter().enumerate() {
        let expected = if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        assert_eq!(message.role, expected);
    }
}

#[tokio::test]
async fn only_one_reply_may_be_in_flight_per_session() {
    let state = AppState::in_memory(instant_replies());
    let session_id = "chat-session-1";

    let guard = state.try_begin_reply(session_id).unwrap();

    // Second and third submissions are rejected while the first is pending
    assert!(state.try_begin_reply(session_id).is_err());
    assert!(state.try_begin_reply(session_id).is_err());

    // Other sessions are unaffected
    let other = state.try_begin_reply("chat-session-2").unwrap();
    drop(other);

    // Once the reply resolves, input is accepted again
    drop(guard);
    assert!(state.try_begin_reply(session_id).is_ok());
}

#[tokio::test]
async fn transcript_survives_a_storage_round_trip_with_ratings() {
    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = create_chat_runner(storage.clone(), instant_replies());
    let session_id = open_chat(&storage, Language::Np).await;

    let session = storage.get(&session_id).await.unwrap().unwrap();
    session
        .context
        .set(session_keys::USER_INPUT, "टाउको दुखेको छ")
        .await;
    storage.save(session).await.unwrap();
    runner.run(&session_id).await.unwrap();

    let session = storage.get(&session_id).await.unwrap().unwrap();
    let transcript = session.context.transcript().await;
    let user_message = &transcript[0];
    let reply = &transcript[1];

    // Ratings attach to assistant messages only, idempotently overwritable
    assert!(!session.context.rate_message(user_message.id, Rating::Up).await);
    assert!(session.context.rate_message(reply.id, Rating::Down).await);
    assert!(session.context.rate_message(reply.id, Rating::Up).await);
    assert!(!session.context.rate_message(Uuid::new_v4(), Rating::Up).await);
    storage.save(session).await.unwrap();

    let reloaded = storage.get(&session_id).await.unwrap().unwrap();
    let transcript = reloaded.context.transcript().await;
    assert_eq!(transcript[0].rating, None);
    assert_eq!(transcript[1].rating, Some(Rating::Up));
}

#[tokio::test]
async fn blank_submission_is_rejected_without_transcript_change() {
    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = create_chat_runner(storage.clone(), instant_replies());
    let session_id = open_chat(&storage, Language::En).await;

    let session = storage.get(&session_id).await.unwrap().unwrap();
    session.context.set(session_keys::USER_INPUT, "  ").await;
    storage.save(session).await.unwrap();

    let result = runner.run(&session_id).await.unwrap();
    assert!(matches!(result.status, ExecutionStatus::WaitingForInput));

    let session = storage.get(&session_id).await.unwrap().unwrap();
    assert_eq!(session.context.user_message_count().await, 0);
    assert_eq!(session.context.assistant_message_count().await, 0);
}
