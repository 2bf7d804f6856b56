use std::sync::Arc;

use care_flow::{FlowRunner, Graph, GraphBuilder, Session, SessionStorage, Task};
use uuid::Uuid;

use crate::booking::start_booking;
use crate::chat::ReplySource;
use crate::identity::SessionUser;
use crate::models::{Hospital, Language};
use crate::tasks::{ConfirmBookingTask, SymptomChatTask, ValidateBookingTask, session_keys};

/// Booking workflow: validate the draft, then price and confirm it.
pub fn build_booking_workflow() -> Graph {
    let validate_task = Arc::new(ValidateBookingTask);
    let validate_id = validate_task.id().to_string();

    let confirm_task = Arc::new(ConfirmBookingTask);
    let confirm_id = confirm_task.id().to_string();

    GraphBuilder::new("hospital_booking")
        .add_task(validate_task)
        .add_task(confirm_task)
        .add_conditional_edge(validate_id, confirm_id, |context| {
            context
                .get_sync::<bool>(session_keys::VALIDATION_PASSED)
                .unwrap_or(false)
        })
        .build()
}

/// Chat workflow: a single task looping on user input.
pub fn build_chat_workflow(reply_source: Arc<dyn ReplySource>) -> Graph {
    GraphBuilder::new("symptom_chat")
        .add_task(Arc::new(SymptomChatTask::new(reply_source)))
        .build()
}

/// Open a booking session for a hospital listing: an empty draft owned by
/// this session until submission hands a confirmed booking back.
pub async fn create_booking_session(
    hospital: &Hospital,
    language: Language,
    user: &SessionUser,
) -> Session {
    let draft = start_booking(hospital);

    let mut session = Session::new_from_task(
        Uuid::new_v4().to_string(),
        ValidateBookingTask.id(),
    );
    session.graph_id = "hospital_booking".to_string();
    session.context.set(session_keys::BOOKING_DRAFT, &draft).await;
    session.context.set(session_keys::LANGUAGE, language).await;
    session.context.set(session_keys::USER_ID, user.id).await;

    session
}

/// Open a chat session for a signed-in user.
pub async fn create_chat_session(language: Language, user: &SessionUser) -> Session {
    // Task ids are type names, so the id is known without an instance
    let task_id = std::any::type_name::<SymptomChatTask>();
    let mut session = Session::new_from_task(Uuid::new_v4().to_string(), task_id);
    session.graph_id = "symptom_chat".to_string();
    session.context.set(session_keys::LANGUAGE, language).await;
    session.context.set(session_keys::USER_ID, user.id).await;

    session
}

pub fn create_booking_runner(session_storage: Arc<dyn SessionStorage>) -> FlowRunner {
    FlowRunner::new(Arc::new(build_booking_workflow()), session_storage)
}

pub fn create_chat_runner(
    session_storage: Arc<dyn SessionStorage>,
    reply_source: Arc<dyn ReplySource>,
) -> FlowRunner {
    FlowRunner::new(Arc::new(build_chat_workflow(reply_source)), session_storage)
}
