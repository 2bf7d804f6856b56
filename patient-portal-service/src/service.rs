use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use care_flow::{
    ExecutionStatus, FlowRunner, InMemorySessionStorage, PostgresSessionStorage, Session,
    SessionStorage,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::catalog::{Catalog, PostgresCatalog, SampleCatalog};
use crate::chat::{DEFAULT_REPLY_DELAY, ReplySource, ScriptedReplySource, welcome_message};
use crate::error::{PortalError, ValidationError};
use crate::identity::{SessionUser, StaticTokenIdentity, require_user};
use crate::models::{
    BookingDraft, BookingField, BookingSessionResponse, ConfirmedBooking, Language,
    RateMessageRequest, RegistrationRequest, RegistrationResponse, SendMessageRequest,
    SendMessageResponse, StartBookingRequest, StartChatRequest, StartChatResponse, TimeSlot,
    TranscriptResponse, UpdateBookingRequest,
};
use crate::receipt::Receipt;
use crate::registration::{
    DocumentRef, InMemoryRegistrationStore, PostgresRegistrationStore, RegistrationForm,
    RegistrationStore,
};
use crate::tasks::session_keys;
use crate::wellness::wellness_tips;
use crate::workflow::{
    create_booking_runner, create_booking_session, create_chat_runner, create_chat_session,
};

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn portal_error(err: PortalError) -> ApiError {
    match &err {
        PortalError::Validation(v) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": v.to_string() })),
        ),
        PortalError::NotAuthenticated(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": err.to_string() })),
        ),
        PortalError::ReplyInFlight => (
            StatusCode::CONFLICT,
            Json(json!({ "error": err.to_string() })),
        ),
        PortalError::ExternalCall(details) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "external call failed", "details": details })),
        ),
        PortalError::Flow(care_flow::FlowError::SessionNotFound(id)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Session not found", "session_id": id })),
        ),
        PortalError::Flow(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session_storage: Arc<dyn SessionStorage>,
    pub booking_runner: FlowRunner,
    pub chat_runner: FlowRunner,
    pub catalog: Arc<dyn Catalog>,
    pub registrations: Arc<dyn RegistrationStore>,
    pub identity: Arc<StaticTokenIdentity>,
    busy_sessions: Arc<DashMap<String, ()>>,
}

impl AppState {
    pub fn new(
        session_storage: Arc<dyn SessionStorage>,
        catalog: Arc<dyn Catalog>,
        registrations: Arc<dyn RegistrationStore>,
        reply_source: Arc<dyn ReplySource>,
    ) -> Self {
        let identity = Arc::new(StaticTokenIdentity::new());
        if let Ok(token) = std::env::var("PORTAL_DEV_TOKEN") {
            identity.insert_token(
                token,
                SessionUser {
                    id: Uuid::new_v4(),
                    email: "dev@localhost".to_string(),
                    full_name: Some("Dev User".to_string()),
                },
            );
            info!("Registered development sign-in token");
        }

        Self {
            booking_runner: create_booking_runner(session_storage.clone()),
            chat_runner: create_chat_runner(session_storage.clone(), reply_source),
            session_storage,
            catalog,
            registrations,
            identity,
            busy_sessions: Arc::new(DashMap::new()),
        }
    }

    /// Everything in memory: used without a hosted database and in tests.
    pub fn in_memory(reply_source: Arc<dyn ReplySource>) -> Self {
        Self::new(
            Arc::new(InMemorySessionStorage::new()),
            Arc::new(SampleCatalog::new()),
            Arc::new(InMemoryRegistrationStore::new()),
            reply_source,
        )
    }

    fn chat_state(&self, session_id: &str) -> &'static str {
        if self.busy_sessions.contains_key(session_id) {
            "awaiting_reply"
        } else {
            "idle"
        }
    }

    /// Mark a reply as in flight for this session. Fails while an earlier
    /// reply has not resolved; the marker clears when the guard drops.
    pub fn try_begin_reply(&self, session_id: &str) -> Result<ReplyGuard, PortalError> {
        match self.busy_sessions.entry(session_id.to_string()) {
            Entry::Occupied(_) => Err(PortalError::ReplyInFlight),
            Entry::Vacant(entry) => {
                entry.insert(());
                Ok(ReplyGuard {
                    busy_sessions: self.busy_sessions.clone(),
                    session_id: session_id.to_string(),
                })
            }
        }
    }
}

/// Removes the in-flight marker when the reply roundtrip ends, however it ends.
pub struct ReplyGuard {
    busy_sessions: Arc<DashMap<String, ()>>,
    session_id: String,
}

impl Drop for ReplyGuard {
    fn drop(&mut self) {
        self.busy_sessions.remove(&self.session_id);
    }
}

pub async fn create_app() -> Router {
    let app_state = create_app_state().await;
    build_router(app_state)
}

async fn create_app_state() -> AppState {
    let reply_source = make_reply_source();

    match std::env::var("DATABASE_URL") {
        Ok(database_url) => match PostgresSessionStorage::connect(&database_url).await {
            Ok(storage) => {
                info!("Using PostgreSQL storage");
                let pool = storage.pool().clone();
                AppState::new(
                    Arc::new(storage),
                    Arc::new(PostgresCatalog::new(pool.clone())),
                    Arc::new(PostgresRegistrationStore::new(pool)),
                    reply_source,
                )
            }
            Err(e) => {
                error!(
                    "Failed to connect to PostgreSQL: {}. Falling back to in-memory storage.",
                    e
                );
                AppState::in_memory(reply_source)
            }
        },
        Err(_) => {
            info!("Using in-memory storage (set DATABASE_URL to use PostgreSQL)");
            AppState::in_memory(reply_source)
        }
    }
}

fn make_reply_source() -> Arc<dyn ReplySource> {
    #[cfg(feature = "rig")]
    {
        match crate::chat::LlmReplySource::from_env() {
            Ok(source) => return Arc::new(source),
            Err(e) => {
                tracing::warn!("LLM reply source unavailable ({}), using scripted replies", e)
            }
        }
    }

    let delay = std::env::var("PORTAL_REPLY_DELAY_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_REPLY_DELAY);
    Arc::new(ScriptedReplySource::with_delay(delay))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/hospitals", get(list_hospitals))
        .route("/institutions", get(list_institutions))
        .route("/doctors", get(list_doctors))
        .route("/lab-tests", get(list_lab_tests))
        .route("/wellness", get(list_wellness))
        .route("/bookings", post(start_booking_session))
        .route(
            "/bookings/{session_id}",
            get(get_booking).patch(update_booking).delete(close_booking),
        )
        .route("/bookings/{session_id}/submit", post(submit_booking))
        .route(
            "/bookings/{session_id}/ticket/download",
            post(download_ticket),
        )
        .route("/chat", post(start_chat))
        .route("/chat/{session_id}", get(get_transcript))
        .route("/chat/{session_id}/messages", post(send_chat_message))
        .route(
            "/chat/{session_id}/messages/{message_id}/rating",
            post(rate_chat_message),
        )
        .route("/registrations", post(submit_registration))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn load_session(state: &AppState, session_id: &str) -> Result<Session, ApiError> {
    match state.session_storage.get(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(not_found_error("Session not found", session_id)),
        Err(e) => {
            error!("Failed to load session {}: {}", session_id, e);
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

async fn save_session(state: &AppState, session: Session) -> Result<(), ApiError> {
    state.session_storage.save(session).await.map_err(|e| {
        error!("Failed to save session: {}", e);
        internal_error("Failed to save session", &e.to_string())
    })
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Patient Portal Service",
        "version": "1.0.0",
        "description": "Hospital booking, symptom chat, wellness content and institution registration",
        "endpoints": {
            "GET /hospitals": "Hospital listings, free-text filter via ?q=",
            "GET /institutions": "Approved institution directory",
            "GET /doctors": "Doctor listings, filter via ?specialty=",
            "GET /lab-tests": "Lab test listings",
            "GET /wellness": "Wellness tips, ?lang=en|np",
            "POST /bookings": "Open a booking draft",
            "PATCH /bookings/{session_id}": "Update draft fields",
            "POST /bookings/{session_id}/submit": "Submit the draft",
            "POST /chat": "Open a symptom chat session",
            "POST /chat/{session_id}/messages": "Send a chat message",
            "POST /registrations": "Register an institution",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpecialtyQuery {
    specialty: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LanguageQuery {
    #[serde(default)]
    lang: Language,
}

async fn list_hospitals(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Value> {
    let hospitals = state
        .catalog
        .hospitals(query.q.as_deref())
        .await
        .map_err(portal_error)?;

    let cards: Vec<_> = hospitals.iter().map(|h| h.card()).collect();
    Ok(Json(json!({ "hospitals": cards, "count": cards.len() })))
}

async fn list_institutions(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Value> {
    let institutions = state
        .catalog
        .active_institutions(query.q.as_deref())
        .await
        .map_err(portal_error)?;

    let cards: Vec<_> = institutions.iter().map(|i| i.card()).collect();
    Ok(Json(json!({ "institutions": cards, "count": cards.len() })))
}

async fn list_doctors(
    State(state): State<AppState>,
    Query(query): Query<SpecialtyQuery>,
) -> ApiResult<Value> {
    let doctors = state
        .catalog
        .doctors(query.specialty.as_deref())
        .await
        .map_err(portal_error)?;
    Ok(Json(json!({ "doctors": doctors, "count": doctors.len() })))
}

async fn list_lab_tests(State(state): State<AppState>) -> ApiResult<Value> {
    let lab_tests = state.catalog.lab_tests().await.map_err(portal_error)?;
    Ok(Json(json!({ "lab_tests": lab_tests, "count": lab_tests.len() })))
}

async fn list_wellness(Query(query): Query<LanguageQuery>) -> ApiResult<Value> {
    Ok(Json(json!({ "categories": wellness_tips(query.lang) })))
}

async fn start_booking_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StartBookingRequest>,
) -> ApiResult<BookingSessionResponse> {
    let user = require_user(
        state.identity.as_ref(),
        bearer_token(&headers),
        request.language,
    )
    .await
    .map_err(portal_error)?;

    let hospital = state
        .catalog
        .hospital(&request.hospital_id)
        .await
        .map_err(portal_error)?
        .ok_or_else(|| not_found_error("Hospital not found", &request.hospital_id))?;

    let session = create_booking_session(&hospital, request.language, &user).await;
    let session_id = session.id.clone();
    let draft: Option<BookingDraft> = session.context.get(session_keys::BOOKING_DRAFT).await;

    save_session(&state, session).await?;
    info!(session_id = %session_id, hospital_id = %request.hospital_id, "booking draft opened");

    Ok(Json(BookingSessionResponse {
        session_id,
        status: "draft".to_string(),
        status_message: None,
        draft,
        booking: None,
    }))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<BookingSessionResponse> {
    let session = load_session(&state, &session_id).await?;

    let draft: Option<BookingDraft> = session.context.get(session_keys::BOOKING_DRAFT).await;
    let booking: Option<ConfirmedBooking> =
        session.context.get(session_keys::CONFIRMED_BOOKING).await;

    let status = if booking.is_some() { "confirmed" } else { "draft" };

    Ok(Json(BookingSessionResponse {
        session_id,
        status: status.to_string(),
        status_message: session.status_message.clone(),
        draft,
        booking,
    }))
}

async fn update_booking(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<UpdateBookingRequest>,
) -> ApiResult<BookingSessionResponse> {
    let session = load_session(&state, &session_id).await?;

    let confirmed: Option<ConfirmedBooking> =
        session.context.get(session_keys::CONFIRMED_BOOKING).await;
    if confirmed.is_some() {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "booking already confirmed" })),
        ));
    }

    let mut draft: BookingDraft = session
        .context
        .get(session_keys::BOOKING_DRAFT)
        .await
        .ok_or_else(|| not_found_error("Booking draft not found", &session_id))?;

    if let Some(date) = request.date {
        draft = draft.with_field(BookingField::Date(date));
    }
    if let Some(slot) = request.time_slot {
        let slot: TimeSlot = slot.parse().map_err(|e: ValidationError| portal_error(e.into()))?;
        draft = draft.with_field(BookingField::TimeSlot(slot));
    }
    if let Some(doctor_id) = request.doctor_id {
        let doctor_id = Some(doctor_id).filter(|d| !d.trim().is_empty());
        draft = draft.with_field(BookingField::Doctor(doctor_id));
    }
    if let Some(name) = request.patient_name {
        draft = draft.with_field(BookingField::PatientName(name));
    }
    if let Some(phone) = request.patient_phone {
        draft = draft.with_field(BookingField::PatientPhone(phone));
    }

    session.context.set(session_keys::BOOKING_DRAFT, &draft).await;
    save_session(&state, session).await?;

    Ok(Json(BookingSessionResponse {
        session_id,
        status: "draft".to_string(),
        status_message: None,
        draft: Some(draft),
        booking: None,
    }))
}

async fn submit_booking(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Value> {
    let session = load_session(&state, &session_id).await?;
    let language: Language = session
        .context
        .get(session_keys::LANGUAGE)
        .await
        .unwrap_or_default();

    require_user(state.identity.as_ref(), bearer_token(&headers), language)
        .await
        .map_err(portal_error)?;

    // A confirmed booking is read-only: resubmission returns it unchanged
    let existing: Option<ConfirmedBooking> =
        session.context.get(session_keys::CONFIRMED_BOOKING).await;
    if existing.is_some() {
        let receipt: Option<Receipt> = session.context.get(session_keys::RECEIPT).await;
        return Ok(Json(json!({
            "session_id": session_id,
            "status": "confirmed",
            "booking": existing,
            "receipt": receipt,
        })));
    }

    let result = state
        .booking_runner
        .run(&session_id)
        .await
        .map_err(|e| portal_error(e.into()))?;

    match result.status {
        ExecutionStatus::Completed => {
            let session = load_session(&state, &session_id).await?;
            let booking: Option<ConfirmedBooking> =
                session.context.get(session_keys::CONFIRMED_BOOKING).await;
            let receipt: Option<Receipt> = session.context.get(session_keys::RECEIPT).await;

            info!(session_id = %session_id, "booking confirmed");
            Ok(Json(json!({
                "session_id": session_id,
                "status": "confirmed",
                "booking": booking,
                "receipt": receipt,
            })))
        }
        ExecutionStatus::WaitingForInput => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "session_id": session_id,
                "status": "invalid",
                "error": result.response,
            })),
        )),
        ExecutionStatus::Error(e) => {
            error!(session_id = %session_id, "booking submission failed: {}", e);
            Err(internal_error("Failed to submit booking", &e))
        }
    }
}

async fn download_ticket(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    let session = load_session(&state, &session_id).await?;

    let receipt: Option<Receipt> = session.context.get(session_keys::RECEIPT).await;
    match receipt {
        Some(receipt) => {
            receipt.log_download();
            Ok(Json(json!({
                "session_id": session_id,
                "status": "download_logged",
                "ticket_number": receipt.ticket_number,
            })))
        }
        None => Err(not_found_error("No confirmed booking to download", &session_id)),
    }
}

async fn close_booking(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    state
        .session_storage
        .delete(&session_id)
        .await
        .map_err(|e| internal_error("Failed to close booking", &e.to_string()))?;

    Ok(Json(json!({ "session_id": session_id, "status": "closed" })))
}

async fn start_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StartChatRequest>,
) -> ApiResult<StartChatResponse> {
    let user = require_user(
        state.identity.as_ref(),
        bearer_token(&headers),
        request.language,
    )
    .await
    .map_err(portal_error)?;

    let session = create_chat_session(request.language, &user).await;
    let session_id = session.id.clone();
    save_session(&state, session).await?;

    info!(session_id = %session_id, "chat session opened");
    Ok(Json(StartChatResponse {
        session_id,
        greeting: welcome_message(request.language).to_string(),
    }))
}

async fn send_chat_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<SendMessageResponse> {
    let session = load_session(&state, &session_id).await?;
    let language: Language = session
        .context
        .get(session_keys::LANGUAGE)
        .await
        .unwrap_or_default();

    require_user(state.identity.as_ref(), bearer_token(&headers), language)
        .await
        .map_err(portal_error)?;

    if request.content.trim().is_empty() {
        return Err(portal_error(ValidationError::EmptyMessage.into()));
    }

    // At most one outstanding reply per session: reject while one is in flight
    let _guard = state.try_begin_reply(&session_id).map_err(portal_error)?;

    session
        .context
        .set(session_keys::USER_INPUT, request.content)
        .await;
    save_session(&state, session).await?;

    let result = state
        .chat_runner
        .run(&session_id)
        .await
        .map_err(|e| portal_error(e.into()))?;

    Ok(Json(SendMessageResponse {
        session_id,
        reply: result.response,
        state: "idle".to_string(),
    }))
}

async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<TranscriptResponse> {
    let session = load_session(&state, &session_id).await?;
    let messages = session.context.transcript().await;

    Ok(Json(TranscriptResponse {
        state: state.chat_state(&session_id).to_string(),
        session_id,
        messages,
    }))
}

async fn rate_chat_message(
    State(state): State<AppState>,
    Path((session_id, message_id)): Path<(String, String)>,
    Json(request): Json<RateMessageRequest>,
) -> ApiResult<Value> {
    let message_id =
        Uuid::parse_str(&message_id).map_err(|_| bad_request_error("invalid message id"))?;

    let session = load_session(&state, &session_id).await?;
    let rated = session.context.rate_message(message_id, request.rating).await;

    if !rated {
        return Err(not_found_error("Message not found or not ratable", &session_id));
    }

    save_session(&state, session).await?;
    Ok(Json(json!({
        "session_id": session_id,
        "message_id": message_id,
        "status": "rated",
    })))
}

async fn submit_registration(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<RegistrationResponse> {
    let form = RegistrationForm {
        institution_type: request.institution_type,
        name: request.name,
        location: request.location,
        city: request.city,
        district: request.district,
        contact_email: request.contact_email,
        contact_phone: request.contact_phone,
        services_description: request.services_description,
    };
    let document = request
        .legal_document_name
        .map(|file_name| DocumentRef { file_name });

    let registration = crate::registration::submit(form, document, state.registrations.as_ref())
        .await
        .map_err(portal_error)?;

    Ok(Json(RegistrationResponse {
        id: registration.id,
        status: registration.status,
    }))
}
