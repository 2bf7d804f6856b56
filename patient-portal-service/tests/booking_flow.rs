use std::sync::Arc;

use care_flow::{ExecutionStatus, InMemorySessionStorage, SessionStorage};
use chrono::{Duration, Local};
use patient_portal_service::catalog::SampleCatalog;
use patient_portal_service::identity::SessionUser;
use patient_portal_service::models::{
    BookingDraft, BookingField, ConfirmedBooking, Language, TimeSlot,
};
use patient_portal_service::receipt::Receipt;
use patient_portal_service::tasks::session_keys;
use patient_portal_service::{create_booking_runner, create_booking_session};
use uuid::Uuid;

fn patient() -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: "ram@example.com".to_string(),
        full_name: Some("Ram Bahadur".to_string()),
    }
}

async fn open_booking(storage: &Arc<InMemorySessionStorage>) -> String {
    // Teaching hospital: consultation fee 1500
    let hospital = SampleCatalog::sample_hospitals().remove(0);
    let session = create_booking_session(&hospital, Language::En, &patient()).await;
    let session_id = session.id.clone();
    storage.save(session).await.unwrap();
    session_id
}

async fn patch_draft(
    storage: &Arc<InMemorySessionStorage>,
    session_id: &str,
    fields: Vec<BookingField>,
) {
    let session = storage.get(session_id).await.unwrap().unwrap();
    let mut draft: BookingDraft = session
        .context
        .get(session_keys::BOOKING_DRAFT)
        .await
        .unwrap();
    for field in fields {
        draft = draft.with_field(field);
    }
    session.context.set(session_keys::BOOKING_DRAFT, &draft).await;
    storage.save(session).await.unwrap();
}

async fn confirmed_booking(
    storage: &Arc<InMemorySessionStorage>,
    session_id: &str,
) -> Option<ConfirmedBooking> {
    let session = storage.get(session_id).await.unwrap().unwrap();
    session.context.get(session_keys::CONFIRMED_BOOKING).await
}

#[tokio::test]
async fn valid_booking_confirms_with_priced_receipt() {
    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = create_booking_runner(storage.clone());
    let session_id = open_booking(&storage).await;

    let tomorrow = Local::now().date_naive() + Duration::days(1);
    patch_draft(
        &storage,
        &session_id,
        vec![
            BookingField::Date(tomorrow),
            BookingField::TimeSlot(TimeSlot::TenAm),
            BookingField::PatientName("Ram Bahadur".to_string()),
            BookingField::PatientPhone("9800000000".to_string()),
        ],
    )
    .await;

    let result = runner.run(&session_id).await.unwrap();
    assert!(matches!(result.status, ExecutionStatus::Completed));

    let booking = confirmed_booking(&storage, &session_id).await.unwrap();
    assert_eq!(booking.consultation_fee, 1500);
    assert_eq!(booking.total_amount, 1550);
    assert_eq!(booking.patient_name, "Ram Bahadur");
    assert_eq!(booking.patient_phone, "9800000000");

    assert!(booking.ticket_number.starts_with("HSP"));
    let digits = &booking.ticket_number["HSP".len()..];
    assert_eq!(digits.len(), 6);
    assert!(digits.chars().all(|c| c.is_ascii_digit()));

    // The stored receipt is a pure projection of the confirmed booking
    let session = storage.get(&session_id).await.unwrap().unwrap();
    let receipt: Receipt = session.context.get(session_keys::RECEIPT).await.unwrap();
    assert_eq!(receipt.ticket_number, booking.ticket_number);
    assert_eq!(receipt.total_amount, 1550);
    assert_eq!(receipt.appointment_time, "10:00 AM");
}

#[tokio::test]
async fn past_date_is_rejected_without_a_booking() {
    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = create_booking_runner(storage.clone());
    let session_id = open_booking(&storage).await;

    let yesterday = Local::now().date_naive() - Duration::days(1);
    patch_draft(
        &storage,
        &session_id,
        vec![
            BookingField::Date(yesterday),
            BookingField::TimeSlot(TimeSlot::NineAm),
            BookingField::PatientName("Sita Kumari".to_string()),
            BookingField::PatientPhone("9811111111".to_string()),
        ],
    )
    .await;

    let result = runner.run(&session_id).await.unwrap();
    assert!(matches!(result.status, ExecutionStatus::WaitingForInput));
    assert_eq!(
        result.response.as_deref(),
        Some("appointment date must be today or later")
    );
    assert!(confirmed_booking(&storage, &session_id).await.is_none());
}

#[tokio::test]
async fn incomplete_draft_reports_the_missing_field_and_keeps_input() {
    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = create_booking_runner(storage.clone());
    let session_id = open_booking(&storage).await;

    // No fields at all: the date is reported first
    let result = runner.run(&session_id).await.unwrap();
    assert!(matches!(result.status, ExecutionStatus::WaitingForInput));
    assert_eq!(result.response.as_deref(), Some("missing required field: date"));

    // Partially filled: the in-progress input survives the failed submit
    let tomorrow = Local::now().date_naive() + Duration::days(1);
    patch_draft(
        &storage,
        &session_id,
        vec![
            BookingField::Date(tomorrow),
            BookingField::PatientName("Ram Bahadur".to_string()),
        ],
    )
    .await;

    let result = runner.run(&session_id).await.unwrap();
    assert_eq!(
        result.response.as_deref(),
        Some("missing required field: time_slot")
    );

    let session = storage.get(&session_id).await.unwrap().unwrap();
    let draft: BookingDraft = session
        .context
        .get(session_keys::BOOKING_DRAFT)
        .await
        .unwrap();
    assert_eq!(draft.patient_name, "Ram Bahadur");
    assert!(confirmed_booking(&storage, &session_id).await.is_none());

    // Completing the draft afterwards succeeds on the same session
    patch_draft(
        &storage,
        &session_id,
        vec![
            BookingField::TimeSlot(TimeSlot::FivePm),
            BookingField::PatientPhone("9800000000".to_string()),
        ],
    )
    .await;

    let result = runner.run(&session_id).await.unwrap();
    assert!(matches!(result.status, ExecutionStatus::Completed));
    assert!(confirmed_booking(&storage, &session_id).await.is_some());
}

#[tokio::test]
async fn closing_the_session_discards_the_booking() {
    let storage = Arc::new(InMemorySessionStorage::new());
    let session_id = open_booking(&storage).await;

    storage.delete(&session_id).await.unwrap();
    assert!(storage.get(&session_id).await.unwrap().is_none());
}
