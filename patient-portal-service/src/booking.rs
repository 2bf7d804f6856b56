use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{BookingDraft, ConfirmedBooking, Hospital};

/// Flat surcharge added to every booking on top of the consultation fee.
pub const BOOKING_FEE: i64 = 50;

/// Human-readable booking reference: "HSP" followed by six decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(String);

impl TicketNumber {
    pub const PREFIX: &'static str = "HSP";

    /// Six decimal digits after the fixed prefix, drawn uniformly at random.
    pub fn generate() -> Self {
        let digits = rand::rng().random_range(0..1_000_000u32);
        Self(format!("{}{:06}", Self::PREFIX, digits))
    }

    /// Legacy derivation used when a booking reaches the receipt without a
    /// ticket: the low six decimal digits of the current timestamp.
    pub fn from_timestamp(now: DateTime<Utc>) -> Self {
        let millis = now.timestamp_millis().unsigned_abs();
        Self(format!("{}{:06}", Self::PREFIX, millis % 1_000_000))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Open a fresh draft for a hospital listing. All patient fields start empty.
pub fn start_booking(hospital: &Hospital) -> BookingDraft {
    BookingDraft {
        hospital_id: hospital.id.clone(),
        hospital_name: hospital.name.clone(),
        hospital_name_nepali: hospital.name_nepali.clone(),
        hospital_address: hospital.address.clone(),
        consultation_fee: hospital.consultation_fee,
        date: None,
        time_slot: None,
        doctor_id: None,
        patient_name: String::new(),
        patient_phone: String::new(),
    }
}

/// Check a draft against the submission rules: date present and not before
/// `today`, slot chosen, patient name and phone non-blank. Reports the first
/// offending field; the draft itself is never touched.
pub fn validate(draft: &BookingDraft, today: NaiveDate) -> Result<(), ValidationError> {
    let date = draft.date.ok_or(ValidationError::MissingField("date"))?;
    if date < today {
        return Err(ValidationError::DateInPast);
    }
    if draft.time_slot.is_none() {
        return Err(ValidationError::MissingField("time_slot"));
    }
    if draft.patient_name.trim().is_empty() {
        return Err(ValidationError::MissingField("patient_name"));
    }
    if draft.patient_phone.trim().is_empty() {
        return Err(ValidationError::MissingField("patient_phone"));
    }
    Ok(())
}

/// Submit a draft: validate, price and assign a ticket number. The total is
/// computed here and only here; it is never taken from user input.
pub fn submit(draft: &BookingDraft, today: NaiveDate) -> Result<ConfirmedBooking, ValidationError> {
    validate(draft, today)?;

    // validate() guarantees both fields are present
    let date = draft.date.ok_or(ValidationError::MissingField("date"))?;
    let time_slot = draft
        .time_slot
        .ok_or(ValidationError::MissingField("time_slot"))?;

    Ok(ConfirmedBooking {
        hospital_id: draft.hospital_id.clone(),
        hospital_name: draft.hospital_name.clone(),
        hospital_name_nepali: draft.hospital_name_nepali.clone(),
        date,
        time_slot,
        doctor_id: draft.doctor_id.clone(),
        patient_name: draft.patient_name.trim().to_string(),
        patient_phone: draft.patient_phone.trim().to_string(),
        consultation_fee: draft.consultation_fee,
        total_amount: draft.consultation_fee + BOOKING_FEE,
        ticket_number: TicketNumber::generate().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SampleCatalog;
    use crate::models::{BookingField, TimeSlot};
    use chrono::Duration;

    fn teaching_hospital() -> Hospital {
        SampleCatalog::sample_hospitals().remove(0)
    }

    fn filled_draft(today: NaiveDate) -> BookingDraft {
        start_booking(&teaching_hospital())
            .with_field(BookingField::Date(today + Duration::days(1)))
            .with_field(BookingField::TimeSlot(TimeSlot::TenAm))
            .with_field(BookingField::PatientName("Ram Bahadur".to_string()))
            .with_field(BookingField::PatientPhone("9800000000".to_string()))
    }

    #[test]
    fn update_field_is_pure() {
        let draft = start_booking(&teaching_hospital());
        let updated = draft.with_field(BookingField::PatientName("Sita".to_string()));

        assert!(draft.patient_name.is_empty());
        assert_eq!(updated.patient_name, "Sita");
    }

    #[test]
    fn past_date_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let draft = filled_draft(today).with_field(BookingField::Date(today - Duration::days(1)));

        assert_eq!(submit(&draft, today).unwrap_err(), ValidationError::DateInPast);
    }

    #[test]
    fn booking_today_is_allowed() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let draft = filled_draft(today).with_field(BookingField::Date(today));

        assert!(submit(&draft, today).is_ok());
    }

    #[test]
    fn missing_fields_are_reported_specifically() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let hospital = teaching_hospital();

        let empty = start_booking(&hospital);
        assert_eq!(
            validate(&empty, today).unwrap_err(),
            ValidationError::MissingField("date")
        );

        let dated = empty.with_field(BookingField::Date(today));
        assert_eq!(
            validate(&dated, today).unwrap_err(),
            ValidationError::MissingField("time_slot")
        );

        let slotted = dated.with_field(BookingField::TimeSlot(TimeSlot::NineAm));
        assert_eq!(
            validate(&slotted, today).unwrap_err(),
            ValidationError::MissingField("patient_name")
        );

        let named = slotted.with_field(BookingField::PatientName("Ram".to_string()));
        assert_eq!(
            validate(&named, today).unwrap_err(),
            ValidationError::MissingField("patient_phone")
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let draft = filled_draft(today).with_field(BookingField::PatientName("   ".to_string()));

        assert_eq!(
            submit(&draft, today).unwrap_err(),
            ValidationError::MissingField("patient_name")
        );
    }

    #[test]
    fn total_is_fee_plus_surcharge() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let booking = submit(&filled_draft(today), today).unwrap();

        assert_eq!(booking.consultation_fee, 1500);
        assert_eq!(booking.total_amount, 1550);
    }

    #[test]
    fn ticket_number_has_prefix_and_six_digits() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let booking = submit(&filled_draft(today), today).unwrap();

        let ticket = &booking.ticket_number;
        assert!(ticket.starts_with("HSP"));
        let digits = &ticket["HSP".len()..];
        assert_eq!(digits.len(), 6);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn timestamp_ticket_matches_the_same_shape() {
        let ticket = TicketNumber::from_timestamp(Utc::now());
        assert!(ticket.as_str().starts_with("HSP"));
        assert_eq!(ticket.as_str().len(), 9);
    }
}
