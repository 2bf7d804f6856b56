use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// UI language flag. Everything localized in the portal branches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "np")]
    Np,
}

impl Language {
    /// Prompt shown when a signed-out user tries an authenticated action.
    pub fn sign_in_prompt(&self) -> &'static str {
        match self {
            Language::En => "Please sign in to use the AI health assistant.",
            Language::Np => "AI स्वास्थ्य सहायक प्रयोग गर्न कृपया साइन इन गर्नुहोस्।",
        }
    }
}

/// Bookable time slots offered by every hospital listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSlot {
    #[serde(rename = "09:00 AM")]
    NineAm,
    #[serde(rename = "10:00 AM")]
    TenAm,
    #[serde(rename = "11:00 AM")]
    ElevenAm,
    #[serde(rename = "12:00 PM")]
    TwelvePm,
    #[serde(rename = "02:00 PM")]
    TwoPm,
    #[serde(rename = "03:00 PM")]
    ThreePm,
    #[serde(rename = "04:00 PM")]
    FourPm,
    #[serde(rename = "05:00 PM")]
    FivePm,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 8] = [
        TimeSlot::NineAm,
        TimeSlot::TenAm,
        TimeSlot::ElevenAm,
        TimeSlot::TwelvePm,
        TimeSlot::TwoPm,
        TimeSlot::ThreePm,
        TimeSlot::FourPm,
        TimeSlot::FivePm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::NineAm => "09:00 AM",
            TimeSlot::TenAm => "10:00 AM",
            TimeSlot::ElevenAm => "11:00 AM",
            TimeSlot::TwelvePm => "12:00 PM",
            TimeSlot::TwoPm => "02:00 PM",
            TimeSlot::ThreePm => "03:00 PM",
            TimeSlot::FourPm => "04:00 PM",
            TimeSlot::FivePm => "05:00 PM",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownTimeSlot(s.to_string()))
    }
}

/// A hospital listing shown to patients. Immutable within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub id: String,
    pub name: String,
    pub name_nepali: String,
    pub address: String,
    pub specialties: Vec<String>,
    pub rating: f32,
    pub open_hours: String,
    pub doctors_available: u32,
    pub distance_km: f64,
    pub consultation_fee: i64,
}

impl Hospital {
    /// Display name for the active language.
    pub fn display_name(&self, language: Language) -> &str {
        match language {
            Language::En => &self.name,
            Language::Np => &self.name_nepali,
        }
    }

    /// Card projection: specialties truncated to the first 3 for display.
    pub fn card(&self) -> HospitalCard {
        HospitalCard {
            id: self.id.clone(),
            name: self.name.clone(),
            name_nepali: self.name_nepali.clone(),
            address: self.address.clone(),
            specialties: self.specialties.iter().take(3).cloned().collect(),
            rating: self.rating,
            open_hours: self.open_hours.clone(),
            doctors_available: self.doctors_available,
            distance_km: self.distance_km,
            consultation_fee: self.consultation_fee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalCard {
    pub id: String,
    pub name: String,
    pub name_nepali: String,
    pub address: String,
    pub specialties: Vec<String>,
    pub rating: f32,
    pub open_hours: String,
    pub doctors_available: u32,
    pub distance_km: f64,
    pub consultation_fee: i64,
}

/// A doctor listing with per-day availability descriptors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub name_nepali: String,
    pub specialty: String,
    pub hospital: String,
    pub experience_years: u32,
    pub rating: f32,
    pub consultation_fee: i64,
    pub availability: Vec<String>,
}

/// A lab test listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTest {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub home_collection_available: bool,
    pub report_delivery_days: u32,
}

/// Directory row from the externally-hosted table of approved institutions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: Uuid,
    pub institution_type: InstitutionType,
    pub name: String,
    pub location: String,
    pub city: String,
    pub district: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub services_description: String,
    pub is_active: bool,
}

impl Institution {
    /// Card projection: comma-separated services truncated to the first 3.
    pub fn card(&self) -> InstitutionCard {
        InstitutionCard {
            id: self.id,
            institution_type: self.institution_type,
            name: self.name.clone(),
            location: self.location.clone(),
            city: self.city.clone(),
            district: self.district.clone(),
            contact_email: self.contact_email.clone(),
            contact_phone: self.contact_phone.clone(),
            services: self
                .services_description
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(3)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionCard {
    pub id: Uuid,
    pub institution_type: InstitutionType,
    pub name: String,
    pub location: String,
    pub city: String,
    pub district: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionType {
    Hospital,
    PathologyLab,
}

impl fmt::Display for InstitutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstitutionType::Hospital => write!(f, "hospital"),
            InstitutionType::PathologyLab => write!(f, "pathology_lab"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStatus::Pending => write!(f, "pending"),
            RegistrationStatus::Approved => write!(f, "approved"),
            RegistrationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// In-progress booking input. Created empty when a booking opens, filled
/// field by field, and discarded when the session closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDraft {
    pub hospital_id: String,
    pub hospital_name: String,
    pub hospital_name_nepali: String,
    pub hospital_address: String,
    pub consultation_fee: i64,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<TimeSlot>,
    pub doctor_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,
}

/// One field update applied to a draft.
#[derive(Debug, Clone)]
pub enum BookingField {
    Date(NaiveDate),
    TimeSlot(TimeSlot),
    Doctor(Option<String>),
    PatientName(String),
    PatientPhone(String),
}

impl BookingDraft {
    /// Pure update: returns a new draft with the field applied.
    pub fn with_field(&self, field: BookingField) -> Self {
        let mut draft = self.clone();
        match field {
            BookingField::Date(date) => draft.date = Some(date),
            BookingField::TimeSlot(slot) => draft.time_slot = Some(slot),
            BookingField::Doctor(doctor_id) => draft.doctor_id = doctor_id,
            BookingField::PatientName(name) => draft.patient_name = name,
            BookingField::PatientPhone(phone) => draft.patient_phone = phone,
        }
        draft
    }
}

/// A committed booking. Read-only once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmedBooking {
    pub hospital_id: String,
    pub hospital_name: String,
    pub hospital_name_nepali: String,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub doctor_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,
    pub consultation_fee: i64,
    pub total_amount: i64,
    pub ticket_number: String,
}

/// A submitted institution registration, pending external review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionRegistration {
    pub id: Uuid,
    pub institution_type: InstitutionType,
    pub name: String,
    pub location: String,
    pub city: String,
    pub district: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub services_description: String,
    pub legal_document_name: String,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// API request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct StartBookingRequest {
    pub hospital_id: String,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateBookingRequest {
    pub date: Option<NaiveDate>,
    pub time_slot: Option<String>,
    pub doctor_id: Option<String>,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingSessionResponse {
    pub session_id: String,
    pub status: String,
    pub status_message: Option<String>,
    pub draft: Option<BookingDraft>,
    pub booking: Option<ConfirmedBooking>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartChatRequest {
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartChatResponse {
    pub session_id: String,
    pub greeting: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub session_id: String,
    pub reply: Option<String>,
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateMessageRequest {
    pub rating: care_flow::Rating,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub state: String,
    pub messages: Vec<care_flow::ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub institution_type: InstitutionType,
    pub name: String,
    pub location: String,
    pub city: String,
    pub district: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub services_description: String,
    pub legal_document_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub id: Uuid,
    pub status: RegistrationStatus,
}
