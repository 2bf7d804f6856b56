use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::booking::TicketNumber;
use crate::models::{ConfirmedBooking, Language};

const WEEKDAYS_EN: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS_NP: [&str; 7] = [
    "आइतबार",
    "सोमबार",
    "मङ्गलबार",
    "बुधबार",
    "बिहीबार",
    "शुक्रबार",
    "शनिबार",
];

const MONTHS_NP: [&str; 12] = [
    "जनवरी",
    "फेब्रुअरी",
    "मार्च",
    "अप्रिल",
    "मे",
    "जुन",
    "जुलाई",
    "अगस्ट",
    "सेप्टेम्बर",
    "अक्टोबर",
    "नोभेम्बर",
    "डिसेम्बर",
];

/// Render decimal digits in Devanagari numerals.
fn to_devanagari(value: impl ToString) -> String {
    value
        .to_string()
        .chars()
        .map(|c| match c {
            '0'..='9' => {
                let offset = c as u32 - '0' as u32;
                char::from_u32('०' as u32 + offset).unwrap_or(c)
            }
            other => other,
        })
        .collect()
}

/// Long-form appointment date in the locale convention of the active
/// language: weekday, month name, day, year.
pub fn format_long_date(date: NaiveDate, language: Language) -> String {
    let weekday = date.weekday().num_days_from_sunday() as usize;
    let month = date.month0() as usize;
    match language {
        Language::En => format!(
            "{}, {} {}, {}",
            WEEKDAYS_EN[weekday],
            MONTHS_EN[month],
            date.day(),
            date.year()
        ),
        Language::Np => format!(
            "{}, {} {}, {}",
            WEEKDAYS_NP[weekday],
            MONTHS_NP[month],
            to_devanagari(date.day()),
            to_devanagari(date.year())
        ),
    }
}

struct ReceiptLabels {
    confirmed: &'static str,
    thank_you: &'static str,
    ticket_number: &'static str,
    hospital: &'static str,
    date: &'static str,
    time: &'static str,
    patient: &'static str,
    phone: &'static str,
    total: &'static str,
    note: &'static str,
    arrive_early: &'static str,
    bring_id: &'static str,
}

impl ReceiptLabels {
    fn get(language: Language) -> Self {
        match language {
            Language::En => Self {
                confirmed: "Ticket Confirmed!",
                thank_you: "Thank you for booking with us",
                ticket_number: "Ticket Number",
                hospital: "Hospital",
                date: "Appointment Date",
                time: "Time",
                patient: "Patient Name",
                phone: "Phone Number",
                total: "Total Paid",
                note: "Important Note",
                arrive_early: "Please arrive 15 minutes before your scheduled time",
                bring_id: "Bring a valid ID and this ticket confirmation",
            },
            Language::Np => Self {
                confirmed: "टिकट पुष्टि भयो!",
                thank_you: "हामीसँग बुकिङ गर्नुभएकोमा धन्यवाद",
                ticket_number: "टिकट नम्बर",
                hospital: "अस्पताल",
                date: "अपोइन्टमेन्ट मिति",
                time: "समय",
                patient: "बिरामीको नाम",
                phone: "फोन नम्बर",
                total: "कुल भुक्तानी",
                note: "महत्वपूर्ण नोट",
                arrive_early: "कृपया तोकिएको समयभन्दा १५ मिनेट अगाडि आउनुहोस्",
                bring_id: "वैध परिचयपत्र र यो टिकट पुष्टि ल्याउनुहोस्",
            },
        }
    }
}

/// Immutable booking receipt. A pure projection of a `ConfirmedBooking`:
/// rendering the same booking twice yields the same receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub ticket_number: String,
    pub hospital: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub consultation_fee: i64,
    pub booking_fee: i64,
    pub total_amount: i64,
    pub notes: Vec<String>,
    pub language: Language,
}

/// Project a confirmed booking into its receipt view. A booking that
/// somehow carries no ticket gets the timestamp-derived fallback form.
pub fn render(booking: &ConfirmedBooking, language: Language) -> Receipt {
    let labels = ReceiptLabels::get(language);
    let ticket_number = if booking.ticket_number.is_empty() {
        TicketNumber::from_timestamp(Utc::now()).to_string()
    } else {
        booking.ticket_number.clone()
    };

    let hospital = match language {
        Language::En => booking.hospital_name.clone(),
        Language::Np => booking.hospital_name_nepali.clone(),
    };

    Receipt {
        ticket_number,
        hospital,
        appointment_date: format_long_date(booking.date, language),
        appointment_time: booking.time_slot.to_string(),
        patient_name: booking.patient_name.clone(),
        patient_phone: booking.patient_phone.clone(),
        consultation_fee: booking.consultation_fee,
        booking_fee: booking.total_amount - booking.consultation_fee,
        total_amount: booking.total_amount,
        notes: vec![labels.arrive_early.to_string(), labels.bring_id.to_string()],
        language,
    }
}

impl Receipt {
    /// Plain-text rendering, used as the workflow's user-facing response.
    pub fn text(&self) -> String {
        let labels = ReceiptLabels::get(self.language);
        format!(
            "{confirmed}\n{thank_you}\n\n{ticket_label}: {ticket}\n{hospital_label}: {hospital}\n{date_label}: {date}\n{time_label}: {time}\n{patient_label}: {patient}\n{phone_label}: {phone}\n{total_label}: Rs. {total}\n\n{note_label}:\n- {arrive_early}\n- {bring_id}",
            confirmed = labels.confirmed,
            thank_you = labels.thank_you,
            ticket_label = labels.ticket_number,
            ticket = self.ticket_number,
            hospital_label = labels.hospital,
            hospital = self.hospital,
            date_label = labels.date,
            date = self.appointment_date,
            time_label = labels.time,
            time = self.appointment_time,
            patient_label = labels.patient,
            patient = self.patient_name,
            phone_label = labels.phone,
            phone = self.patient_phone,
            total_label = labels.total,
            total = self.total_amount,
            note_label = labels.note,
            arrive_early = labels.arrive_early,
            bring_id = labels.bring_id,
        )
    }

    /// Download action. File generation is out of scope; only the intent is
    /// recorded.
    pub fn log_download(&self) {
        info!(ticket_number = %self.ticket_number, "ticket download requested");
    }
}
