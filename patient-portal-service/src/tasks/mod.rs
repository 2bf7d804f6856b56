// Portal workflow tasks
pub mod confirm_booking;
pub mod symptom_chat;
pub mod validate_booking;

// Shared modules
pub mod types;

// Re-export task implementations
pub use confirm_booking::ConfirmBookingTask;
pub use symptom_chat::SymptomChatTask;
pub use validate_booking::ValidateBookingTask;

// Re-export session keys
pub use types::session_keys;
