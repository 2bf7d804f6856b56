// Context keys shared by the portal workflows
pub mod session_keys {
    pub const LANGUAGE: &str = "language";
    pub const USER_ID: &str = "user_id";
    pub const USER_INPUT: &str = "user_input";
    pub const BOOKING_DRAFT: &str = "booking_draft";
    pub const VALIDATION_PASSED: &str = "validation_passed";
    pub const CONFIRMED_BOOKING: &str = "confirmed_booking";
    pub const RECEIPT: &str = "receipt";
}
