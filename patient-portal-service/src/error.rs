use thiserror::Error;

use crate::models::Language;

pub type PortalResult<T> = std::result::Result<T, PortalError>;

/// A required field is missing or out of its allowed range. Always detected
/// before any external call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("all fields are required")]
    RequiredFields,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("appointment date must be today or later")]
    DateInPast,

    #[error("unknown time slot: {0}")]
    UnknownTimeSlot(String),

    #[error("a legal document is required")]
    MissingDocument,

    #[error("message must not be empty")]
    EmptyMessage,
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Catalog read, registration write or session store failure. Surfaced
    /// as a generic notification; never retried automatically.
    #[error("external call failed: {0}")]
    ExternalCall(String),

    /// An action requiring a signed-in identity was attempted without one.
    /// Carries the language so the prompt can be localized.
    #[error("{}", .0.sign_in_prompt())]
    NotAuthenticated(Language),

    /// A chat submission arrived while the session's previous reply was
    /// still in flight.
    #[error("a reply is already in flight for this session")]
    ReplyInFlight,

    #[error(transparent)]
    Flow(#[from] care_flow::FlowError),
}

impl From<sqlx::Error> for PortalError {
    fn from(e: sqlx::Error) -> Self {
        PortalError::ExternalCall(e.to_string())
    }
}
