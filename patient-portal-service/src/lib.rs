pub mod booking;
pub mod catalog;
pub mod chat;
pub mod error;
pub mod identity;
pub mod models;
pub mod receipt;
pub mod registration;
pub mod service;
pub mod tasks;
pub mod wellness;
pub mod workflow;

pub use error::{PortalError, PortalResult, ValidationError};
pub use service::{AppState, build_router, create_app};
pub use workflow::{
    build_booking_workflow, build_chat_workflow, create_booking_runner, create_booking_session,
    create_chat_runner, create_chat_session,
};
