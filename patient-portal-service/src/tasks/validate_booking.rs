use async_trait::async_trait;
use care_flow::{Context, FlowError, NextAction, Result, Task, TaskResult};
use chrono::Local;
use tracing::info;

use crate::booking;
use crate::models::BookingDraft;
use crate::tasks::session_keys;

/// Task that checks the draft against the submission rules. On failure the
/// session stays here and the offending field is reported back; on success
/// control flows straight into confirmation.
pub struct ValidateBookingTask;

#[async_trait]
impl Task for ValidateBookingTask {
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        info!("running task: {}", self.id());

        let draft: BookingDraft = context
            .get(session_keys::BOOKING_DRAFT)
            .await
            .ok_or_else(|| FlowError::ContextError("booking_draft not found".to_string()))?;

        let today = Local::now().date_naive();

        match booking::validate(&draft, today) {
            Ok(()) => {
                context.set(session_keys::VALIDATION_PASSED, true).await;

                let status_message = format!(
                    "Booking details validated for {} - proceeding to confirmation",
                    draft.hospital_name
                );
                info!("{}", status_message);

                Ok(TaskResult::new_with_status(
                    None,
                    NextAction::ContinueAndExecute,
                    Some(status_message),
                ))
            }
            Err(err) => {
                context.set(session_keys::VALIDATION_PASSED, false).await;

                let status_message = format!("Waiting for valid booking details: {}", err);
                Ok(TaskResult::new_with_status(
                    Some(err.to_string()),
                    NextAction::WaitForInput,
                    Some(status_message),
                ))
            }
        }
    }
}
