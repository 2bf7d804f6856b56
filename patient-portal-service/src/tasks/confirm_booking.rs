use async_trait::async_trait;
use care_flow::{Context, FlowError, NextAction, Result, Task, TaskResult};
use chrono::Local;
use tracing::info;

use crate::booking;
use crate::models::{BookingDraft, Language};
use crate::receipt;
use crate::tasks::session_keys;

/// Terminal booking task: prices the draft, assigns the ticket number and
/// renders the receipt. Only reachable once validation has passed.
pub struct ConfirmBookingTask;

#[async_trait]
impl Task for ConfirmBookingTask {
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        info!("running task: {}", self.id());

        let draft: BookingDraft = context
            .get(session_keys::BOOKING_DRAFT)
            .await
            .ok_or_else(|| FlowError::ContextError("booking_draft not found".to_string()))?;

        let language: Language = context
            .get(session_keys::LANGUAGE)
            .await
            .unwrap_or_default();

        let today = Local::now().date_naive();
        let booking = booking::submit(&draft, today)
            .map_err(|e| FlowError::TaskExecutionFailed(e.to_string()))?;
        let receipt = receipt::render(&booking, language);

        context
            .set(session_keys::CONFIRMED_BOOKING, &booking)
            .await;
        context.set(session_keys::RECEIPT, &receipt).await;

        let status_message = format!(
            "Booking confirmed - ticket {} for Rs. {}",
            receipt.ticket_number, receipt.total_amount
        );
        info!("{}", status_message);

        Ok(TaskResult::new_with_status(
            Some(receipt.text()),
            NextAction::End,
            Some(status_message),
        ))
    }
}
