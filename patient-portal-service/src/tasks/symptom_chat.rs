use std::sync::Arc;

use async_trait::async_trait;
use care_flow::{Context, FlowError, NextAction, Result, Task, TaskResult};
use tracing::info;

use crate::chat::{ReplyPrompt, ReplySource};
use crate::error::ValidationError;
use crate::models::Language;
use crate::tasks::session_keys;

/// The chat turn: append the user message, obtain exactly one reply from
/// the configured source, append it, and wait for the next message.
///
/// Blank input is rejected without touching the transcript, so assistant
/// replies always interleave 1:1 with accepted user messages.
pub struct SymptomChatTask {
    reply_source: Arc<dyn ReplySource>,
}

impl SymptomChatTask {
    pub fn new(reply_source: Arc<dyn ReplySource>) -> Self {
        Self { reply_source }
    }
}

#[async_trait]
impl Task for SymptomChatTask {
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        info!("running task: {}", self.id());

        let language: Language = context
            .get(session_keys::LANGUAGE)
            .await
            .unwrap_or_default();

        let user_input: String = context
            .get(session_keys::USER_INPUT)
            .await
            .ok_or_else(|| FlowError::ContextError("user_input not found".to_string()))?;
        context.remove(session_keys::USER_INPUT).await;

        if user_input.trim().is_empty() {
            return Ok(TaskResult::new_with_status(
                Some(ValidationError::EmptyMessage.to_string()),
                NextAction::WaitForInput,
                Some("Rejected empty message".to_string()),
            ));
        }

        context.add_user_message(user_input.clone()).await;

        let history = context.transcript().await;
        let reply = self
            .reply_source
            .next_reply(ReplyPrompt {
                language,
                user_message: &user_input,
                history: &history,
            })
            .await
            .map_err(|e| FlowError::TaskExecutionFailed(e.to_string()))?;

        context.add_assistant_message(reply.clone()).await;

        Ok(TaskResult::new_with_status(
            Some(reply),
            NextAction::WaitForInput,
            Some("Reply delivered - waiting for the next message".to_string()),
        ))
    }
}
