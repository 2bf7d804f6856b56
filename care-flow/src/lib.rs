pub mod context;
pub mod error;
pub mod graph;
pub mod runner;
pub mod storage;
pub mod task;

// Re-export commonly used types
pub use context::{ChatMessage, Context, MessageRole, Rating};
pub use error::{FlowError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, Graph, GraphBuilder};
pub use runner::FlowRunner;
pub use storage::{
    GraphStorage, InMemoryGraphStorage, InMemorySessionStorage, PostgresSessionStorage, Session,
    SessionStorage,
};
pub use task::{NextAction, Task, TaskResult};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EchoTask;

    #[async_trait]
    impl Task for EchoTask {
        fn id(&self) -> &str {
            "echo_task"
        }

        async fn run(&self, context: Context) -> Result<TaskResult> {
            let input: String = context.get("input").await.unwrap_or_default();
            context.set("output", format!("Processed: {}", input)).await;

            Ok(TaskResult::new(
                Some("Task completed".to_string()),
                NextAction::End,
            ))
        }
    }

    struct HandoffTask;

    #[async_trait]
    impl Task for HandoffTask {
        fn id(&self) -> &str {
            "handoff_task"
        }

        async fn run(&self, context: Context) -> Result<TaskResult> {
            context.set("input", "from handoff").await;
            Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
        }
    }

    #[tokio::test]
    async fn single_step_execution_completes() {
        let graph = GraphBuilder::new("test_graph")
            .add_task(Arc::new(EchoTask))
            .build();

        let mut session = Session::new_from_task("s1".to_string(), "echo_task");
        session.context.set("input", "Hello, World!").await;

        let result = graph.execute_session(&mut session).await.unwrap();

        assert!(result.response.is_some());
        assert!(matches!(result.status, ExecutionStatus::Completed));

        let output: String = session.context.get("output").await.unwrap();
        assert_eq!(output, "Processed: Hello, World!");
    }

    #[tokio::test]
    async fn continue_and_execute_chains_tasks() {
        let graph = GraphBuilder::new("chain")
            .add_task(Arc::new(HandoffTask))
            .add_task(Arc::new(EchoTask))
            .add_edge("handoff_task", "echo_task")
            .build();

        let mut session = Session::new_from_task("s2".to_string(), "handoff_task");
        let result = graph.execute_session(&mut session).await.unwrap();

        // The chained echo task ran within the same step
        assert!(matches!(result.status, ExecutionStatus::Completed));
        let output: String = session.context.get("output").await.unwrap();
        assert_eq!(output, "Processed: from handoff");
    }

    #[tokio::test]
    async fn unknown_task_is_an_error() {
        let graph = GraphBuilder::new("empty").build();
        let mut session = Session::new_from_task("s3".to_string(), "missing");

        let err = graph.execute_session(&mut session).await.unwrap_err();
        assert!(matches!(err, FlowError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn storage_round_trip() {
        let graph_storage = InMemoryGraphStorage::new();
        let session_storage = InMemorySessionStorage::new();

        let graph = Arc::new(Graph::new("test"));
        graph_storage
            .save("test".to_string(), graph.clone())
            .await
            .unwrap();
        assert!(graph_storage.get("test").await.unwrap().is_some());

        let session = Session::new_from_task("session1".to_string(), "task1");
        session.context.set("key", 42u32).await;
        session.context.add_user_message("hello").await;

        session_storage.save(session).await.unwrap();
        let retrieved = session_storage.get("session1").await.unwrap().unwrap();
        assert_eq!(retrieved.context.get::<u32>("key").await, Some(42));
        assert_eq!(retrieved.context.user_message_count().await, 1);
    }

    #[tokio::test]
    async fn context_serialization_preserves_transcript() {
        let context = Context::new();
        context.set("lang", "en").await;
        context.add_user_message("I have a headache").await;
        let reply_id = context.add_assistant_message("Since when?").await;
        context.rate_message(reply_id, Rating::Up).await;

        let json = serde_json::to_string(&context).unwrap();
        let restored: Context = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.get_sync::<String>("lang"), Some("en".to_string()));
        let transcript = restored.transcript().await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, MessageRole::User);
        assert_eq!(transcript[1].rating, Some(Rating::Up));

        let tail = restored.last_messages(1).await;
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn ratings_only_apply_to_assistant_messages() {
        let context = Context::new();
        let user_id = context.add_user_message("hi").await;
        let reply_id = context.add_assistant_message("hello").await;

        assert!(!context.rate_message(user_id, Rating::Down).await);
        assert!(context.rate_message(reply_id, Rating::Down).await);
        // Overwriting is allowed
        assert!(context.rate_message(reply_id, Rating::Up).await);

        let transcript = context.transcript().await;
        assert_eq!(transcript[0].rating, None);
        assert_eq!(transcript[1].rating, Some(Rating::Up));
    }
}
