use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Helpfulness rating a user may attach to an assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Up,
    Down,
}

/// One entry of a session transcript. Append-only: once added, a message is
/// never removed and only its `rating` field may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            rating: None,
        }
    }
}

/// Context for sharing data between tasks in a flow execution.
///
/// Carries a typed key/value store plus the session transcript. Cloning is
/// cheap; clones share the same underlying state.
#[derive(Clone, Debug, Default)]
pub struct Context {
    data: Arc<DashMap<String, Value>>,
    transcript: Arc<RwLock<Vec<ChatMessage>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).expect("failed to serialize context value");
        self.data.insert(key.into(), value);
    }

    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_sync(key)
    }

    pub fn get_sync<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, v)| v)
    }

    pub async fn clear(&self) {
        self.data.clear();
    }

    /// Append a user message and return its id.
    pub async fn add_user_message(&self, content: impl Into<String>) -> Uuid {
        self.push_message(ChatMessage::user(content))
    }

    /// Append an assistant message and return its id.
    pub async fn add_assistant_message(&self, content: impl Into<String>) -> Uuid {
        self.push_message(ChatMessage::assistant(content))
    }

    fn push_message(&self, message: ChatMessage) -> Uuid {
        let id = message.id;
        self.transcript.write().unwrap().push(message);
        id
    }

    /// Snapshot of the whole transcript, in insertion order.
    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.read().unwrap().clone()
    }

    /// The last `n` transcript messages, in insertion order.
    pub async fn last_messages(&self, n: usize) -> Vec<ChatMessage> {
        let transcript = self.transcript.read().unwrap();
        let start = transcript.len().saturating_sub(n);
        transcript[start..].to_vec()
    }

    pub async fn user_message_count(&self) -> usize {
        self.count_role(MessageRole::User)
    }

    pub async fn assistant_message_count(&self) -> usize {
        self.count_role(MessageRole::Assistant)
    }

    fn count_role(&self, role: MessageRole) -> usize {
        self.transcript
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.role == role)
            .count()
    }

    /// Attach a helpfulness rating to an assistant message. Overwrites any
    /// earlier rating on the same message. Returns false when the id is
    /// unknown or names a user message; the transcript is left untouched.
    pub async fn rate_message(&self, id: Uuid, rating: Rating) -> bool {
        let mut transcript = self.transcript.write().unwrap();
        match transcript
            .iter_mut()
            .find(|m| m.id == id && m.role == MessageRole::Assistant)
        {
            Some(message) => {
                message.rating = Some(rating);
                true
            }
            None => false,
        }
    }
}

/// Wire form of a context: the data map plus the transcript. Sessions are
/// persisted through this shape.
#[derive(Serialize, Deserialize)]
struct ContextSnapshot {
    data: BTreeMap<String, Value>,
    transcript: Vec<ChatMessage>,
}

impl Serialize for Context {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let snapshot = ContextSnapshot {
            data: self
                .data
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
            transcript: self.transcript.read().unwrap().clone(),
        };
        snapshot.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Context {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let snapshot = ContextSnapshot::deserialize(deserializer)?;
        let context = Context::new();
        for (key, value) in snapshot.data {
            context.data.insert(key, value);
        }
        *context.transcript.write().unwrap() = snapshot.transcript;
        Ok(context)
    }
}
