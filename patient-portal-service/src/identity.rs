use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};
use crate::models::Language;

/// The signed-in user as exposed by the external identity collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

/// Profile fields the identity collaborator keeps alongside the account.
/// Sign-in, sign-up and profile updates happen on that side; the portal
/// only reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub preferred_language: Option<Language>,
}

/// Boundary to the hosted identity provider: resolve a bearer token to the
/// current user, or nothing when the token is unknown.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> PortalResult<Option<SessionUser>>;
}

/// Token-to-user map standing in for the hosted provider in development
/// and tests.
#[derive(Default)]
pub struct StaticTokenIdentity {
    tokens: DashMap<String, SessionUser>,
}

impl StaticTokenIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_token(&self, token: impl Into<String>, user: SessionUser) {
        self.tokens.insert(token.into(), user);
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn authenticate(&self, token: &str) -> PortalResult<Option<SessionUser>> {
        Ok(self.tokens.get(token).map(|entry| entry.clone()))
    }
}

/// Resolve the `Authorization: Bearer ...` header to a user, or fail with
/// the localized sign-in prompt.
pub async fn require_user(
    provider: &dyn IdentityProvider,
    bearer: Option<&str>,
    language: Language,
) -> PortalResult<SessionUser> {
    let token = bearer.ok_or(PortalError::NotAuthenticated(language))?;
    provider
        .authenticate(token)
        .await?
        .ok_or(PortalError::NotAuthenticated(language))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            email: "ram@example.com".to_string(),
            full_name: Some("Ram Bahadur".to_string()),
        }
    }

    #[tokio::test]
    async fn known_token_resolves() {
        let identity = StaticTokenIdentity::new();
        identity.insert_token("token-1", user());

        let resolved = require_user(&identity, Some("token-1"), Language::En)
            .await
            .unwrap();
        assert_eq!(resolved.email, "ram@example.com");
    }

    #[tokio::test]
    async fn missing_token_yields_localized_prompt() {
        let identity = StaticTokenIdentity::new();

        let err = require_user(&identity, None, Language::Np).await.unwrap_err();
        assert!(matches!(err, PortalError::NotAuthenticated(Language::Np)));
        assert!(err.to_string().contains("साइन इन"));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let identity = StaticTokenIdentity::new();
        let err = require_user(&identity, Some("nope"), Language::En)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::NotAuthenticated(Language::En)));
    }
}
