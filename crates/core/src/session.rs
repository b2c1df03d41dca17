//! Session resolution: mapping a session token to a user identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Unique identifier for a work session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A resolved session as reported by the authentication service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
}

/// Resolves `(session id, token)` pairs to sessions.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Returns `Ok(None)` when the service knows no such session.
    async fn resolve(
        &self,
        session_id: &SessionId,
        token: &str,
    ) -> std::result::Result<Option<Session>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_uses_camel_case() {
        let session: Session =
            serde_json::from_str(r#"{"id":"s1","userId":"u1"}"#).unwrap();
        assert_eq!(session.user_id, "u1");
    }

    #[test]
    fn session_id_display() {
        let id = SessionId::from("abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(id.as_str(), "abc");
    }
}
