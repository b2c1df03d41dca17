//! HTTP bridge to the authentication service.

use async_trait::async_trait;
use learnflow_core::error::SessionError;
use learnflow_core::{Session, SessionId, SessionResolver};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub struct HttpSessionResolver {
    url: String,
    client: reqwest::Client,
}

/// The auth service answers `{"session": {...}}`, with `null` when it does
/// not know the session.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    session: Option<Session>,
}

impl HttpSessionResolver {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    fn parse(body: &str) -> Result<Option<Session>, SessionError> {
        let response: SessionResponse =
            serde_json::from_str(body).map_err(|e| SessionError::Malformed(e.to_string()))?;
        Ok(response.session)
    }
}

#[async_trait]
impl SessionResolver for HttpSessionResolver {
    async fn resolve(
        &self,
        session_id: &SessionId,
        token: &str,
    ) -> std::result::Result<Option<Session>, SessionError> {
        debug!(session_id = %session_id, "Resolving session");
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "sessionId": session_id.as_str(), "token": token }))
            .send()
            .await
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SessionError::Unavailable(format!(
                "auth service returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        Self::parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_session() {
        let session = HttpSessionResolver::parse(r#"{"session":{"id":"s1","userId":"u1"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(session.user_id, "u1");
    }

    #[test]
    fn null_session_is_none() {
        assert!(HttpSessionResolver::parse(r#"{"session":null}"#).unwrap().is_none());
        assert!(HttpSessionResolver::parse("{}").unwrap().is_none());
    }

    #[test]
    fn garbage_is_malformed() {
        let err = HttpSessionResolver::parse("<html>").unwrap_err();
        assert!(matches!(err, SessionError::Malformed(_)));
    }
}
