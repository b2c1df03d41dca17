//! HTTP bridge to the user-model service.
//!
//! Requests carry `{sid, userId, token}`; the answer's `userInformation`
//! object is decoded by [`UserProfile::from_user_information`].

use async_trait::async_trait;
use learnflow_core::error::ProfileError;
use learnflow_core::{ProfileService, SessionId, UserProfile};
use serde_json::json;
use tracing::debug;

pub struct HttpProfileService {
    url: String,
    client: reqwest::Client,
}

impl HttpProfileService {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    fn parse(doc: &serde_json::Value) -> Result<UserProfile, ProfileError> {
        let info = doc
            .get("userInformation")
            .ok_or_else(|| ProfileError::MissingField("userInformation".into()))?;
        UserProfile::from_user_information(info)
    }
}

#[async_trait]
impl ProfileService for HttpProfileService {
    async fn fetch_profile(
        &self,
        session_id: &SessionId,
        user_id: &str,
        token: &str,
    ) -> std::result::Result<UserProfile, ProfileError> {
        debug!(session_id = %session_id, user_id, "Requesting user information");
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "sid": session_id.as_str(), "userId": user_id, "token": token }))
            .send()
            .await
            .map_err(|e| ProfileError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfileError::Unavailable(format!(
                "user model returned {status}"
            )));
        }

        let doc: serde_json::Value =
            response.json().await.map_err(|e| ProfileError::Malformed {
                field: "userInformation".into(),
                reason: e.to_string(),
            })?;
        Self::parse(&doc)
    }
}
