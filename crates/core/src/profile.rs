//! User profile trait and the profile payload model.
//!
//! The profile service delivers the session owner's role, workplace groups and
//! development goals. Its `userInformation` document embeds the set-valued
//! fields as JSON text, so decoding happens in two steps.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ProfileError;
use crate::session::SessionId;

/// Development goals assigned to a person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopmentGoals {
    /// Role the goals were assigned for
    #[serde(default, alias = "position")]
    pub role: String,

    /// Production items relevant for secondary-activity training
    #[serde(default)]
    pub items: Vec<String>,

    /// Content explicitly mandated for the person, in assignment order
    #[serde(default)]
    pub contents: Vec<String>,
}

/// Profile attributes resolved for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub role: String,
    pub workplace_groups: BTreeSet<String>,
    pub development_goals: BTreeSet<String>,
    pub goals_detail: DevelopmentGoals,
}

impl UserProfile {
    /// Decode the profile service's `userInformation` object.
    ///
    /// `workplaceGroups`, `developmentGoals` and `developmentGoalsObject` may be
    /// either JSON text or already-structured values.
    pub fn from_user_information(info: &serde_json::Value) -> Result<Self, ProfileError> {
        let role = info
            .get("employeeType")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProfileError::MissingField("employeeType".into()))?
            .to_string();

        let workplace_groups: BTreeSet<String> = embedded_field(info, "workplaceGroups")?;
        let development_goals: BTreeSet<String> = embedded_field(info, "developmentGoals")?;
        let mut goals_detail: DevelopmentGoals = embedded_field(info, "developmentGoalsObject")?;
        dedup_in_order(&mut goals_detail.items);
        dedup_in_order(&mut goals_detail.contents);

        Ok(Self {
            role,
            workplace_groups,
            development_goals,
            goals_detail,
        })
    }
}

fn embedded_field<T: DeserializeOwned>(
    info: &serde_json::Value,
    field: &str,
) -> Result<T, ProfileError> {
    let raw = info
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ProfileError::MissingField(field.to_string()))?;

    let malformed = |e: serde_json::Error| ProfileError::Malformed {
        field: field.to_string(),
        reason: e.to_string(),
    };

    match raw.as_str() {
        Some(text) => serde_json::from_str(text).map_err(malformed),
        None => serde_json::from_value(raw.clone()).map_err(malformed),
    }
}

fn dedup_in_order(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}

/// Resolves user identities to profile attributes.
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn fetch_profile(
        &self,
        session_id: &SessionId,
        user_id: &str,
        token: &str,
    ) -> std::result::Result<UserProfile, ProfileError>;
}
