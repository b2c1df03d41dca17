//! Trigger surface: the events that start or steer a pipeline run.

use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Which activity the session owner is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Activity {
    /// Actively operating equipment
    #[default]
    Main,
    /// Idle or training time
    Side,
}

impl Activity {
    /// Anything other than `"side"` counts as main activity.
    pub fn parse(value: &str) -> Self {
        if value == "side" {
            Activity::Side
        } else {
            Activity::Main
        }
    }

    pub fn is_secondary(self) -> bool {
        self == Activity::Side
    }
}

impl From<String> for Activity {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Activity> for String {
    fn from(value: Activity) -> Self {
        match value {
            Activity::Main => "main".into(),
            Activity::Side => "side".into(),
        }
    }
}

/// An inbound trigger, as delivered by the bus bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Start a learning session
    SessionStart { sid: String, token: String },

    /// A user came online in a session
    UserOnline {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "userId")]
        user_id: String,
    },

    /// The session owner switched between main and side activity
    ActivitySwitch {
        #[serde(rename = "sessionId")]
        session_id: String,
        activity: Activity,
    },

    /// Push the configured featured item to every known session
    PushFeatured,
}

impl Trigger {
    /// The session a trigger addresses, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Trigger::SessionStart { sid, .. } => Some(SessionId(sid.clone())),
            Trigger::UserOnline { session_id, .. } | Trigger::ActivitySwitch { session_id, .. } => {
                Some(SessionId(session_id.clone()))
            }
            Trigger::PushFeatured => None,
        }
    }
}
