use serde::{Deserialize, Serialize};

/// Role a session acts under; gates which entry points a shell offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    Patient,
    Organization,
    Admin,
}

/// Session state the hosting shell passes into controllers explicitly, so
/// tests can supply a fake session without touching process-wide state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub username: Option<String>,
    pub role: Option<SessionRole>,
    pub remembered_identifier: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(username: impl Into<String>, role: SessionRole) -> Self {
        Self {
            username: Some(username.into()),
            role: Some(role),
            remembered_identifier: None,
        }
    }
}
