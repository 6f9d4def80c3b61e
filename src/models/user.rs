//! Identity supplied by the auth provider.

use serde::{Deserialize, Serialize};

/// Authenticated user as reported by the auth provider. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    /// Free-form metadata stored at sign-up (the display name lives here)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// Display name recorded at sign-up, if any.
    pub fn name(&self) -> Option<&str> {
        self.user_metadata.get("name").and_then(|v| v.as_str())
    }
}

/// Session issued by a successful password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub expires_in: Option<u64>,

    pub user: User,
}
