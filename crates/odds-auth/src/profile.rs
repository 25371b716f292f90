use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Bearer ID token minted by the identity provider for the admin surface.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id_token: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Unix seconds. `None` means the token carries no known expiry.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Credential {
    pub fn new(id_token: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
            email: None,
            expires_at: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now().timestamp())
    }

    /// A token that can be put in an `Authorization` header.
    pub fn is_usable(&self) -> bool {
        !self.id_token.trim().is_empty() && !self.is_expired()
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    pub active_profile: Option<String>,
    pub credentials: HashMap<String, Credential>,
}
