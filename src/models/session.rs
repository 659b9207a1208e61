// ============================================================================
// SESSION - Authenticated identity held by the SessionStore
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who issued the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProvider {
    #[default]
    Credentials,
    Google,
}

impl IdentityProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityProvider::Credentials => "credentials",
            IdentityProvider::Google => "google",
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub subject_id: String,
    pub display_name: String,
    pub email: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub provider: IdentityProvider,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Same identity with a rotated access token
    pub fn refreshed(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at,
            ..self.clone()
        }
    }
}

// Tokens never reach the logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("subject_id", &self.subject_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("provider", &self.provider)
            .finish()
    }
}
