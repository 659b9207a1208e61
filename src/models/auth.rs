use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ApiError;
use crate::models::entity::deserialize_id;
use crate::models::session::{IdentityProvider, Session};

/// Email + password sign-in. Lives only for the duration of the request.
#[derive(Clone, PartialEq, Serialize)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl Credential {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up payload for `/signup/`
#[derive(Clone, PartialEq, Serialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewAccount {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into().trim().to_string(),
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    /// The credential used for the automatic sign-in after registration
    pub fn credential(&self) -> Credential {
        Credential {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct LoginUser {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl LoginUser {
    pub fn display_name(&self) -> String {
        [self.name.as_deref(), self.username.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .unwrap_or(self.email.as_str())
            .to_string()
    }
}

/// Successful answer of `/login/` and `/auth/federated/`
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: LoginUser,
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl LoginResponse {
    pub fn into_session(
        self,
        provider: IdentityProvider,
        default_ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Session, ApiError> {
        if self.access.trim().is_empty() {
            return Err(ApiError::ProtocolError(
                "login response carried an empty access token".to_string(),
            ));
        }

        let display_name = self.user.display_name();
        Ok(Session {
            subject_id: self.user.id,
            display_name,
            email: self.user.email,
            access_token: self.access,
            refresh_token: self.refresh,
            expires_at: expiry_from(self.expires_in, default_ttl, now),
            provider,
        })
    }
}

#[derive(Clone, PartialEq, Serialize, Debug)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Clone, PartialEq, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Body of the code exchange after the provider redirects back
#[derive(Clone, PartialEq, Serialize, Debug)]
pub struct FederatedExchangeRequest {
    pub provider: IdentityProvider,
    pub code: String,
    pub redirect_uri: String,
}

/// Where to send the browser to start a federated sign-in
#[derive(Clone, PartialEq, Debug)]
pub struct FederatedRedirect {
    pub url: String,
    pub state: String,
}

/// Query parameters the provider appends to the callback URL
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FederatedCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl FederatedCallback {
    /// Parses `code=..&state=..` (a leading `?` is accepted)
    pub fn from_query(query: &str) -> Self {
        let mut callback = Self::default();
        for pair in query.trim_start_matches('?').split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            match key {
                "code" => callback.code = Some(value),
                "state" => callback.state = Some(value),
                "error" => callback.error = Some(value),
                _ => {}
            }
        }
        callback
    }
}

pub(crate) fn expiry_from(
    expires_in: Option<i64>,
    default_ttl: Duration,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match expires_in {
        Some(seconds) if seconds > 0 => now + Duration::seconds(seconds),
        _ => now + default_ttl,
    }
}
