// ============================================================================
// AUTH SERVICE - Sign-in, sign-up, federated sign-in, refresh, sign-out
// ============================================================================
// The only writer of the SessionStore besides explicit sign-out. Every failure
// is returned as a typed error; nothing here retries.
// ============================================================================

use chrono::Utc;
use futures::lock::Mutex;
use std::rc::Rc;

use crate::config::{AppConfig, FederatedConfig};
use crate::errors::{error_message, ApiError, SignUpError};
use crate::models::auth::{
    expiry_from, Credential, FederatedCallback, FederatedExchangeRequest, FederatedRedirect,
    LoginResponse, NewAccount, RefreshRequest, RefreshResponse,
};
use crate::models::session::{IdentityProvider, Session};
use crate::services::http::{decode_json, join_url, HttpRequest, HttpResponse, HttpTransport, Method};
use crate::state::session_store::SessionStore;
use crate::utils::constants::{
    FEDERATED_EXCHANGE_PATH, LOGIN_PATH, LOGOUT_PATH, SIGNUP_PATH, STORAGE_KEY_FEDERATED_STATE,
    TOKEN_REFRESH_PATH,
};
use crate::utils::storage::KeyValueStore;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const FEDERATED_SCOPE: &str = "openid email profile";

#[derive(Clone)]
pub struct AuthService {
    base_url: String,
    transport: Rc<dyn HttpTransport>,
    session: SessionStore,
    storage: Rc<dyn KeyValueStore>,
    federated: Option<FederatedConfig>,
    default_ttl: chrono::Duration,
    server_side_logout: bool,
    // One refresh at a time; callers queued behind it reuse its result
    refresh_lock: Rc<Mutex<()>>,
}

impl AuthService {
    pub fn new(
        config: &AppConfig,
        transport: Rc<dyn HttpTransport>,
        session: SessionStore,
        storage: Rc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            base_url: config.api_base_url(),
            transport,
            session,
            storage,
            federated: config.federated.clone(),
            default_ttl: config.session_default_ttl(),
            server_side_logout: config.server_side_logout,
            refresh_lock: Rc::new(Mutex::new(())),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn federated_enabled(&self) -> bool {
        self.federated.is_some()
    }

    // ========================================================================
    // CREDENTIALS
    // ========================================================================

    pub async fn sign_in(&self, credential: &Credential) -> Result<Session, ApiError> {
        log::info!("🔐 Signing in {}", credential.email);

        let request = HttpRequest::new(Method::Post, join_url(&self.base_url, LOGIN_PATH))
            .json_body(credential)?;
        let response = self.transport.send(request).await.map_err(|e| {
            log::error!("❌ Sign-in request failed: {}", e);
            ApiError::from(e)
        })?;

        let session = self.session_from_login(&response, IdentityProvider::Credentials)?;
        log::info!("✅ Signed in as {}", session.display_name);
        Ok(session)
    }

    /// Registers the account, then signs in with the same credential
    pub async fn sign_up(&self, account: &NewAccount) -> Result<Session, SignUpError> {
        log::info!("📝 Registering {}", account.email);

        let request = HttpRequest::new(Method::Post, join_url(&self.base_url, SIGNUP_PATH))
            .json_body(account)
            .map_err(SignUpError::Registration)?;
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| SignUpError::Registration(e.into()))?;

        if !response.is_success() {
            let err = ApiError::from_response(response.status, &response.body);
            log::warn!("⚠️ Registration rejected: {}", err);
            return Err(SignUpError::Registration(err));
        }

        log::info!("✅ Account created for {}", account.email);
        self.sign_in(&account.credential())
            .await
            .map_err(SignUpError::SignInAfterRegistration)
    }

    // ========================================================================
    // FEDERATED (OAuth authorization code)
    // ========================================================================

    /// Builds the provider URL and remembers the state nonce for the callback
    pub fn begin_federated(&self, provider: IdentityProvider) -> Result<FederatedRedirect, ApiError> {
        let Some(federated) = self.federated.as_ref().filter(|_| provider == IdentityProvider::Google)
        else {
            return Err(ApiError::ServiceUnavailable(format!(
                "{} sign-in is not configured",
                provider.as_str()
            )));
        };

        let state = uuid::Uuid::new_v4().to_string();
        self.storage
            .set(STORAGE_KEY_FEDERATED_STATE, &state)
            .map_err(ApiError::ServiceUnavailable)?;

        let url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            federated.authorize_url,
            urlencoding::encode(&federated.client_id),
            urlencoding::encode(&federated.redirect_uri),
            urlencoding::encode(FEDERATED_SCOPE),
            urlencoding::encode(&state),
        );

        log::info!("🌐 Starting {} sign-in", provider.as_str());
        Ok(FederatedRedirect { url, state })
    }

    /// Exchanges the code the provider sent back for a session
    pub async fn complete_federated(&self, callback: &FederatedCallback) -> Result<Session, ApiError> {
        let expected_state = self.storage.get(STORAGE_KEY_FEDERATED_STATE);
        self.storage.remove(STORAGE_KEY_FEDERATED_STATE);

        if let Some(error) = &callback.error {
            log::warn!("⚠️ Provider returned an error: {}", error);
            return Err(ApiError::InvalidCredentials(format!(
                "Sign-in was cancelled or denied ({})",
                error
            )));
        }

        let state_matches = matches!(
            (&expected_state, &callback.state),
            (Some(expected), Some(received)) if expected == received
        );
        if !state_matches {
            log::warn!("⚠️ Federated callback state does not match, ignoring it");
            return Err(ApiError::InvalidCredentials(
                "Sign-in could not be verified. Please try again.".to_string(),
            ));
        }

        let Some(code) = callback.code.as_ref().filter(|c| !c.is_empty()) else {
            return Err(ApiError::InvalidCredentials(
                "The provider did not return an authorization code".to_string(),
            ));
        };
        let Some(federated) = &self.federated else {
            return Err(ApiError::ServiceUnavailable(
                "federated sign-in is not configured".to_string(),
            ));
        };

        let exchange = FederatedExchangeRequest {
            provider: IdentityProvider::Google,
            code: code.clone(),
            redirect_uri: federated.redirect_uri.clone(),
        };
        let request = HttpRequest::new(Method::Post, join_url(&self.base_url, FEDERATED_EXCHANGE_PATH))
            .json_body(&exchange)?;
        let response = self.transport.send(request).await.map_err(|e| {
            log::error!("❌ Federated code exchange failed: {}", e);
            ApiError::from(e)
        })?;

        let session = self.session_from_login(&response, IdentityProvider::Google)?;
        log::info!("✅ Signed in with Google as {}", session.display_name);
        Ok(session)
    }

    // ========================================================================
    // REFRESH / SIGN-OUT
    // ========================================================================

    /// Trades the refresh token for a new access token and stores it
    pub async fn refresh(&self) -> Result<Session, ApiError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh after `rejected_token` got a 401. Skipped when another caller
    /// already rotated the token while this one waited.
    pub async fn refresh_after_rejection(&self, rejected_token: Option<&str>) -> Result<Session, ApiError> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(current) = self.session.valid_session() {
            if rejected_token != Some(current.access_token.as_str()) {
                log::info!("🔄 Token already refreshed by a concurrent request");
                return Ok(current);
            }
        }
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Session, ApiError> {
        let Some(current) = self.session.get_session() else {
            return Err(ApiError::Unauthenticated);
        };
        let Some(refresh_token) = current.refresh_token.clone() else {
            log::warn!("⚠️ No refresh token held, cannot refresh");
            return Err(ApiError::Unauthenticated);
        };

        log::info!("🔄 Refreshing access token");
        let request = HttpRequest::new(Method::Post, join_url(&self.base_url, TOKEN_REFRESH_PATH))
            .json_body(&RefreshRequest { refresh: refresh_token })?;
        let response = self.transport.send(request).await.map_err(|e| {
            log::error!("❌ Token refresh request failed: {}", e);
            ApiError::from(e)
        })?;

        match response.status {
            200..=299 => {
                let refreshed: RefreshResponse = decode_json(&response)?;
                if refreshed.access.trim().is_empty() {
                    return Err(ApiError::ProtocolError(
                        "refresh response carried an empty access token".to_string(),
                    ));
                }
                let now = Utc::now();
                let session = current.refreshed(
                    refreshed.access,
                    refreshed.refresh,
                    expiry_from(refreshed.expires_in, self.default_ttl, now),
                );
                self.session.set_session(session.clone());
                log::info!("✅ Access token refreshed");
                Ok(session)
            }
            500..=599 => Err(ApiError::ServiceUnavailable(format!(
                "token refresh returned HTTP {}",
                response.status
            ))),
            status => {
                log::warn!("⚠️ Refresh token rejected (HTTP {})", status);
                Err(ApiError::Unauthenticated)
            }
        }
    }

    /// Clears the local session first; the server-side logout is best effort
    pub async fn sign_out(&self) {
        let previous = self.session.get_session();
        self.session.clear_session();
        self.storage.remove(STORAGE_KEY_FEDERATED_STATE);

        let Some(previous) = previous else {
            return;
        };
        log::info!("👋 Signed out {}", previous.email);

        if !self.server_side_logout {
            return;
        }

        let body = serde_json::json!({ "refresh": previous.refresh_token });
        let request = match HttpRequest::new(Method::Post, join_url(&self.base_url, LOGOUT_PATH))
            .bearer(&previous.access_token)
            .json_body(&body)
        {
            Ok(request) => request,
            Err(e) => {
                log::warn!("⚠️ Could not build logout request: {}", e);
                return;
            }
        };

        match self.transport.send(request).await {
            Ok(response) if response.is_success() => {
                log::info!("✅ Server session discarded");
            }
            Ok(response) => {
                log::warn!("⚠️ Server logout returned HTTP {}", response.status);
            }
            Err(e) => {
                log::warn!("⚠️ Server logout failed: {}", e);
            }
        }
    }

    // Shared by credential and federated sign-in
    fn session_from_login(
        &self,
        response: &HttpResponse,
        provider: IdentityProvider,
    ) -> Result<Session, ApiError> {
        match response.status {
            200..=299 => {
                let login: LoginResponse = decode_json(response)?;
                let session = login.into_session(provider, self.default_ttl, Utc::now())?;
                self.session.set_session(session.clone());
                Ok(session)
            }
            400..=499 => {
                let message = error_message(&response.body)
                    .unwrap_or_else(|| INVALID_CREDENTIALS.to_string());
                log::warn!("⚠️ Sign-in rejected (HTTP {})", response.status);
                Err(ApiError::InvalidCredentials(message))
            }
            500..=599 => Err(ApiError::ServiceUnavailable(format!(
                "identity service returned HTTP {}",
                response.status
            ))),
            status => Err(ApiError::ProtocolError(format!(
                "unexpected HTTP status {} from identity service",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::testing::{Harness, LOGIN_BODY, TEST_BASE_URL};
    use futures::executor::block_on;
    use std::time::Duration;

    #[test]
    fn sign_in_populates_the_session() {
        let h = Harness::new();
        h.transport.push(200, LOGIN_BODY);

        let session = block_on(h.auth.sign_in(&Credential::new("hr@example.com", "pw"))).unwrap();

        assert_eq!(session.subject_id, "7");
        assert_eq!(h.session.get_session(), Some(session));
        let request = &h.transport.requests()[0];
        assert_eq!(request.url, format!("{}/login/", TEST_BASE_URL));
        assert_eq!(request.method, Method::Post);
        assert!(request.body.as_deref().unwrap().contains("\"email\":\"hr@example.com\""));
    }

    #[test]
    fn rejected_sign_in_leaves_store_empty() {
        let h = Harness::new();
        h.transport.push(400, r#"{"error": "Invalid credentials"}"#);

        let err = block_on(h.auth.sign_in(&Credential::new("hr@example.com", "nope"))).unwrap_err();

        assert_eq!(err, ApiError::InvalidCredentials("Invalid credentials".to_string()));
        assert_eq!(h.session.get_session(), None);
    }

    #[test]
    fn sign_in_without_message_uses_generic_text() {
        let h = Harness::new();
        h.transport.push(401, "");
        let err = block_on(h.auth.sign_in(&Credential::new("a@b.c", "x"))).unwrap_err();
        assert_eq!(err, ApiError::InvalidCredentials(INVALID_CREDENTIALS.to_string()));
    }

    #[test]
    fn server_and_network_failures_are_service_unavailable() {
        let h = Harness::new();
        h.transport.push(502, "<html>Bad Gateway</html>");
        h.transport.push_error(TransportError::Timeout(Duration::from_secs(20)));

        let credential = Credential::new("hr@example.com", "pw");
        assert!(matches!(
            block_on(h.auth.sign_in(&credential)),
            Err(ApiError::ServiceUnavailable(_))
        ));
        assert!(matches!(
            block_on(h.auth.sign_in(&credential)),
            Err(ApiError::ServiceUnavailable(_))
        ));
        assert!(h.session.get_session().is_none());
    }

    #[test]
    fn malformed_login_body_is_protocol_error() {
        let h = Harness::new();
        h.transport.push(200, r#"{"token": "abc"}"#);
        let err = block_on(h.auth.sign_in(&Credential::new("a@b.c", "x"))).unwrap_err();
        assert!(matches!(err, ApiError::ProtocolError(_)));
        assert!(h.session.get_session().is_none());
    }

    #[test]
    fn sign_up_chains_into_sign_in() {
        let h = Harness::new();
        h.transport.push(201, r#"{"message": "User created"}"#);
        h.transport.push(200, LOGIN_BODY);

        let account = NewAccount::new("hr", "hr@example.com", "pw");
        let session = block_on(h.auth.sign_up(&account)).unwrap();

        assert_eq!(session.email, "hr@example.com");
        let urls: Vec<String> = h.transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![format!("{}/signup/", TEST_BASE_URL), format!("{}/login/", TEST_BASE_URL)]
        );
    }

    #[test]
    fn sign_up_names_the_failed_step() {
        let h = Harness::new();
        h.transport.push(400, r#"{"error": "Email already registered"}"#);
        let account = NewAccount::new("hr", "hr@example.com", "pw");
        let err = block_on(h.auth.sign_up(&account)).unwrap_err();
        assert!(matches!(err, SignUpError::Registration(ApiError::ValidationError { .. })));
        assert_eq!(h.transport.request_count(), 1);

        let h = Harness::new();
        h.transport.push(201, "{}");
        h.transport.push(400, r#"{"error": "Invalid credentials"}"#);
        let err = block_on(h.auth.sign_up(&account)).unwrap_err();
        assert!(matches!(
            err,
            SignUpError::SignInAfterRegistration(ApiError::InvalidCredentials(_))
        ));
        assert!(h.session.get_session().is_none());
    }

    #[test]
    fn refresh_rotates_the_access_token() {
        let h = Harness::signed_in();
        h.transport.push(200, r#"{"access": "fresh-token"}"#);

        let session = block_on(h.auth.refresh()).unwrap();

        assert_eq!(session.access_token, "fresh-token");
        assert_eq!(session.refresh_token.as_deref(), Some("refresh-token"));
        assert_eq!(h.session.access_token().as_deref(), Some("fresh-token"));
        let body = h.transport.requests()[0].body.clone().unwrap();
        assert_eq!(body, r#"{"refresh":"refresh-token"}"#);
    }

    #[test]
    fn refresh_without_session_is_unauthenticated() {
        let h = Harness::new();
        assert_eq!(block_on(h.auth.refresh()), Err(ApiError::Unauthenticated));
        assert_eq!(h.transport.request_count(), 0);
    }

    #[test]
    fn rejected_refresh_is_unauthenticated() {
        let h = Harness::signed_in();
        h.transport.push(401, r#"{"detail": "Token is invalid or expired"}"#);
        assert_eq!(block_on(h.auth.refresh()), Err(ApiError::Unauthenticated));
    }

    #[test]
    fn refresh_after_rejection_reuses_a_newer_token() {
        let h = Harness::signed_in();
        let session = block_on(h.auth.refresh_after_rejection(Some("stale-token"))).unwrap();
        assert_eq!(session.access_token, "access-token");
        assert_eq!(h.transport.request_count(), 0);
    }

    #[test]
    fn federated_round_trip() {
        let h = Harness::new();
        let redirect = h.auth.begin_federated(IdentityProvider::Google).unwrap();
        assert!(redirect.url.starts_with("https://accounts.example.com/o/oauth2/auth?client_id=client-123"));
        assert!(redirect.url.contains("response_type=code"));
        assert!(redirect.url.contains(&format!("state={}", redirect.state)));
        assert!(redirect
            .url
            .contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));

        h.transport.push(200, LOGIN_BODY);
        let callback = FederatedCallback {
            code: Some("auth-code".to_string()),
            state: Some(redirect.state.clone()),
            error: None,
        };
        let session = block_on(h.auth.complete_federated(&callback)).unwrap();

        assert_eq!(session.provider, IdentityProvider::Google);
        assert!(h.storage.get(STORAGE_KEY_FEDERATED_STATE).is_none());
        let body = h.transport.requests()[0].body.clone().unwrap();
        assert!(body.contains("\"provider\":\"google\""));
        assert!(body.contains("\"code\":\"auth-code\""));
    }

    #[test]
    fn federated_callback_with_wrong_state_is_rejected() {
        let h = Harness::new();
        h.auth.begin_federated(IdentityProvider::Google).unwrap();

        let callback = FederatedCallback {
            code: Some("auth-code".to_string()),
            state: Some("forged".to_string()),
            error: None,
        };
        let err = block_on(h.auth.complete_federated(&callback)).unwrap_err();

        assert!(matches!(err, ApiError::InvalidCredentials(_)));
        assert_eq!(h.transport.request_count(), 0);
        assert!(h.session.get_session().is_none());
    }

    #[test]
    fn federated_provider_error_produces_no_session() {
        let h = Harness::new();
        let redirect = h.auth.begin_federated(IdentityProvider::Google).unwrap();
        let callback = FederatedCallback {
            code: None,
            state: Some(redirect.state),
            error: Some("access_denied".to_string()),
        };
        assert!(matches!(
            block_on(h.auth.complete_federated(&callback)),
            Err(ApiError::InvalidCredentials(_))
        ));
        assert!(h.session.get_session().is_none());
    }

    #[test]
    fn credentials_provider_cannot_start_a_redirect() {
        let h = Harness::new();
        assert!(matches!(
            h.auth.begin_federated(IdentityProvider::Credentials),
            Err(ApiError::ServiceUnavailable(_))
        ));
    }

    #[test]
    fn sign_out_clears_locally_even_if_server_fails() {
        let h = Harness::signed_in();
        h.transport.push(500, "");

        block_on(h.auth.sign_out());

        assert!(h.session.get_session().is_none());
        let request = &h.transport.requests()[0];
        assert_eq!(request.url, format!("{}/logout/", TEST_BASE_URL));
        assert_eq!(request.header("Authorization"), Some("Bearer access-token"));
    }

    #[test]
    fn sign_out_without_session_makes_no_call() {
        let h = Harness::new();
        block_on(h.auth.sign_out());
        assert_eq!(h.transport.request_count(), 0);
    }
}
