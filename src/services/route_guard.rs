// ============================================================================
// ROUTE GUARD - Decides whether a navigation may proceed
// ============================================================================
// Evaluated on every navigation, never cached. Reads the SessionStore only.
// ============================================================================

use chrono::{DateTime, Utc};

use crate::config::RouteConfig;
use crate::state::session_store::SessionStore;
use crate::utils::constants::CALLBACK_PARAM;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Unchecked,
    Checking,
    Allowed,
    Denied { redirect_to: String },
}

/// One navigation attempt and where the guard left it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    path: String,
    state: GuardState,
}

impl Navigation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: GuardState::Unchecked,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn is_allowed(&self) -> bool {
        self.state == GuardState::Allowed
    }

    pub fn redirect_to(&self) -> Option<&str> {
        match &self.state {
            GuardState::Denied { redirect_to } => Some(redirect_to),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    session: SessionStore,
    routes: RouteConfig,
}

impl RouteGuard {
    pub fn new(session: SessionStore, routes: &RouteConfig) -> Self {
        Self {
            session,
            routes: routes.clone(),
        }
    }

    pub fn routes(&self) -> &RouteConfig {
        &self.routes
    }

    pub fn check(&self, path: &str) -> Navigation {
        self.check_at(path, Utc::now())
    }

    pub fn check_at(&self, path: &str, now: DateTime<Utc>) -> Navigation {
        let mut navigation = Navigation::new(path);
        navigation.state = GuardState::Checking;

        let has_valid_session = self
            .session
            .get_session()
            .is_some_and(|session| !session.is_expired_at(now));

        navigation.state = if self.is_public(path) {
            if has_valid_session && self.is_auth_page(path) {
                GuardState::Denied {
                    redirect_to: self.routes.home_path.clone(),
                }
            } else {
                GuardState::Allowed
            }
        } else if has_valid_session {
            GuardState::Allowed
        } else {
            log::info!("🔒 {} requires a session, redirecting to sign-in", strip_query(path));
            GuardState::Denied {
                redirect_to: self.sign_in_location(path),
            }
        };

        navigation
    }

    /// Sign-in URL carrying `path` for the post-login redirect
    pub fn sign_in_location(&self, path: &str) -> String {
        format!(
            "{}?{}={}",
            self.routes.sign_in_path,
            CALLBACK_PARAM,
            urlencoding::encode(path)
        )
    }

    /// Where to go after sign-in. Only local absolute, non-public paths are honoured.
    pub fn post_login_redirect(&self, callback: Option<&str>) -> String {
        match callback.map(str::trim) {
            Some(path) if is_local_path(path) && !self.is_public(path) => path.to_string(),
            _ => self.routes.home_path.clone(),
        }
    }

    /// Reads `callbackUrl` out of a sign-in page query string
    pub fn callback_from_query(query: &str) -> Option<String> {
        query
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == CALLBACK_PARAM)
            .and_then(|(_, value)| urlencoding::decode(value).ok())
            .map(|value| value.into_owned())
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize(path);
        self.routes
            .public_paths()
            .iter()
            .any(|public| normalize(public) == path)
    }

    fn is_auth_page(&self, path: &str) -> bool {
        let path = normalize(path);
        path == normalize(&self.routes.sign_in_path) || path == normalize(&self.routes.sign_up_path)
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn normalize(path: &str) -> &str {
    let path = strip_query(path);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_fixture;
    use crate::utils::storage::MemoryStorage;
    use chrono::Duration;
    use std::rc::Rc;

    fn guard() -> (RouteGuard, SessionStore) {
        let session = SessionStore::new(Rc::new(MemoryStorage::new()));
        (RouteGuard::new(session.clone(), &RouteConfig::default()), session)
    }

    #[test]
    fn new_navigation_is_unchecked() {
        let navigation = Navigation::new("/dashboard");
        assert_eq!(navigation.state(), &GuardState::Unchecked);
        assert_eq!(navigation.redirect_to(), None);
    }

    #[test]
    fn missing_session_redirects_with_callback() {
        let (guard, _) = guard();
        let navigation = guard.check("/settings/departments?tab=all");

        assert!(!navigation.is_allowed());
        assert_eq!(
            navigation.redirect_to(),
            Some("/login?callbackUrl=%2Fsettings%2Fdepartments%3Ftab%3Dall")
        );
    }

    #[test]
    fn valid_session_is_allowed() {
        let (guard, session) = guard();
        session.set_session(session_fixture(3600));
        assert!(guard.check("/settings/departments").is_allowed());
    }

    #[test]
    fn expired_session_is_denied() {
        let (guard, session) = guard();
        let fixture = session_fixture(3600);
        let expiry = fixture.expires_at;
        session.set_session(fixture);

        assert!(guard.check_at("/employees", expiry - Duration::seconds(1)).is_allowed());
        assert!(!guard.check_at("/employees", expiry).is_allowed());
        // The guard reads, it never clears
        assert!(session.get_session().is_some());
    }

    #[test]
    fn re_evaluated_on_every_navigation() {
        let (guard, session) = guard();
        session.set_session(session_fixture(3600));
        assert!(guard.check("/dashboard").is_allowed());

        session.clear_session();
        assert!(!guard.check("/dashboard").is_allowed());
    }

    #[test]
    fn public_paths_pass_without_session() {
        let (guard, _) = guard();
        assert!(guard.check("/login").is_allowed());
        assert!(guard.check("/signup/").is_allowed());
        assert!(guard.check("/auth/callback?code=x&state=y").is_allowed());
        assert!(!guard.check("/login-history").is_allowed());
    }

    #[test]
    fn signed_in_user_is_sent_home_from_auth_pages() {
        let (guard, session) = guard();
        session.set_session(session_fixture(3600));

        assert_eq!(guard.check("/login").redirect_to(), Some("/dashboard"));
        assert_eq!(guard.check("/signup").redirect_to(), Some("/dashboard"));
        assert!(guard.check("/auth/callback").is_allowed());
    }

    #[test]
    fn post_login_redirect_is_sanitised() {
        let (guard, _) = guard();
        assert_eq!(guard.post_login_redirect(Some("/settings/locations")), "/settings/locations");
        assert_eq!(guard.post_login_redirect(None), "/dashboard");
        assert_eq!(guard.post_login_redirect(Some("https://evil.example")), "/dashboard");
        assert_eq!(guard.post_login_redirect(Some("//evil.example")), "/dashboard");
        assert_eq!(guard.post_login_redirect(Some("/login")), "/dashboard");
    }

    #[test]
    fn callback_round_trips_through_the_sign_in_url() {
        let (guard, _) = guard();
        let location = guard.sign_in_location("/settings/departments?tab=all");
        let query = location.split_once('?').map(|(_, q)| q).unwrap();

        let callback = RouteGuard::callback_from_query(query);
        assert_eq!(callback.as_deref(), Some("/settings/departments?tab=all"));
        assert_eq!(guard.post_login_redirect(callback.as_deref()), "/settings/departments?tab=all");
    }
}
