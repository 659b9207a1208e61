use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Bounds for the per-request timeout, in seconds
pub const MIN_REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    pub environment: String,
    pub enable_logging: bool,
    pub request_timeout_seconds: u64,
    pub session_default_ttl_seconds: i64,
    pub server_side_logout: bool,
    pub routes: RouteConfig,
    pub federated: Option<FederatedConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            environment: "development".to_string(),
            enable_logging: true,
            request_timeout_seconds: 20,
            session_default_ttl_seconds: 3600,
            server_side_logout: true,
            routes: RouteConfig::default(),
            federated: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub sign_in_path: String,
    pub sign_up_path: String,
    pub home_path: String,
    pub federated_callback_path: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/login".to_string(),
            sign_up_path: "/signup".to_string(),
            home_path: "/dashboard".to_string(),
            federated_callback_path: "/auth/callback".to_string(),
        }
    }
}

impl RouteConfig {
    /// Paths reachable without a session
    pub fn public_paths(&self) -> Vec<String> {
        vec![
            self.sign_in_path.clone(),
            self.sign_up_path.clone(),
            self.federated_callback_path.clone(),
        ]
    }
}

/// Google OAuth client settings. Absent when no client id was configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub redirect_uri: String,
}

impl AppConfig {
    /// Loads the configuration from compile-time environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let route_defaults = RouteConfig::default();

        let federated = option_env!("GOOGLE_CLIENT_ID")
            .filter(|id| !id.trim().is_empty())
            .map(|client_id| FederatedConfig {
                client_id: client_id.to_string(),
                authorize_url: option_env!("GOOGLE_AUTHORIZE_URL")
                    .unwrap_or(DEFAULT_GOOGLE_AUTHORIZE_URL).to_string(),
                redirect_uri: option_env!("FEDERATED_REDIRECT_URI")
                    .unwrap_or("http://localhost:3000/auth/callback").to_string(),
            });

        Self {
            api_base_url: option_env!("API_BASE_URL")
                .unwrap_or(DEFAULT_API_BASE_URL).to_string(),
            environment: option_env!("ENVIRONMENT")
                .unwrap_or("development").to_string(),
            enable_logging: option_env!("ENABLE_LOGGING")
                .unwrap_or("true").parse().unwrap_or(defaults.enable_logging),
            request_timeout_seconds: option_env!("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or("20").parse().unwrap_or(defaults.request_timeout_seconds),
            session_default_ttl_seconds: option_env!("SESSION_DEFAULT_TTL_SECONDS")
                .unwrap_or("3600").parse().unwrap_or(defaults.session_default_ttl_seconds),
            server_side_logout: option_env!("SERVER_SIDE_LOGOUT")
                .unwrap_or("true").parse().unwrap_or(defaults.server_side_logout),
            routes: RouteConfig {
                sign_in_path: option_env!("SIGN_IN_PATH")
                    .map(str::to_string).unwrap_or(route_defaults.sign_in_path),
                sign_up_path: option_env!("SIGN_UP_PATH")
                    .map(str::to_string).unwrap_or(route_defaults.sign_up_path),
                home_path: option_env!("HOME_PATH")
                    .map(str::to_string).unwrap_or(route_defaults.home_path),
                federated_callback_path: option_env!("FEDERATED_CALLBACK_PATH")
                    .map(str::to_string).unwrap_or(route_defaults.federated_callback_path),
            },
            federated,
        }
    }

    /// API base URL without trailing slashes
    pub fn api_base_url(&self) -> String {
        self.api_base_url.trim_end_matches('/').to_string()
    }

    /// Per-request timeout, clamped to 10..=30 seconds
    pub fn request_timeout(&self) -> Duration {
        let seconds = self
            .request_timeout_seconds
            .clamp(MIN_REQUEST_TIMEOUT_SECONDS, MAX_REQUEST_TIMEOUT_SECONDS);
        Duration::from_secs(seconds)
    }

    /// Lifetime given to sessions whose login response carries no expiry
    pub fn session_default_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_default_ttl_seconds.max(60))
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.enable_logging
    }
}

lazy_static::lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slashes() {
        let config = AppConfig {
            api_base_url: "http://127.0.0.1:8000/api//".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.api_base_url(), "http://127.0.0.1:8000/api");
    }

    #[test]
    fn request_timeout_is_clamped() {
        let mut config = AppConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(20));

        config.request_timeout_seconds = 2;
        assert_eq!(config.request_timeout(), Duration::from_secs(10));

        config.request_timeout_seconds = 600;
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn public_paths_include_sign_in_and_callback() {
        let routes = RouteConfig::default();
        let public = routes.public_paths();
        assert!(public.contains(&"/login".to_string()));
        assert!(public.contains(&"/signup".to_string()));
        assert!(public.contains(&"/auth/callback".to_string()));
        assert!(!public.contains(&"/dashboard".to_string()));
    }
}
