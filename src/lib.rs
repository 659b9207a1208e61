// ============================================================================
// PAYROLL CONSOLE - Session, auth and settings CRUD core (Rust + WASM)
// ============================================================================
// Layers:
// - Models: wire types shared with the Django backend
// - State: Rc<RefCell> state with subscribers (SessionStore)
// - Services: HTTP only (auth gateway, resource client, route guard)
// - ViewModels: list state + optimistic mutations for the settings pages
// ============================================================================

pub mod app;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
pub mod viewmodels;

#[cfg(test)]
mod testing;

pub use app::ConsoleApp;
pub use config::{AppConfig, CONFIG};
pub use errors::{ApiError, SignUpError, TransportError};
pub use state::session_store::SessionStore;

// ============================================================================
// BROWSER ENTRY POINT
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use wasm_bindgen::prelude::*;

    use crate::app::ConsoleApp;
    use crate::config::CONFIG;
    use crate::models::{FederatedCallback, IdentityProvider};
    use crate::utils::browser;

    thread_local! {
        static APP: RefCell<Option<ConsoleApp>> = const { RefCell::new(None) };
    }

    fn app() -> Option<ConsoleApp> {
        APP.with(|cell| cell.borrow().clone())
    }

    #[wasm_bindgen(start)]
    pub fn start() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();

        let level = if CONFIG.is_logging_enabled() {
            log::Level::Info
        } else {
            log::Level::Warn
        };
        wasm_logger::init(wasm_logger::Config::new(level));
        log::info!("🚀 Payroll console starting ({})", CONFIG.environment);

        let app = ConsoleApp::for_browser(&CONFIG);
        APP.with(|cell| *cell.borrow_mut() = Some(app.clone()));

        let path = browser::current_path().unwrap_or_else(|| "/".to_string());
        if path == CONFIG.routes.federated_callback_path {
            let query = browser::current_query().unwrap_or_default();
            let callback = FederatedCallback::from_query(&query);
            wasm_bindgen_futures::spawn_local(async move {
                let target = match app.auth().complete_federated(&callback).await {
                    Ok(_) => CONFIG.routes.home_path.clone(),
                    Err(e) => {
                        log::error!("❌ Federated sign-in failed: {}", e);
                        CONFIG.routes.sign_in_path.clone()
                    }
                };
                browser::redirect(&target);
            });
            return Ok(());
        }

        let location = browser::current_location().unwrap_or(path);
        guard_navigation(&location);
        Ok(())
    }

    /// Runs the route guard; redirects and returns false when denied
    #[wasm_bindgen(js_name = guardNavigation)]
    pub fn guard_navigation(path: &str) -> bool {
        let Some(app) = app() else {
            log::error!("❌ Console not started");
            return false;
        };
        let navigation = app.guard().check(path);
        if let Some(target) = navigation.redirect_to() {
            browser::redirect(target);
        }
        navigation.is_allowed()
    }

    #[wasm_bindgen(js_name = signInWithGoogle)]
    pub fn sign_in_with_google() -> Result<(), JsValue> {
        let app = app().ok_or_else(|| JsValue::from_str("Console not started"))?;
        let redirect = app
            .auth()
            .begin_federated(IdentityProvider::Google)
            .map_err(|e| JsValue::from_str(&e.user_message()))?;
        browser::redirect(&redirect.url);
        Ok(())
    }

    #[wasm_bindgen(js_name = signOut)]
    pub fn sign_out() {
        let Some(app) = app() else {
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            app.auth().sign_out().await;
            browser::redirect(&CONFIG.routes.sign_in_path);
        });
    }
}
