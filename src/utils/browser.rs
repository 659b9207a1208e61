// ============================================================================
// BROWSER - window.location helpers (wasm only)
// ============================================================================

/// Current path plus query string, e.g. `/settings/departments?page=2`
pub fn current_location() -> Option<String> {
    let location = web_sys::window()?.location();
    let path = location.pathname().ok()?;
    let search = location.search().unwrap_or_default();
    Some(format!("{}{}", path, search))
}

pub fn current_path() -> Option<String> {
    web_sys::window()?.location().pathname().ok()
}

pub fn current_query() -> Option<String> {
    web_sys::window()?.location().search().ok()
}

pub fn redirect(url: &str) {
    let Some(window) = web_sys::window() else {
        log::error!("❌ No window available to redirect to {}", url);
        return;
    };
    log::info!("➡️ Redirecting to {}", url);
    if let Err(e) = window.location().set_href(url) {
        log::error!("❌ Redirect to {} failed: {:?}", url, e);
    }
}
