// ============================================================================
// API CLIENT - Authenticated HTTP against the resource endpoints
// ============================================================================
// No business logic: attaches the bearer token, refreshes once on 401,
// maps status codes to ApiError and decodes JSON.
// ============================================================================

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::rc::Rc;

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::page::{ListEnvelope, Page};
use crate::services::auth_service::AuthService;
use crate::services::http::{decode_json, join_url, HttpRequest, HttpResponse, HttpTransport, Method};
use crate::state::session_store::SessionStore;
use crate::utils::constants::MAX_LIST_PAGES;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Rc<dyn HttpTransport>,
    session: SessionStore,
    auth: AuthService,
}

impl ApiClient {
    pub fn new(
        config: &AppConfig,
        transport: Rc<dyn HttpTransport>,
        session: SessionStore,
        auth: AuthService,
    ) -> Self {
        Self {
            base_url: config.api_base_url(),
            transport,
            session,
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Absolute links must stay under the base URL; the bearer token rides along
    fn is_api_link(&self, link: &str) -> bool {
        if !(link.starts_with("http://") || link.starts_with("https://")) {
            return true;
        }
        link == self.base_url || link.starts_with(&format!("{}/", self.base_url))
    }

    /// Typed request; an empty 2xx body decodes as JSON `null`
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let body = body
            .map(|value| serde_json::to_string(&value))
            .transpose()
            .map_err(|e| ApiError::ProtocolError(format!("Serialization error: {}", e)))?;
        let response = self.execute(method, path, body).await?;
        decode_body(&response)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(Method::Get, path, None).await?;
        decode_json(&response)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(Method::Post, path, Some(to_json(body)?)).await?;
        decode_json(&response)
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(Method::Put, path, Some(to_json(body)?)).await?;
        decode_json(&response)
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(Method::Patch, path, Some(to_json(body)?)).await?;
        decode_json(&response)
    }

    /// 200/202/204 all count as deleted; the body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::Delete, path, None).await?;
        Ok(())
    }

    /// One page of a list endpoint, bare array or DRF envelope
    pub async fn get_page<T: DeserializeOwned>(&self, path: &str) -> Result<Page<T>, ApiError> {
        let envelope: ListEnvelope<T> = self.get(path).await?;
        Ok(envelope.into_page())
    }

    /// Every item of a list endpoint, following `next` links
    pub async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let mut page = self.get_page::<T>(path).await?;
        let mut items = std::mem::take(&mut page.items);
        let mut pages = 1;

        while let Some(next) = page.next.take() {
            if pages >= MAX_LIST_PAGES {
                log::warn!("⚠️ Stopped following {} after {} pages", path, pages);
                break;
            }
            if !self.is_api_link(&next) {
                log::error!("❌ Pagination link for {} leaves the API: {}", path, next);
                return Err(ApiError::ProtocolError(format!(
                    "refusing to follow pagination link outside the API: {}",
                    next
                )));
            }
            page = self.get_page::<T>(&next).await?;
            items.append(&mut page.items);
            pages += 1;
        }

        Ok(items)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<HttpResponse, ApiError> {
        let url = join_url(&self.base_url, path);
        log::info!("🌐 {} {}", method, path);

        let token = self.session.access_token();
        let response = self.dispatch(method, &url, body.clone(), token.as_deref()).await?;
        if response.status != 401 {
            return check_status(response);
        }

        log::warn!("⚠️ {} {} returned 401, refreshing token", method, path);
        let refreshed = match self.auth.refresh_after_rejection(token.as_deref()).await {
            Ok(session) => session,
            Err(e) => {
                log::error!("❌ Token refresh failed ({}), clearing session", e);
                self.session.clear_session();
                return Err(ApiError::Unauthenticated);
            }
        };

        let replay = self
            .dispatch(method, &url, body, Some(&refreshed.access_token))
            .await?;
        if replay.status == 401 {
            log::error!("❌ {} {} still unauthorized after refresh", method, path);
            self.session.clear_session();
            return Err(ApiError::Unauthenticated);
        }
        check_status(replay)
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
        token: Option<&str>,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = HttpRequest::new(method, url);
        if let Some(token) = token {
            request = request.bearer(token);
        }
        if let Some(body) = body {
            request = request.raw_json(body);
        }

        let response = self.transport.send(request).await.map_err(|e| {
            log::error!("❌ {} {} failed: {}", method, url, e);
            ApiError::from(e)
        })?;
        log::debug!("{} {} -> HTTP {}", method, url, response.status);
        Ok(response)
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::ProtocolError(format!("Serialization error: {}", e)))
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response.status, &response.body))
    }
}

fn decode_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    if response.body.trim().is_empty() {
        return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
            ApiError::ProtocolError(format!("HTTP {} response had an empty body", response.status))
        });
    }
    decode_json(response)
}
