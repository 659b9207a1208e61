// ============================================================================
// HTTP - Transport seam between the services and the network
// ============================================================================
// Services build an `HttpRequest` and hand it to an `HttpTransport`. In the
// browser that is `GlooTransport`; tests script replies with a mock.
// ============================================================================

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

use crate::errors::{ApiError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    pub fn json_body<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, ApiError> {
        let json = serde_json::to_string(body)
            .map_err(|e| ApiError::ProtocolError(format!("Serialization error: {}", e)))?;
        Ok(self.raw_json(json))
    }

    /// Body that is already serialized JSON
    pub fn raw_json(mut self, json: String) -> Self {
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        self.body = Some(json);
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.headers.retain(|(name, _)| !name.eq_ignore_ascii_case("Authorization"));
        self.headers
            .push(("Authorization".to_string(), format!("Bearer {}", token)));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait(?Send)]
pub trait HttpTransport {
    /// Performs one exchange. Any status code is `Ok`; only failures below HTTP are `Err`.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `base` + `path`, unless `path` is already an absolute URL (DRF `next` links)
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Decodes a 2xx body; empty or malformed bodies are protocol errors
pub fn decode_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    if response.body.trim().is_empty() {
        return Err(ApiError::ProtocolError(format!(
            "HTTP {} response had an empty body",
            response.status
        )));
    }
    serde_json::from_str(&response.body)
        .map_err(|e| ApiError::ProtocolError(format!("Parse error: {}", e)))
}

/// A body that could not be read is a network failure, not an empty body
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) fn read_body<E: fmt::Display>(text: Result<String, E>) -> Result<String, TransportError> {
    text.map_err(|e| TransportError::Network(format!("Body read error: {}", e)))
}

// ============================================================================
// GLOO TRANSPORT (browser fetch)
// ============================================================================

#[cfg(target_arch = "wasm32")]
pub use gloo::GlooTransport;

#[cfg(target_arch = "wasm32")]
mod gloo {
    use super::*;
    use futures::future::{select, Either};
    use gloo_net::http::Request;
    use gloo_timers::future::TimeoutFuture;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub struct GlooTransport {
        timeout: Duration,
    }

    impl GlooTransport {
        pub fn new(timeout: Duration) -> Self {
            Self { timeout }
        }

        async fn dispatch(request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut builder = match request.method {
                Method::Get => Request::get(&request.url),
                Method::Post => Request::post(&request.url),
                Method::Put => Request::put(&request.url),
                Method::Patch => Request::patch(&request.url),
                Method::Delete => Request::delete(&request.url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let prepared = match request.body {
                Some(body) => builder.body(body),
                None => builder.build(),
            }
            .map_err(|e| TransportError::Network(format!("Request build error: {}", e)))?;

            let response = prepared
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            let status = response.status();
            let body = read_body(response.text().await)?;
            Ok(HttpResponse { status, body })
        }
    }

    #[async_trait(?Send)]
    impl HttpTransport for GlooTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let millis = u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX);
            let exchange = Box::pin(Self::dispatch(request));
            let deadline = Box::pin(TimeoutFuture::new(millis));

            match select(exchange, deadline).await {
                Either::Left((result, _)) => result,
                Either::Right(((), _)) => Err(TransportError::Timeout(self.timeout)),
            }
        }
    }
}
