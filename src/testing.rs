// ============================================================================
// TESTING - Scripted transport and fixtures shared by the unit tests
// ============================================================================

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::channel::oneshot;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::{AppConfig, FederatedConfig};
use crate::errors::TransportError;
use crate::models::session::{IdentityProvider, Session};
use crate::services::api_client::ApiClient;
use crate::services::auth_service::AuthService;
use crate::services::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::state::session_store::SessionStore;
use crate::utils::storage::MemoryStorage;

pub const TEST_BASE_URL: &str = "http://api.test/api";

type Outcome = Result<HttpResponse, TransportError>;

enum Reply {
    Ready(Outcome),
    Deferred(oneshot::Receiver<Outcome>),
}

/// Answers requests in FIFO order from a script and records every request
#[derive(Default)]
pub struct MockTransport {
    replies: RefCell<VecDeque<Reply>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn push(&self, status: u16, body: &str) {
        self.replies.borrow_mut().push_back(Reply::Ready(Ok(HttpResponse {
            status,
            body: body.to_string(),
        })));
    }

    pub fn push_error(&self, error: TransportError) {
        self.replies.borrow_mut().push_back(Reply::Ready(Err(error)));
    }

    /// Queues a reply that stays pending until the returned sender fires
    pub fn defer(&self) -> oneshot::Sender<Outcome> {
        let (sender, receiver) = oneshot::channel();
        self.replies.borrow_mut().push_back(Reply::Deferred(receiver));
        sender
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

#[async_trait(?Send)]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        let reply = self.replies.borrow_mut().pop_front();
        match reply {
            Some(Reply::Ready(outcome)) => outcome,
            Some(Reply::Deferred(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("reply dropped".to_string()))),
            None => Err(TransportError::Network(format!(
                "no scripted reply for {} {}",
                request.method, request.url
            ))),
        }
    }
}

pub fn reply(status: u16, body: &str) -> Outcome {
    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}

pub fn test_config() -> AppConfig {
    AppConfig {
        api_base_url: TEST_BASE_URL.to_string(),
        federated: Some(FederatedConfig {
            client_id: "client-123".to_string(),
            authorize_url: "https://accounts.example.com/o/oauth2/auth".to_string(),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
        }),
        ..AppConfig::default()
    }
}

pub fn session_fixture(ttl_seconds: i64) -> Session {
    Session {
        subject_id: "7".to_string(),
        display_name: "HR Admin".to_string(),
        email: "hr@example.com".to_string(),
        access_token: "access-token".to_string(),
        refresh_token: Some("refresh-token".to_string()),
        expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        provider: IdentityProvider::Credentials,
    }
}

pub const LOGIN_BODY: &str = r#"{"user": {"id": 7, "email": "hr@example.com", "username": "hr"}, "access": "access-token", "refresh": "refresh-token", "expires_in": 3600}"#;

/// Session store, auth gateway and API client wired to one mock transport
pub struct Harness {
    pub transport: Rc<MockTransport>,
    pub storage: Rc<MemoryStorage>,
    pub session: SessionStore,
    pub auth: AuthService,
    pub api: ApiClient,
}

impl Harness {
    pub fn new() -> Self {
        let config = test_config();
        let transport = MockTransport::new();
        let storage = Rc::new(MemoryStorage::new());
        let session = SessionStore::new(storage.clone());
        let auth = AuthService::new(&config, transport.clone(), session.clone(), storage.clone());
        let api = ApiClient::new(&config, transport.clone(), session.clone(), auth.clone());
        Self {
            transport,
            storage,
            session,
            auth,
            api,
        }
    }

    pub fn signed_in() -> Self {
        let harness = Self::new();
        harness.session.set_session(session_fixture(3600));
        harness
    }
}
