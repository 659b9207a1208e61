// ============================================================================
// SESSION STORE - Single owner of the authenticated session
// ============================================================================
// Shared by the auth service, the API client and the route guard. Writes are
// persisted to the key/value store so a reload keeps the user signed in.
// ============================================================================

use std::rc::Rc;

use crate::models::session::Session;
use crate::state::reactivity::{ReactiveState, SubscriptionId};
use crate::utils::constants::STORAGE_KEY_SESSION;
use crate::utils::storage::{load_json, save_json, KeyValueStore};

#[derive(Clone)]
pub struct SessionStore {
    state: Rc<ReactiveState<Option<Session>>>,
    storage: Rc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Empty store; nothing is read from storage
    pub fn new(storage: Rc<dyn KeyValueStore>) -> Self {
        Self {
            state: Rc::new(ReactiveState::new(None)),
            storage,
        }
    }

    /// Store seeded from the persisted session, unless it is missing, corrupt or expired
    pub fn restore(storage: Rc<dyn KeyValueStore>) -> Self {
        let persisted = load_json::<Session>(storage.as_ref(), STORAGE_KEY_SESSION);
        let session = match persisted {
            Some(session) if !session.is_expired() => {
                log::info!("📋 Session restored for {}", session.email);
                Some(session)
            }
            Some(session) => {
                log::info!("⌛ Persisted session for {} has expired, discarding", session.email);
                storage.remove(STORAGE_KEY_SESSION);
                None
            }
            None => None,
        };

        Self {
            state: Rc::new(ReactiveState::new(session)),
            storage,
        }
    }

    pub fn get_session(&self) -> Option<Session> {
        self.state.get()
    }

    /// The session, only while it has not expired
    pub fn valid_session(&self) -> Option<Session> {
        self.get_session().filter(|session| !session.is_expired())
    }

    pub fn access_token(&self) -> Option<String> {
        self.state
            .with(|session| session.as_ref().map(|s| s.access_token.clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.valid_session().is_some()
    }

    pub fn set_session(&self, session: Session) {
        if let Err(e) = save_json(self.storage.as_ref(), STORAGE_KEY_SESSION, &session) {
            log::error!("❌ Error persisting session: {}", e);
        }
        self.state.set(Some(session));
    }

    pub fn clear_session(&self) {
        self.storage.remove(STORAGE_KEY_SESSION);
        let had_session = self.state.with(|session| session.is_some());
        if had_session {
            log::info!("🗑️ Session cleared");
            self.state.set(None);
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + 'static,
    {
        self.state.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.state.unsubscribe(id);
    }
}
