// ============================================================================
// APP - Composition root
// ============================================================================
// Builds one SessionStore and hands the same instance to every collaborator.
// ============================================================================

use std::rc::Rc;

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::{Department, Designation, Entity, SalaryComponent, WorkLocation};
use crate::services::{ApiClient, AuthService, EmployeeDirectory, HttpTransport, RouteGuard};
use crate::state::session_store::SessionStore;
use crate::utils::storage::KeyValueStore;
use crate::viewmodels::EntityListViewModel;

#[derive(Clone)]
pub struct ConsoleApp {
    session: SessionStore,
    auth: AuthService,
    api: ApiClient,
    guard: RouteGuard,
    employees: EmployeeDirectory,
}

impl ConsoleApp {
    /// Restores any persisted session from `storage` and wires the services
    pub fn new(config: &AppConfig, transport: Rc<dyn HttpTransport>, storage: Rc<dyn KeyValueStore>) -> Self {
        let session = SessionStore::restore(storage.clone());
        let auth = AuthService::new(config, transport.clone(), session.clone(), storage);
        let api = ApiClient::new(config, transport, session.clone(), auth.clone());
        let guard = RouteGuard::new(session.clone(), &config.routes);

        log::info!(
            "🚀 Payroll console ready ({}, API {})",
            config.environment,
            config.api_base_url()
        );

        Self {
            session,
            auth,
            api,
            guard,
            employees: EmployeeDirectory::new(),
        }
    }

    /// Browser wiring: fetch transport with the configured timeout, localStorage
    #[cfg(target_arch = "wasm32")]
    pub fn for_browser(config: &AppConfig) -> Self {
        use crate::services::http::GlooTransport;
        use crate::utils::storage::BrowserStorage;

        Self::new(
            config,
            Rc::new(GlooTransport::new(config.request_timeout())),
            Rc::new(BrowserStorage),
        )
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn employees(&self) -> &EmployeeDirectory {
        &self.employees
    }

    /// A fresh list view model; close it when its view goes away
    pub fn entity_list<E: Entity>(&self) -> EntityListViewModel<E> {
        EntityListViewModel::new(self.api.clone(), self.employees.clone())
    }

    pub fn departments(&self) -> EntityListViewModel<Department> {
        self.entity_list()
    }

    pub fn designations(&self) -> EntityListViewModel<Designation> {
        self.entity_list()
    }

    pub fn work_locations(&self) -> EntityListViewModel<WorkLocation> {
        self.entity_list()
    }

    pub fn salary_components(&self) -> EntityListViewModel<SalaryComponent> {
        self.entity_list()
    }

    pub async fn load_employees(&self) -> Result<usize, ApiError> {
        self.employees.load(&self.api).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Credential, EmployeeRef};
    use crate::testing::{session_fixture, test_config, MockTransport, LOGIN_BODY};
    use crate::utils::constants::STORAGE_KEY_SESSION;
    use crate::utils::storage::{save_json, MemoryStorage};
    use futures::executor::block_on;

    #[test]
    fn one_session_store_is_shared() {
        let transport = MockTransport::new();
        let app = ConsoleApp::new(&test_config(), transport.clone(), Rc::new(MemoryStorage::new()));
        assert!(!app.guard().check("/dashboard").is_allowed());

        transport.push(200, LOGIN_BODY);
        block_on(app.auth().sign_in(&Credential::new("hr@example.com", "pw"))).unwrap();

        assert!(app.session().is_authenticated());
        assert!(app.guard().check("/dashboard").is_allowed());

        block_on(app.auth().sign_out());
        assert!(!app.guard().check("/dashboard").is_allowed());
    }

    #[test]
    fn persisted_session_survives_a_reload() {
        let storage = Rc::new(MemoryStorage::new());
        save_json(storage.as_ref(), STORAGE_KEY_SESSION, &session_fixture(3600)).unwrap();

        let app = ConsoleApp::new(&test_config(), MockTransport::new(), storage);
        assert!(app.guard().check("/settings/departments").is_allowed());
    }

    #[test]
    fn list_view_models_share_the_employee_directory() {
        let transport = MockTransport::new();
        let app = ConsoleApp::new(&test_config(), transport.clone(), Rc::new(MemoryStorage::new()));
        app.session().set_session(session_fixture(3600));
        transport.push(200, r#"[{"id": "EMP-1", "department": 1}]"#);
        transport.push(200, r#"[{"id": 1, "name": "IT"}]"#);

        assert_eq!(block_on(app.load_employees()), Ok(1));
        let departments = app.departments();
        block_on(departments.fetch()).unwrap();

        assert_eq!(departments.reference_count("1"), 1);
        app.employees().replace(vec![EmployeeRef::new("EMP-2")]);
        assert_eq!(departments.reference_count("1"), 0);
    }
}
