// ============================================================================
// SERVICES - Network-facing logic (transport, auth, resources, guards)
// ============================================================================

pub mod api_client;
pub mod auth_service;
pub mod employee_directory;
pub mod http;
pub mod mutation_queue;
pub mod route_guard;

pub use api_client::ApiClient;
pub use auth_service::AuthService;
pub use employee_directory::EmployeeDirectory;
pub use http::{HttpRequest, HttpResponse, HttpTransport, Method};
pub use mutation_queue::{MutationPermit, MutationQueue};
pub use route_guard::{GuardState, Navigation, RouteGuard};

#[cfg(target_arch = "wasm32")]
pub use http::GlooTransport;
