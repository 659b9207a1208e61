/// localStorage key holding the serialized session
pub const STORAGE_KEY_SESSION: &str = "payrollConsole_session";
/// localStorage key holding the pending federated sign-in state nonce
pub const STORAGE_KEY_FEDERATED_STATE: &str = "payrollConsole_federatedState";

// Identity endpoints, relative to the API base URL
pub const LOGIN_PATH: &str = "/login/";
pub const SIGNUP_PATH: &str = "/signup/";
pub const TOKEN_REFRESH_PATH: &str = "/token/refresh/";
pub const LOGOUT_PATH: &str = "/logout/";
pub const FEDERATED_EXCHANGE_PATH: &str = "/auth/federated/";

pub const EMPLOYEES_PATH: &str = "/employees/";

/// Query parameter carrying the originally requested path through sign-in
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// Prefix of ids assigned to entities the server has not confirmed yet
pub const PROVISIONAL_ID_PREFIX: &str = "local-";

/// Upper bound on `next` links followed by one list fetch
pub const MAX_LIST_PAGES: usize = 50;
