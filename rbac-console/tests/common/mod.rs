//! Shared fixtures for rbac-console integration tests.
//!
//! `FakeDirectory` stands in for the REST collaborator where the HTTP layer is
//! not under test; the router and client tests use wiremock instead.

#![allow(dead_code)]

use async_trait::async_trait;
use rbac_console::{
    models::{Action, PermissionGrant, RecordId, Role, User},
    services::{
        AuthSession, BackendError, Directory, MemoryStorage, PermissionRegistry, TokenService,
        TokenStore,
    },
    utils::password::{hash_password, Password},
    AppState,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

pub const TEST_SECRET: &[u8] = b"rbac-console-test-secret";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const MANAGER_PASSWORD: &str = "manager-password";

/// Hashing is slow; hash each fixture password once per test binary.
fn cached_hash(password: &str) -> String {
    static HASHES: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
    let hashes = HASHES.get_or_init(|| Mutex::new(HashMap::new()));
    let mut hashes = hashes.lock().unwrap();
    hashes
        .entry(password.to_string())
        .or_insert_with(|| hash_password(&Password::new(password)).expect("hash"))
        .clone()
}

pub fn user(id: i64, name: &str, email: &str, password: &str, role: &str) -> User {
    User {
        id: RecordId::Number(id),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: cached_hash(password),
        role: role.to_string(),
    }
}

pub fn admin() -> User {
    user(1, "Ada Admin", "admin@example.com", ADMIN_PASSWORD, "Admin")
}

pub fn manager() -> User {
    user(2, "Max Manager", "manager@example.com", MANAGER_PASSWORD, "Manager")
}

pub fn role(id: i64, name: &str) -> Role {
    Role {
        id: RecordId::Number(id),
        name: name.to_string(),
        description: format!("{} role", name),
    }
}

pub fn grant(id: i64, role_id: i64, module: &str, actions: &[Action]) -> PermissionGrant {
    PermissionGrant {
        id: Some(RecordId::Number(id)),
        role_id: RecordId::Number(role_id),
        module: module.to_string(),
        actions: actions.iter().copied().collect(),
    }
}

/// Admin (role 1) holds everything; Manager (role 2) may view and edit
/// projects and nothing else.
pub fn seeded_grants() -> Vec<PermissionGrant> {
    vec![
        grant(1, 1, "users", &Action::ALL),
        grant(2, 1, "employees", &Action::ALL),
        grant(3, 1, "projects", &Action::ALL),
        grant(4, 1, "roles", &[Action::View, Action::Edit]),
        grant(5, 2, "projects", &[Action::View, Action::Edit]),
    ]
}

/// In-memory REST collaborator.
pub struct FakeDirectory {
    pub users: Mutex<Vec<User>>,
    pub roles: Mutex<Vec<Role>>,
    pub grants: Mutex<Vec<PermissionGrant>>,
    /// Artificial latency for grant lookups, keyed by role id.
    pub grant_delays: Mutex<HashMap<String, Duration>>,
    pub fail_grants: Mutex<bool>,
    pub fail_user_lookup: Mutex<bool>,
    pub grant_fetches: AtomicUsize,
}

impl FakeDirectory {
    pub fn seeded() -> Arc<Self> {
        Arc::new(Self {
            users: Mutex::new(vec![admin(), manager()]),
            roles: Mutex::new(vec![role(1, "Admin"), role(2, "Manager")]),
            grants: Mutex::new(seeded_grants()),
            grant_delays: Mutex::new(HashMap::new()),
            fail_grants: Mutex::new(false),
            fail_user_lookup: Mutex::new(false),
            grant_fetches: AtomicUsize::new(0),
        })
    }

    pub fn delay_grants(&self, role_id: i64, delay: Duration) {
        self.grant_delays
            .lock()
            .unwrap()
            .insert(role_id.to_string(), delay);
    }

    pub fn set_fail_grants(&self, fail: bool) {
        *self.fail_grants.lock().unwrap() = fail;
    }

    pub fn set_fail_user_lookup(&self, fail: bool) {
        *self.fail_user_lookup.lock().unwrap() = fail;
    }

    fn unavailable(path: &str) -> BackendError {
        BackendError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            path: path.to_string(),
        }
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn find_users_by_email(&self, email: &str) -> Result<Vec<User>, BackendError> {
        if *self.fail_user_lookup.lock().unwrap() {
            return Err(Self::unavailable("/users"));
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.email == email)
            .cloned()
            .collect())
    }

    async fn fetch_user(&self, id: &str) -> Result<User, BackendError> {
        if *self.fail_user_lookup.lock().unwrap() {
            return Err(Self::unavailable("/users"));
        }
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id.matches(id))
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("/users/{}", id)))
    }

    async fn fetch_roles(&self) -> Result<Vec<Role>, BackendError> {
        Ok(self.roles.lock().unwrap().clone())
    }

    async fn fetch_grants(&self, role_id: &RecordId) -> Result<Vec<PermissionGrant>, BackendError> {
        self.grant_fetches.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .grant_delays
            .lock()
            .unwrap()
            .get(&role_id.to_string())
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail_grants.lock().unwrap() {
            return Err(Self::unavailable("/permissions"));
        }
        Ok(self
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| &g.role_id == role_id)
            .cloned()
            .collect())
    }
}

pub fn token_service() -> TokenService {
    TokenService::new(TEST_SECRET, 120)
}

/// Session and registry over one fake directory and one storage.
pub struct Harness {
    pub directory: Arc<FakeDirectory>,
    pub store: TokenStore,
    pub session: AuthSession,
    pub permissions: PermissionRegistry,
}

impl Harness {
    pub fn new() -> Self {
        let directory = FakeDirectory::seeded();
        let store = TokenStore::new(Arc::new(MemoryStorage::new()));
        let session = AuthSession::new(directory.clone(), token_service(), store.clone());
        let permissions = PermissionRegistry::new(directory.clone());
        Self {
            directory,
            store,
            session,
            permissions,
        }
    }

    /// A second browser tab: same storage and backend, fresh in-memory state.
    pub fn reopen(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            store: self.store.clone(),
            session: AuthSession::new(self.directory.clone(), token_service(), self.store.clone()),
            permissions: PermissionRegistry::new(self.directory.clone()),
        }
    }
}

pub fn app_state(backend_url: &str) -> AppState {
    AppState::new(reqwest::Client::new(), backend_url, token_service())
}

/// JSON form of a user as the REST collaborator returns it.
pub fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "password": user.password_hash,
        "role": user.role,
    })
}
