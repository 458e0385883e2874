//! Permission registry: resolves the signed-in role's grants into a
//! module -> actions snapshot and answers point queries against it.
//!
//! Checks fail closed: while a load is in flight, when nobody is signed in,
//! or for a module without a grant, every check is denied.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;

use crate::models::{Action, PermissionGrant};
use crate::services::backend::{BackendError, Directory};
use crate::services::session::{AuthSession, Identity};

pub const PERMISSIONS_UNAVAILABLE_MESSAGE: &str =
    "Permissions could not be loaded. Some pages may be unavailable.";

/// Resolved module -> allowed actions mapping for one role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSnapshot {
    modules: BTreeMap<String, BTreeSet<Action>>,
}

impl PermissionSnapshot {
    /// Build from a role's grants. Grants are expected to be unique per
    /// module; if the backend holds duplicates, the last one wins.
    pub fn from_grants(grants: Vec<PermissionGrant>) -> Self {
        let mut modules = BTreeMap::new();
        for grant in grants {
            if modules.contains_key(&grant.module) {
                tracing::warn!(module = %grant.module, "Duplicate grant for module; using the later one");
            }
            modules.insert(grant.module, grant.actions);
        }
        Self { modules }
    }

    pub fn allows(&self, module: &str, action: Action) -> bool {
        self.modules
            .get(module)
            .is_some_and(|actions| actions.contains(&action))
    }

    pub fn actions(&self, module: &str) -> BTreeSet<Action> {
        self.modules.get(module).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    snapshot: PermissionSnapshot,
    identity: Option<Identity>,
    loading: bool,
    /// Set when the latest load failed; cleared by the next success.
    error: Option<String>,
}

#[derive(Clone)]
pub struct PermissionRegistry {
    state: Arc<RwLock<RegistryState>>,
    /// Latest issued load request. A response is applied only while its own
    /// sequence number is still the latest.
    sequence: Arc<AtomicU64>,
    directory: Arc<dyn Directory>,
}

impl PermissionRegistry {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            sequence: Arc::new(AtomicU64::new(0)),
            directory,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, sequence: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == sequence
    }

    /// Does the signed-in role allow `action` on `module`?
    pub fn check(&self, module: &str, action: Action) -> bool {
        let state = self.read();
        if state.loading || state.identity.is_none() {
            return false;
        }
        state.snapshot.allows(module, action)
    }

    /// `check` with an action name; names outside the canonical set are denied.
    pub fn check_named(&self, module: &str, action: &str) -> bool {
        action
            .parse::<Action>()
            .map(|action| self.check(module, action))
            .unwrap_or(false)
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read().identity.clone()
    }

    /// User-facing message for the last failed load, if it was not since
    /// superseded by a successful one.
    pub fn load_error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// Copy of the current snapshot. Empty while loading.
    pub fn snapshot(&self) -> PermissionSnapshot {
        let state = self.read();
        if state.loading {
            PermissionSnapshot::default()
        } else {
            state.snapshot.clone()
        }
    }

    /// Load the grants of `identity.role`.
    ///
    /// Fetches the role by name, then its grants by role id. On failure the
    /// previous snapshot is kept if it belonged to the same identity; a new
    /// identity starts from an empty snapshot.
    pub async fn load(&self, identity: &Identity) -> Result<(), BackendError> {
        let sequence = self.next_sequence();
        {
            let mut state = self.write();
            if state.identity.as_ref() != Some(identity) {
                state.snapshot = PermissionSnapshot::default();
                state.identity = Some(identity.clone());
            }
            state.loading = true;
        }

        tracing::debug!(role = %identity.role, sequence, "Loading permissions");
        let result = self.fetch_snapshot(&identity.role).await;

        if !self.is_latest(sequence) {
            tracing::debug!(role = %identity.role, sequence, "Discarding stale permission load");
            return Ok(());
        }

        let mut state = self.write();
        state.loading = false;
        match result {
            Ok(snapshot) => {
                state.snapshot = snapshot;
                state.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::error!(role = %identity.role, "Failed to fetch permissions: {}", e);
                state.error = Some(PERMISSIONS_UNAVAILABLE_MESSAGE.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(&self, role_name: &str) -> Result<PermissionSnapshot, BackendError> {
        let roles = self.directory.fetch_roles().await?;
        let Some(role) = roles.into_iter().find(|role| role.name == role_name) else {
            tracing::warn!(role = %role_name, "User references an unknown role; no permissions granted");
            return Ok(PermissionSnapshot::default());
        };

        let grants = self.directory.fetch_grants(&role.id).await?;
        Ok(PermissionSnapshot::from_grants(
            grants
                .into_iter()
                .filter(|grant| grant.role_id == role.id)
                .collect(),
        ))
    }

    /// Forget everything and invalidate in-flight loads.
    pub fn reset(&self) {
        self.next_sequence();
        *self.write() = RegistryState::default();
    }

    /// Bring the registry in line with the session identity: reset when
    /// anonymous, load when the identity differs from the loaded one.
    pub async fn sync(&self, identity: Option<Identity>) -> Result<(), BackendError> {
        match identity {
            None => {
                self.reset();
                Ok(())
            }
            Some(identity) if self.identity().as_ref() == Some(&identity) && !self.is_loading() => {
                Ok(())
            }
            Some(identity) => self.load(&identity).await,
        }
    }

    /// Reload the current identity's grants, e.g. after a role was edited.
    pub async fn refresh(&self) -> Result<(), BackendError> {
        match self.identity() {
            Some(identity) => self.load(&identity).await,
            None => Ok(()),
        }
    }

    /// Re-evaluate on every identity change of `session`.
    ///
    /// Each change starts its own load so a newer identity never waits behind
    /// an older one; stale responses are discarded by sequence number.
    pub fn follow(&self, session: &AuthSession) -> JoinHandle<()> {
        let registry = self.clone();
        let mut identities = session.subscribe();

        tokio::spawn(async move {
            loop {
                let identity = identities.borrow_and_update().clone();
                match identity {
                    None => registry.reset(),
                    Some(identity) => {
                        let registry = registry.clone();
                        tokio::spawn(async move {
                            // Failures are logged by `load` and kept in `load_error`.
                            if let Err(e) = registry.load(&identity).await {
                                tracing::debug!(role = %identity.role, "Followed load failed: {}", e);
                            }
                        });
                    }
                }

                if identities.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
