//! Auth session state machine.
//!
//! ```text
//! anonymous --login/bootstrap--> authenticating --ok--> authenticated
//!                                       |                     |
//!                                       +--failure--> anonymous <--logout/rejection
//! ```
//!
//! State is written before the identity change is published on the watch
//! channel, so subscribers always observe the new state.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::watch;

use crate::models::User;
use crate::services::backend::{BackendError, Directory};
use crate::services::storage::{StorageError, TokenStore};
use crate::services::token::{IdentityClaims, TokenError, TokenService};
use crate::utils::password::{verify_against_dummy, verify_password, Password};

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";
pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";
pub const AUTHENTICATION_FAILED_MESSAGE: &str = "Authentication failed";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Failed to load session data: {0}")]
    LoadFailure(#[from] BackendError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub status: SessionStatus,
    pub user: Option<User>,
    pub error: Option<String>,
}

impl SessionState {
    fn anonymous(error: Option<String>) -> Self {
        Self {
            status: SessionStatus::Anonymous,
            user: None,
            error,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Authenticating
    }
}

/// Who is signed in, as far as permissions are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.to_string(),
            role: user.role.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthSession {
    state: Arc<RwLock<SessionState>>,
    identity: Arc<watch::Sender<Option<Identity>>>,
    directory: Arc<dyn Directory>,
    tokens: TokenService,
    store: TokenStore,
}

impl AuthSession {
    pub fn new(directory: Arc<dyn Directory>, tokens: TokenService, store: TokenStore) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            state: Arc::new(RwLock::new(SessionState::anonymous(None))),
            identity: Arc::new(identity),
            directory,
            tokens,
            store,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Write the new state, then notify identity subscribers.
    fn transition(&self, next: SessionState) {
        let identity = next.user.as_ref().map(Identity::from);
        *self.write() = next;
        self.identity.send_if_modified(|current| {
            if *current != identity {
                *current = identity;
                true
            } else {
                false
            }
        });
    }

    fn begin(&self) {
        let mut state = self.write();
        state.status = SessionStatus::Authenticating;
        state.error = None;
    }

    pub fn state(&self) -> SessionState {
        self.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.read().status
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Rehydrate the session from the stored token and user-id reference.
    ///
    /// Any failure lands in `Anonymous` with the stored entries cleared.
    pub async fn bootstrap(&self) -> SessionState {
        let token = match self.store.token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.transition(SessionState::anonymous(None));
                return self.state();
            }
            Err(e) => {
                tracing::error!("Failed to read stored token: {}", e);
                return self.fail_bootstrap(AUTHENTICATION_FAILED_MESSAGE).await;
            }
        };

        self.begin();

        let claims = match self.tokens.verify(&token) {
            Ok(claims) => claims,
            Err(_) => {
                tracing::info!("Stored token is no longer valid");
                return self.fail_bootstrap(AUTHENTICATION_FAILED_MESSAGE).await;
            }
        };

        let user_id = match self.store.user_id().await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => return self.fail_bootstrap(USER_NOT_FOUND_MESSAGE).await,
            Err(e) => {
                tracing::error!("Failed to read stored user id: {}", e);
                return self.fail_bootstrap(AUTHENTICATION_FAILED_MESSAGE).await;
            }
        };

        if claims.sub != user_id {
            tracing::warn!(token_sub = %claims.sub, %user_id, "Token subject does not match stored user");
            return self.fail_bootstrap(AUTHENTICATION_FAILED_MESSAGE).await;
        }

        match self.directory.fetch_user(&user_id).await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, role = %user.role, "Session restored");
                self.transition(SessionState {
                    status: SessionStatus::Authenticated,
                    user: Some(user),
                    error: None,
                });
            }
            Err(e) => {
                tracing::warn!(%user_id, "Failed to load session user: {}", e);
                return self.fail_bootstrap(AUTHENTICATION_FAILED_MESSAGE).await;
            }
        }

        self.state()
    }

    async fn fail_bootstrap(&self, message: &str) -> SessionState {
        if let Err(e) = self.store.clear().await {
            tracing::error!("Failed to clear stored session: {}", e);
        }
        self.transition(SessionState::anonymous(Some(message.to_string())));
        self.state()
    }

    /// Authenticate with email and password.
    ///
    /// On success the token and user id are persisted and the session becomes
    /// `Authenticated`. On failure the session is `Anonymous` and `error`
    /// carries the user-facing message.
    pub async fn login(&self, email: &str, password: &Password) -> Result<User, AuthError> {
        self.begin();

        let candidates = match self.directory.find_users_by_email(email).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("User lookup failed during login: {}", e);
                self.transition(SessionState::anonymous(Some(LOGIN_FAILED_MESSAGE.to_string())));
                return Err(AuthError::LoadFailure(e));
            }
        };

        let user = match candidates.into_iter().find(|u| u.email == email) {
            Some(user) if verify_password(password, &user.password_hash) => user,
            Some(_) => return Err(self.reject_credentials()),
            None => {
                verify_against_dummy(password);
                return Err(self.reject_credentials());
            }
        };

        let issued = self.tokens.issue(&IdentityClaims {
            user_id: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
        });

        let persisted = match issued {
            Ok(token) => self
                .store
                .persist(&token, &user.id.to_string())
                .await
                .map_err(AuthError::from),
            Err(e) => Err(AuthError::from(e)),
        };

        if let Err(e) = persisted {
            tracing::error!("Failed to establish session: {}", e);
            // Never leave a half-written session behind.
            if let Err(e) = self.store.clear().await {
                tracing::error!("Failed to clear partial session: {}", e);
            }
            self.transition(SessionState::anonymous(Some(LOGIN_FAILED_MESSAGE.to_string())));
            return Err(e);
        }

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        self.transition(SessionState {
            status: SessionStatus::Authenticated,
            user: Some(user.clone()),
            error: None,
        });

        Ok(user)
    }

    fn reject_credentials(&self) -> AuthError {
        tracing::info!("Login rejected: invalid credentials");
        self.transition(SessionState::anonymous(Some(
            INVALID_CREDENTIALS_MESSAGE.to_string(),
        )));
        AuthError::InvalidCredentials
    }

    pub async fn logout(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::error!("Failed to clear stored session on logout: {}", e);
        }
        if let Some(user) = self.current_user() {
            tracing::info!(user_id = %user.id, "User logged out");
        }
        self.transition(SessionState::anonymous(None));
    }

    /// The backend refused the stored token. Behaves like `logout`.
    pub async fn reject(&self) {
        tracing::info!("Session rejected; signing out");
        self.logout().await;
    }

    pub fn clear_error(&self) {
        self.write().error = None;
    }
}
