use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::StoreCell;
use crate::api::{BugTrackerApi, LoginRequest, SignupRequest, UpdateProfileRequest};
use crate::models::User;
use crate::session::{PersistedSession, SessionStore};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Current identity. Hydrated from the persisted session at construction;
/// every identity change is written back to it.
#[derive(Clone)]
pub struct AuthStore {
    api: Arc<dyn BugTrackerApi>,
    session: SessionStore,
    cell: StoreCell<AuthState>,
}

impl AuthStore {
    pub fn new(api: Arc<dyn BugTrackerApi>, session: SessionStore) -> Self {
        let persisted = session.load().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable session");
            PersistedSession::default()
        });
        let initial = AuthState {
            is_authenticated: persisted.is_authenticated && persisted.user.is_some(),
            user: persisted.user,
            ..Default::default()
        };
        Self {
            api,
            session,
            cell: StoreCell::new(initial),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthState> {
        self.cell.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.cell.read(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.cell.read(|s| s.is_authenticated)
    }

    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.cell.begin();
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        match self.api.login(&req).await {
            Ok(resp) => {
                info!(user = %resp.user.email, "logged in");
                self.persist(PersistedSession {
                    user: Some(resp.user.clone()),
                    is_authenticated: true,
                    token: resp.token,
                });
                self.set_user(resp.user);
                true
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                if let Err(e) = self.session.clear() {
                    warn!(error = %e, "failed to clear persisted session");
                }
                self.cell.update(|s| {
                    s.user = None;
                    s.is_authenticated = false;
                    s.is_loading = false;
                    s.error = Some(e.user_message());
                });
                false
            }
        }
    }

    pub async fn signup(&self, email: &str, password: &str, name: &str) -> bool {
        self.cell.begin();
        let req = SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        };
        match self.api.signup(&req).await {
            Ok(resp) => {
                info!(user = %resp.user.email, "signed up");
                self.persist(PersistedSession {
                    user: Some(resp.user.clone()),
                    is_authenticated: true,
                    token: resp.token,
                });
                self.set_user(resp.user);
                true
            }
            Err(e) => {
                warn!(error = %e, "signup failed");
                self.cell.fail(e.user_message());
                false
            }
        }
    }

    /// Best-effort server call; local identity is cleared regardless.
    pub async fn logout(&self) {
        self.cell.begin();
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "server logout failed, clearing local session anyway");
        }
        self.forget();
        info!("logged out");
    }

    /// Revalidate a persisted session. Does nothing unless the persisted
    /// flag is set; any failure clears identity and the flag. Safe to call
    /// repeatedly.
    pub async fn check_auth(&self) -> bool {
        let persisted = self.session.load().unwrap_or_default();
        if !persisted.is_authenticated {
            debug!("no persisted session to revalidate");
            self.cell.update(|s| {
                s.user = None;
                s.is_authenticated = false;
                s.is_loading = false;
            });
            return false;
        }

        self.cell.begin();
        match self.api.current_user().await {
            Ok(user) => {
                let persisted_user = user.clone();
                if let Err(e) = self.session.update(|s| {
                    s.user = Some(persisted_user);
                    s.is_authenticated = true;
                }) {
                    warn!(error = %e, "failed to persist session");
                }
                self.set_user(user);
                true
            }
            Err(e) => {
                debug!(error = %e, "session revalidation failed");
                self.forget();
                false
            }
        }
    }

    /// Returns the server's copy of the user, which replaces the cached one.
    pub async fn update_profile(&self, req: UpdateProfileRequest) -> Option<User> {
        self.cell.begin();
        match self.api.update_profile(&req).await {
            Ok(user) => {
                let persisted_user = user.clone();
                if let Err(e) = self.session.update(|s| s.user = Some(persisted_user)) {
                    warn!(error = %e, "failed to persist session");
                }
                self.cell.update(|s| {
                    s.user = Some(user.clone());
                    s.is_loading = false;
                });
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "profile update failed");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    /// The transport saw a 401 and already cleared the persisted session.
    pub fn on_session_expired(&self) {
        info!("session expired");
        self.cell.update(|s| {
            s.user = None;
            s.is_authenticated = false;
            s.is_loading = false;
        });
    }

    pub fn clear_error(&self) {
        self.cell.clear_error();
    }

    fn set_user(&self, user: User) {
        self.cell.update(|s| {
            s.user = Some(user);
            s.is_authenticated = true;
            s.is_loading = false;
        });
    }

    fn forget(&self) {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
        self.cell.update(|s| {
            s.user = None;
            s.is_authenticated = false;
            s.is_loading = false;
        });
    }

    fn persist(&self, session: PersistedSession) {
        if let Err(e) = self.session.save(&session) {
            warn!(error = %e, "failed to persist session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::errors::{ClientError, NETWORK_ERROR_MESSAGE};
    use crate::models::fixtures::user;

    fn store_with(api: FakeApi) -> (AuthStore, Arc<FakeApi>, SessionStore) {
        let api = Arc::new(api);
        let session = SessionStore::in_memory();
        let store = AuthStore::new(api.clone(), session.clone());
        (store, api, session)
    }

    fn persist_logged_in(session: &SessionStore, id: &str) {
        session
            .save(&PersistedSession {
                user: Some(user(id)),
                is_authenticated: true,
                token: Some("t".into()),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_success_sets_identity_and_persists() {
        let (store, _api, session) = store_with(FakeApi::new().with_user(user("u1")));
        assert!(store.login("u1@example.com", "pw").await);

        let state = store.snapshot();
        assert!(state.is_authenticated);
        assert!(!state.is_loading);
        assert_eq!(state.user.unwrap().id, "u1");

        let persisted = session.load().unwrap();
        assert!(persisted.is_authenticated);
        assert_eq!(persisted.token.as_deref(), Some("token-u1"));
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_server_message() {
        let (store, api, _) = store_with(FakeApi::new());
        assert!(!store.login("nobody@example.com", "pw").await);

        let state = store.snapshot();
        assert!(!state.is_authenticated);
        assert!(state.user.is_none());
        assert_eq!(state.error.as_deref(), Some("Invalid email or password"));
        assert_eq!(api.calls("login"), 1);

        let req = LoginRequest {
            email: "nobody@example.com".into(),
            password: "pw".into(),
        };
        assert!(matches!(
            api.login(&req).await,
            Err(ClientError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_login_after_success_clears_persisted_session() {
        let (store, api, session) = store_with(FakeApi::new().with_user(user("u1")));
        assert!(store.login("u1@example.com", "pw").await);
        api.fail_on(
            "login",
            ClientError::Api {
                status: 400,
                message: "Invalid input".into(),
            },
        );

        assert!(!store.login("u1@example.com", "wrong").await);

        assert!(!store.snapshot().is_authenticated);
        assert_eq!(session.load().unwrap(), PersistedSession::default());
        let reopened = AuthStore::new(api.clone(), session.clone());
        assert!(!reopened.is_authenticated());
        assert!(reopened.current_user().is_none());
    }

    #[tokio::test]
    async fn test_error_stays_until_cleared() {
        let (store, _, _) = store_with(FakeApi::new().with_user(user("u1")));
        store.login("nobody@example.com", "pw").await;
        store.login("u1@example.com", "pw").await;
        assert!(store.snapshot().error.is_some());
        store.clear_error();
        assert!(store.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_identity_even_when_server_unreachable() {
        let (store, api, session) = store_with(FakeApi::new().with_user(user("u1")));
        store.login("u1@example.com", "pw").await;
        api.fail_on("logout", ClientError::Network("connection refused".into()));

        store.logout().await;

        let state = store.snapshot();
        assert!(!state.is_authenticated);
        assert!(state.user.is_none());
        assert!(!state.is_loading);
        assert_eq!(session.load().unwrap(), PersistedSession::default());
    }

    #[tokio::test]
    async fn test_check_auth_without_persisted_flag_makes_no_request() {
        let (store, api, _) = store_with(FakeApi::new());
        assert!(!store.check_auth().await);
        assert_eq!(api.calls("current_user"), 0);
    }

    #[tokio::test]
    async fn test_check_auth_is_idempotent() {
        let api = Arc::new(FakeApi::new().signed_in_as(user("u1")));
        let session = SessionStore::in_memory();
        persist_logged_in(&session, "u1");
        let store = AuthStore::new(api.clone(), session);

        assert!(store.check_auth().await);
        let first = store.snapshot();
        assert_eq!(api.calls("current_user"), 1);

        assert!(store.check_auth().await);
        assert_eq!(store.snapshot(), first);
        assert_eq!(api.calls("current_user"), 2);
    }

    #[tokio::test]
    async fn test_check_auth_failure_clears_persisted_flag() {
        let api = Arc::new(FakeApi::new());
        let session = SessionStore::in_memory();
        persist_logged_in(&session, "u1");
        let store = AuthStore::new(api.clone(), session.clone());
        assert!(store.is_authenticated());

        assert!(!store.check_auth().await);
        assert!(!store.is_authenticated());
        assert!(!session.load().unwrap().is_authenticated);

        // Second call sees no flag and stays quiet.
        assert!(!store.check_auth().await);
        assert_eq!(api.calls("current_user"), 1);
    }

    #[tokio::test]
    async fn test_check_auth_network_failure_also_clears() {
        let api = Arc::new(FakeApi::new().signed_in_as(user("u1")));
        api.fail_on("current_user", ClientError::Network("timeout".into()));
        let session = SessionStore::in_memory();
        persist_logged_in(&session, "u1");
        let store = AuthStore::new(api, session);

        assert!(!store.check_auth().await);
        assert!(store.current_user().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_replaces_user() {
        let (store, _, session) = store_with(FakeApi::new().with_user(user("u1")));
        store.login("u1@example.com", "pw").await;

        let updated = store
            .update_profile(UpdateProfileRequest {
                name: Some("Renamed".into()),
                avatar_url: None,
            })
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(store.current_user().unwrap().name, "Renamed");
        assert_eq!(session.load().unwrap().user.unwrap().name, "Renamed");
    }

    #[tokio::test]
    async fn test_update_profile_network_failure() {
        let (store, api, _) = store_with(FakeApi::new().with_user(user("u1")));
        store.login("u1@example.com", "pw").await;
        api.fail_on("update_profile", ClientError::Network("down".into()));

        assert!(store.update_profile(UpdateProfileRequest::default()).await.is_none());
        assert_eq!(store.snapshot().error.as_deref(), Some(NETWORK_ERROR_MESSAGE));
        assert_eq!(store.current_user().unwrap().name, "U1");
    }

    #[tokio::test]
    async fn test_signup_then_duplicate_fails() {
        let (store, _, _) = store_with(FakeApi::new());
        assert!(store.signup("new@example.com", "pw", "New").await);
        assert_eq!(store.current_user().unwrap().email, "new@example.com");

        assert!(!store.signup("new@example.com", "pw", "Again").await);
        assert_eq!(store.snapshot().error.as_deref(), Some("Email already registered"));
    }

    #[test]
    fn test_hydrates_from_persisted_session() {
        let session = SessionStore::in_memory();
        persist_logged_in(&session, "u9");
        let store = AuthStore::new(Arc::new(FakeApi::new()), session);
        assert!(store.is_authenticated());
        assert_eq!(store.current_user().unwrap().id, "u9");
    }

    #[test]
    fn test_session_expired_clears_in_memory_identity() {
        let session = SessionStore::in_memory();
        persist_logged_in(&session, "u1");
        let store = AuthStore::new(Arc::new(FakeApi::new()), session);
        store.on_session_expired();
        assert!(!store.is_authenticated());
        assert!(store.current_user().is_none());
    }
}
