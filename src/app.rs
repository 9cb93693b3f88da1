//! Composition root: one transport and one instance of each store per run.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::BugTrackerApi;
use crate::api::client::{HttpApi, TransportEvent};
use crate::config::ClientConfig;
use crate::session::SessionStore;
use crate::stores::{AuthStore, BugsStore, MembersStore, ProjectsStore};

pub struct App {
    pub config: ClientConfig,
    pub session: SessionStore,
    pub http: Arc<HttpApi>,
    pub auth: AuthStore,
    pub projects: ProjectsStore,
    pub bugs: BugsStore,
    pub members: MembersStore,
}

impl App {
    /// Build the transport from `config` and wire the stores to it. The
    /// session lives in the configured file, or in memory when no config
    /// directory can be determined.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let session = match config.session_path() {
            Some(path) => {
                debug!(path = %path.display(), "using session file");
                SessionStore::file(path)
            }
            None => {
                warn!("no config directory available, session will not persist");
                SessionStore::in_memory()
            }
        };
        let http = HttpApi::new(&config, session.clone()).context("Failed to build HTTP client")?;
        Ok(Self::with_http(config, session, Arc::new(http)))
    }

    /// Wire stores to an existing transport.
    pub fn with_http(config: ClientConfig, session: SessionStore, http: Arc<HttpApi>) -> Self {
        let api: Arc<dyn BugTrackerApi> = http.clone();
        Self {
            auth: AuthStore::new(Arc::clone(&api), session.clone()),
            projects: ProjectsStore::new(Arc::clone(&api)),
            bugs: BugsStore::new(Arc::clone(&api)),
            members: MembersStore::new(api),
            config,
            session,
            http,
        }
    }

    /// Forward transport 401s to the auth store so in-memory identity
    /// follows the already-cleared persisted session.
    pub fn spawn_session_watch(&self) -> JoinHandle<()> {
        let mut events = self.http.subscribe();
        let auth = self.auth.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(TransportEvent::SessionExpired { path }) => {
                        debug!(path, "transport reported expired session");
                        auth.on_session_expired();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "session watch lagged");
                        auth.on_session_expired();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::user;
    use crate::session::PersistedSession;

    fn app_with_session(session: SessionStore) -> App {
        let http = HttpApi::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:9/api",
            session.clone(),
        )
        .unwrap();
        let http = Arc::new(http);
        App::with_http(ClientConfig::default(), session, http)
    }

    #[test]
    fn test_new_uses_configured_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.session.path = Some(dir.path().join("s.json"));
        let app = App::new(config).unwrap();
        assert_eq!(app.session.path(), Some(dir.path().join("s.json").as_path()));
        assert!(!app.auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_stores_are_isolated_per_app() {
        let a = app_with_session(SessionStore::in_memory());
        let b = app_with_session(SessionStore::in_memory());
        a.projects.set_current_project(Some(crate::models::fixtures::project("p1", "u1")));
        assert!(b.projects.snapshot().current_project.is_none());
    }

    #[tokio::test]
    async fn test_session_watch_clears_auth_on_expiry() {
        let session = SessionStore::in_memory();
        session
            .save(&PersistedSession {
                user: Some(user("u1")),
                is_authenticated: true,
                token: Some("tok".into()),
            })
            .unwrap();
        let app = app_with_session(session);
        assert!(app.auth.is_authenticated());

        let mut auth_rx = app.auth.subscribe();
        let _watch = app.spawn_session_watch();

        app.http.handle_unauthorized("/projects");
        let state = auth_rx.recv().await.unwrap();
        assert!(!state.is_authenticated);
        assert!(state.user.is_none());
        assert!(!app.session.load().unwrap().is_authenticated);
    }
}
