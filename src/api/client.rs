//! HTTP transport for the Bugboard REST API.
//!
//! Responsibilities that live here and nowhere else:
//! - bearer-token attachment (the cookie jar carries the primary session)
//! - turning non-2xx responses into [`ClientError`] with the server message
//! - global 401 handling: drop the token, clear the persisted session and
//!   announce [`TransportEvent::SessionExpired`]

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::*;
use crate::config::ClientConfig;
use crate::errors::{ClientError, extract_message};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A request came back 401. Local session state has been cleared; the
    /// UI should send the user to the login entry point.
    SessionExpired { path: String },
}

pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
    token: RwLock<Option<String>>,
    session: SessionStore,
    events: broadcast::Sender<TransportEvent>,
}

impl HttpApi {
    /// Build a transport from resolved configuration. The bearer token is
    /// seeded from the persisted session, if any.
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .cookie_store(true)
            .user_agent(concat!("bugboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, config.base_url(), session)
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        session: SessionStore,
    ) -> Result<Self, ClientError> {
        let base = Url::parse(base_url.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| ClientError::InvalidBaseUrl(base_url.to_string()))?;
        let token = session.token();
        let (events, _) = broadcast::channel(16);
        Ok(Self {
            client,
            base,
            token: RwLock::new(token),
            session,
            events,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Append `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // http(s) URLs always have a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!(%method, path = url.path(), "api request");
        let builder = self.client.request(method, url);
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) fn handle_unauthorized(&self, path: &str) {
        warn!(path, "session rejected by server, clearing local session");
        self.set_token(None);
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
        // No subscribers is fine.
        let _ = self.events.send(TransportEvent::SessionExpired {
            path: path.to_string(),
        });
    }

    /// Send and return the body of a 2xx response.
    async fn send(&self, segments: &[&str], builder: RequestBuilder) -> ApiResult<String> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }
        let path = format!("/{}", segments.join("/"));
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(&path);
        }
        let message = extract_message(status.as_u16(), &body);
        debug!(%path, status = status.as_u16(), %message, "api request failed");
        Err(ClientError::from_status(status.as_u16(), message))
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, segments: &[&str]) -> ApiResult<T> {
        let body = self.send(segments, self.request(method, segments)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn call_with<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        payload: &B,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let body = self
            .send(segments, self.request(method, segments).json(payload))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// For endpoints whose body is only `{message}`; the body is not inspected.
    async fn call_unit(&self, method: Method, segments: &[&str]) -> ApiResult<()> {
        self.send(segments, self.request(method, segments)).await.map(|_| ())
    }

    async fn call_unit_with<B>(
        &self,
        method: Method,
        segments: &[&str],
        payload: &B,
    ) -> ApiResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.send(segments, self.request(method, segments).json(payload))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl BugTrackerApi for HttpApi {
    async fn login(&self, req: &LoginRequest) -> ApiResult<AuthResponse> {
        let resp: AuthResponse = self.call_with(Method::POST, &["auth", "login"], req).await?;
        if resp.token.is_some() {
            self.set_token(resp.token.clone());
        }
        Ok(resp)
    }

    async fn signup(&self, req: &SignupRequest) -> ApiResult<AuthResponse> {
        let resp: AuthResponse = self.call_with(Method::POST, &["auth", "signup"], req).await?;
        if resp.token.is_some() {
            self.set_token(resp.token.clone());
        }
        Ok(resp)
    }

    async fn logout(&self) -> ApiResult<()> {
        let result = self.call_unit(Method::POST, &["auth", "logout"]).await;
        self.set_token(None);
        result
    }

    async fn current_user(&self) -> ApiResult<User> {
        let resp: UserResponse = self.call(Method::GET, &["auth", "me"]).await?;
        Ok(resp.user)
    }

    async fn update_profile(&self, req: &UpdateProfileRequest) -> ApiResult<User> {
        let resp: UserResponse = self.call_with(Method::PUT, &["auth", "profile"], req).await?;
        Ok(resp.user)
    }

    async fn my_projects(&self) -> ApiResult<Vec<Project>> {
        let resp: ProjectsResponse = self.call(Method::GET, &["projects"]).await?;
        Ok(resp.projects)
    }

    async fn public_projects(&self) -> ApiResult<Vec<Project>> {
        let resp: ProjectsResponse = self.call(Method::GET, &["projects", "public"]).await?;
        Ok(resp.projects)
    }

    async fn project_by_slug(&self, slug: &str) -> ApiResult<ProjectResponse> {
        self.call(Method::GET, &["projects", slug]).await
    }

    async fn create_project(&self, req: &CreateProjectRequest) -> ApiResult<Project> {
        let resp: ProjectResponse = self.call_with(Method::POST, &["projects"], req).await?;
        Ok(resp.project)
    }

    async fn update_project(
        &self,
        project_id: &str,
        req: &UpdateProjectRequest,
    ) -> ApiResult<Project> {
        let path = ["projects", project_id];
        let resp: ProjectResponse = self.call_with(Method::PUT, &path, req).await?;
        Ok(resp.project)
    }

    async fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        self.call_unit(Method::DELETE, &["projects", project_id]).await
    }

    async fn bugs_by_project(&self, project_id: &str) -> ApiResult<Vec<Bug>> {
        let path = ["bugs", "project", project_id];
        let resp: BugsResponse = self.call(Method::GET, &path).await?;
        Ok(resp.bugs)
    }

    async fn bug(&self, bug_id: &str) -> ApiResult<Bug> {
        let resp: BugResponse = self
            .call(Method::GET, &["bugs", bug_id])
            .await?;
        Ok(resp.bug)
    }

    async fn create_bug(&self, req: &CreateBugRequest) -> ApiResult<Bug> {
        let resp: BugResponse = self.call_with(Method::POST, &["bugs"], req).await?;
        Ok(resp.bug)
    }

    async fn update_bug(&self, bug_id: &str, req: &UpdateBugRequest) -> ApiResult<Bug> {
        let path = ["bugs", bug_id];
        let resp: BugResponse = self.call_with(Method::PUT, &path, req).await?;
        Ok(resp.bug)
    }

    async fn update_bug_status(&self, bug_id: &str, status: Status) -> ApiResult<Bug> {
        let path = ["bugs", bug_id, "status"];
        let resp: BugResponse = self
            .call_with(Method::PATCH, &path, &UpdateBugStatusRequest { status })
            .await?;
        Ok(resp.bug)
    }

    async fn delete_bug(&self, bug_id: &str) -> ApiResult<()> {
        self.call_unit(Method::DELETE, &["bugs", bug_id]).await
    }

    async fn project_members(&self, project_id: &str) -> ApiResult<Vec<ProjectMember>> {
        let path = ["members", project_id];
        let resp: MembersResponse = self.call(Method::GET, &path).await?;
        Ok(resp.members)
    }

    async fn add_member(
        &self,
        project_id: &str,
        req: &AddMemberRequest,
    ) -> ApiResult<AddMemberResponse> {
        self.call_with(Method::POST, &["members", project_id], req)
            .await
    }

    async fn update_member_role(
        &self,
        project_id: &str,
        member_id: &str,
        role: MemberRole,
    ) -> ApiResult<ProjectMember> {
        let path = ["members", project_id, member_id];
        let resp: MemberResponse = self
            .call_with(Method::PUT, &path, &UpdateMemberRoleRequest { role })
            .await?;
        Ok(resp.member)
    }

    async fn remove_member(&self, project_id: &str, member_id: &str) -> ApiResult<()> {
        let path = ["members", project_id, member_id];
        self.call_unit(Method::DELETE, &path).await
    }

    async fn request_access(
        &self,
        project_id: &str,
        message: Option<&str>,
    ) -> ApiResult<AccessRequest> {
        let path = ["members", project_id, "request"];
        let body = RequestAccessRequest {
            message: message.map(str::to_string),
        };
        let resp: AccessRequestResponse = self.call_with(Method::POST, &path, &body).await?;
        Ok(resp.request)
    }

    async fn access_requests(&self, project_id: &str) -> ApiResult<Vec<AccessRequest>> {
        let path = ["members", project_id, "requests"];
        let resp: AccessRequestsResponse = self.call(Method::GET, &path).await?;
        Ok(resp.access_requests)
    }

    async fn approve_access_request(
        &self,
        request_id: &str,
        role: Option<MemberRole>,
    ) -> ApiResult<ProjectMember> {
        let path = ["members", "requests", request_id, "approve"];
        let resp: MemberResponse = self
            .call_with(Method::POST, &path, &ApproveAccessRequest { role })
            .await?;
        Ok(resp.member)
    }

    async fn reject_access_request(&self, request_id: &str, note: Option<&str>) -> ApiResult<()> {
        let path = ["members", "requests", request_id, "reject"];
        let body = RejectAccessRequest {
            note: note.map(str::to_string),
        };
        self.call_unit_with(Method::POST, &path, &body).await
    }
}
