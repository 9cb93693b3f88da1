//! The REST contract the stores consume.
//!
//! [`BugTrackerApi`] is the seam between the stores and the network. The
//! production implementation is [`client::HttpApi`]; unit tests use an
//! in-memory fake. Request bodies and response envelopes mirror the
//! backend's JSON (camelCase keys).

pub mod client;
#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::access::ProjectRole;
use crate::errors::ClientError;
use crate::models::{
    AccessRequest, Bug, Invitation, MemberRole, Priority, Project, ProjectMember, Source, Status,
    User,
};

pub type ApiResult<T> = Result<T, ClientError>;

// ── Auth ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Login and signup share this shape. `token` mirrors the session cookie
/// for clients that cannot rely on cookies.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: User,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

// ── Projects ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsResponse {
    pub projects: Vec<Project>,
}

/// `GET /projects/{slug}` also reports the caller's role in the project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub project: Project,
    #[serde(default)]
    pub user_role: Option<ProjectRole>,
}

// ── Bugs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBugRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_email: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<String>,
    pub project_id: String,
}

impl CreateBugRequest {
    pub fn new(project_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: None,
            status: None,
            source: None,
            reporter_email: None,
            screenshots: Vec::new(),
            project_id: project_id.into(),
        }
    }
}

/// Partial update. Status has its own endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBugRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshots: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateBugStatusRequest {
    pub status: Status,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BugsResponse {
    pub bugs: Vec<Bug>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BugResponse {
    pub bug: Bug,
}

// ── Members ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AddMemberRequest {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
}

/// The server either attached an existing account (`member`) or emailed an
/// invitation (`invitation`). Which one happened is only knowable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddMemberResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub member: Option<ProjectMember>,
    #[serde(default)]
    pub invitation: Option<Invitation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateMemberRoleRequest {
    pub role: MemberRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MembersResponse {
    pub members: Vec<ProjectMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberResponse {
    pub member: ProjectMember,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestAccessRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestsResponse {
    pub access_requests: Vec<AccessRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessRequestResponse {
    pub request: AccessRequest,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApproveAccessRequest {
    pub role: Option<MemberRole>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RejectAccessRequest {
    pub note: Option<String>,
}

// ── Contract ──────────────────────────────────────────────────────────

/// Every remote operation the stores perform.
///
/// Implementations own authentication transport: attaching the bearer
/// token, and handling 401 globally so callers only ever see
/// [`ClientError::Unauthorized`] as an ordinary failure.
#[async_trait]
pub trait BugTrackerApi: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> ApiResult<AuthResponse>;
    async fn signup(&self, req: &SignupRequest) -> ApiResult<AuthResponse>;
    /// Best-effort. Local token state is dropped whatever the outcome.
    async fn logout(&self) -> ApiResult<()>;
    async fn current_user(&self) -> ApiResult<User>;
    async fn update_profile(&self, req: &UpdateProfileRequest) -> ApiResult<User>;

    async fn my_projects(&self) -> ApiResult<Vec<Project>>;
    async fn public_projects(&self) -> ApiResult<Vec<Project>>;
    async fn project_by_slug(&self, slug: &str) -> ApiResult<ProjectResponse>;
    async fn create_project(&self, req: &CreateProjectRequest) -> ApiResult<Project>;
    async fn update_project(&self, project_id: &str, req: &UpdateProjectRequest)
    -> ApiResult<Project>;
    async fn delete_project(&self, project_id: &str) -> ApiResult<()>;

    async fn bugs_by_project(&self, project_id: &str) -> ApiResult<Vec<Bug>>;
    async fn bug(&self, bug_id: &str) -> ApiResult<Bug>;
    async fn create_bug(&self, req: &CreateBugRequest) -> ApiResult<Bug>;
    async fn update_bug(&self, bug_id: &str, req: &UpdateBugRequest) -> ApiResult<Bug>;
    async fn update_bug_status(&self, bug_id: &str, status: Status) -> ApiResult<Bug>;
    async fn delete_bug(&self, bug_id: &str) -> ApiResult<()>;

    async fn project_members(&self, project_id: &str) -> ApiResult<Vec<ProjectMember>>;
    async fn add_member(&self, project_id: &str, req: &AddMemberRequest)
    -> ApiResult<AddMemberResponse>;
    async fn update_member_role(
        &self,
        project_id: &str,
        member_id: &str,
        role: MemberRole,
    ) -> ApiResult<ProjectMember>;
    async fn remove_member(&self, project_id: &str, member_id: &str) -> ApiResult<()>;

    async fn request_access(&self, project_id: &str, message: Option<&str>)
    -> ApiResult<AccessRequest>;
    async fn access_requests(&self, project_id: &str) -> ApiResult<Vec<AccessRequest>>;
    async fn approve_access_request(
        &self,
        request_id: &str,
        role: Option<MemberRole>,
    ) -> ApiResult<ProjectMember>;
    async fn reject_access_request(&self, request_id: &str, note: Option<&str>) -> ApiResult<()>;
}
