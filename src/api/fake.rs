//! In-memory `BugTrackerApi` for store tests.
//!
//! Behaves like a tiny backend: ids are assigned sequentially, lists are
//! served from the same tables mutations write to. Any operation can be made
//! to fail with `fail_on`, and status updates can be held open with
//! `hold_status` to observe the in-flight state.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::*;
use crate::models::fixtures::ts;
use crate::models::{Invitation, RequestStatus};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    current_user: Option<User>,
    projects: Vec<Project>,
    bugs: Vec<Bug>,
    members: Vec<ProjectMember>,
    requests: Vec<AccessRequest>,
    next_id: u32,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    tables: Mutex<Tables>,
    failures: Mutex<HashMap<&'static str, ClientError>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    status_gates: Mutex<HashMap<Status, Arc<Notify>>>,
    op_gates: Mutex<HashMap<&'static str, Arc<Notify>>>,
    tokens: Mutex<HashSet<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.tables.lock().unwrap().users.push(user);
        self
    }

    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        self.tables.lock().unwrap().projects.extend(projects);
        self
    }

    pub fn with_bugs(self, bugs: Vec<Bug>) -> Self {
        self.tables.lock().unwrap().bugs.extend(bugs);
        self
    }

    pub fn with_members(self, members: Vec<ProjectMember>) -> Self {
        self.tables.lock().unwrap().members.extend(members);
        self
    }

    pub fn with_requests(self, requests: Vec<AccessRequest>) -> Self {
        self.tables.lock().unwrap().requests.extend(requests);
        self
    }

    /// Server-side session already valid for this user.
    pub fn signed_in_as(self, user: User) -> Self {
        {
            let mut t = self.tables.lock().unwrap();
            t.users.push(user.clone());
            t.current_user = Some(user);
        }
        self
    }

    /// Make every later call to `op` fail with `err`.
    pub fn fail_on(&self, op: &'static str, err: ClientError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    pub fn succeed_on(&self, op: &'static str) {
        self.failures.lock().unwrap().remove(op);
    }

    pub fn calls(&self, op: &'static str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// Status updates to `status` wait until the returned handle is notified.
    pub fn hold_status(&self, status: Status) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.status_gates
            .lock()
            .unwrap()
            .insert(status, Arc::clone(&gate));
        gate
    }

    /// Hold the next call to `op` (only the next one) until notified.
    pub fn hold_next(&self, op: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.op_gates.lock().unwrap().insert(op, Arc::clone(&gate));
        gate
    }

    async fn wait_gate(&self, op: &'static str) {
        let gate = self.op_gates.lock().unwrap().remove(op);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    pub fn server_bugs(&self) -> Vec<Bug> {
        self.tables.lock().unwrap().bugs.clone()
    }

    pub fn server_current_user(&self) -> Option<User> {
        self.tables.lock().unwrap().current_user.clone()
    }

    fn enter(&self, op: &'static str) -> ApiResult<()> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        match self.failures.lock().unwrap().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut t = self.tables.lock().unwrap();
        t.next_id += 1;
        format!("{}-{}", prefix, t.next_id)
    }

    fn not_found(what: &str) -> ClientError {
        ClientError::Api {
            status: 404,
            message: format!("{} not found", what),
        }
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

#[async_trait]
impl BugTrackerApi for FakeApi {
    async fn login(&self, req: &LoginRequest) -> ApiResult<AuthResponse> {
        self.enter("login")?;
        let mut t = self.tables.lock().unwrap();
        let user = t
            .users
            .iter()
            .find(|u| u.email == req.email)
            .cloned()
            .ok_or(ClientError::Unauthorized {
                message: "Invalid email or password".into(),
            })?;
        t.current_user = Some(user.clone());
        let token = format!("token-{}", user.id);
        self.tokens.lock().unwrap().insert(token.clone());
        Ok(AuthResponse {
            message: Some("Login successful".into()),
            user,
            token: Some(token),
        })
    }

    async fn signup(&self, req: &SignupRequest) -> ApiResult<AuthResponse> {
        self.enter("signup")?;
        let id = self.next_id("user");
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == req.email) {
            return Err(ClientError::Api {
                status: 409,
                message: "Email already registered".into(),
            });
        }
        let user = User {
            id,
            email: req.email.clone(),
            name: req.name.clone(),
            avatar_url: None,
            created_at: ts(100),
            updated_at: ts(100),
        };
        t.users.push(user.clone());
        t.current_user = Some(user.clone());
        Ok(AuthResponse {
            message: None,
            user,
            token: None,
        })
    }

    async fn logout(&self) -> ApiResult<()> {
        self.enter("logout")?;
        self.tables.lock().unwrap().current_user = None;
        Ok(())
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.enter("current_user")?;
        self.tables
            .lock()
            .unwrap()
            .current_user
            .clone()
            .ok_or(ClientError::Unauthorized {
                message: "Not authenticated".into(),
            })
    }

    async fn update_profile(&self, req: &UpdateProfileRequest) -> ApiResult<User> {
        self.enter("update_profile")?;
        let mut t = self.tables.lock().unwrap();
        let Some(user) = t.current_user.as_mut() else {
            return Err(ClientError::Unauthorized {
                message: "Not authenticated".into(),
            });
        };
        if let Some(name) = &req.name {
            user.name = name.clone();
        }
        if let Some(avatar) = &req.avatar_url {
            user.avatar_url = Some(avatar.clone());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn my_projects(&self) -> ApiResult<Vec<Project>> {
        self.enter("my_projects")?;
        let t = self.tables.lock().unwrap();
        let uid = t.current_user.as_ref().map(|u| u.id.clone()).unwrap_or_default();
        Ok(t.projects
            .iter()
            .filter(|p| {
                p.owner_id == uid
                    || t.members
                        .iter()
                        .any(|m| m.project_id == p.id && m.user_id == uid)
            })
            .cloned()
            .collect())
    }

    async fn public_projects(&self) -> ApiResult<Vec<Project>> {
        self.enter("public_projects")?;
        let t = self.tables.lock().unwrap();
        Ok(t.projects.iter().filter(|p| p.is_public).cloned().collect())
    }

    async fn project_by_slug(&self, slug: &str) -> ApiResult<ProjectResponse> {
        self.enter("project_by_slug")?;
        let t = self.tables.lock().unwrap();
        let project = t
            .projects
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| Self::not_found("Project"))?;
        let uid = t.current_user.as_ref().map(|u| u.id.as_str()).unwrap_or("");
        let user_role = crate::access::resolve_role(&project, uid, &t.members);
        Ok(ProjectResponse { project, user_role })
    }

    async fn create_project(&self, req: &CreateProjectRequest) -> ApiResult<Project> {
        self.enter("create_project")?;
        let id = self.next_id("project");
        let mut t = self.tables.lock().unwrap();
        let owner_id = t
            .current_user
            .as_ref()
            .map(|u| u.id.clone())
            .ok_or(ClientError::Unauthorized {
                message: "Not authenticated".into(),
            })?;
        let project = Project {
            slug: format!("{}-{}", slugify(&req.name), id),
            id,
            name: req.name.clone(),
            description: req.description.clone(),
            is_public: req.is_public,
            owner_id,
            owner: None,
            created_at: ts(200),
            updated_at: ts(200),
            bug_count: Some(0),
            open_bug_count: Some(0),
        };
        t.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: &str,
        req: &UpdateProjectRequest,
    ) -> ApiResult<Project> {
        self.enter("update_project")?;
        let mut t = self.tables.lock().unwrap();
        let project = t
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Self::not_found("Project"))?;
        if let Some(name) = &req.name {
            project.name = name.clone();
        }
        if let Some(desc) = &req.description {
            project.description = Some(desc.clone());
        }
        if let Some(public) = req.is_public {
            project.is_public = public;
        }
        project.updated_at = project.updated_at + Duration::seconds(1);
        Ok(project.clone())
    }

    async fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        self.enter("delete_project")?;
        let mut t = self.tables.lock().unwrap();
        let before = t.projects.len();
        t.projects.retain(|p| p.id != project_id);
        if t.projects.len() == before {
            return Err(Self::not_found("Project"));
        }
        t.bugs.retain(|b| b.project_id != project_id);
        Ok(())
    }

    async fn bugs_by_project(&self, project_id: &str) -> ApiResult<Vec<Bug>> {
        self.wait_gate("bugs_by_project").await;
        self.enter("bugs_by_project")?;
        let t = self.tables.lock().unwrap();
        Ok(t.bugs
            .iter()
            .filter(|b| b.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn bug(&self, bug_id: &str) -> ApiResult<Bug> {
        self.enter("bug")?;
        let t = self.tables.lock().unwrap();
        t.bugs
            .iter()
            .find(|b| b.id == bug_id)
            .cloned()
            .ok_or_else(|| Self::not_found("Bug"))
    }

    async fn create_bug(&self, req: &CreateBugRequest) -> ApiResult<Bug> {
        self.enter("create_bug")?;
        let id = self.next_id("bug");
        let mut t = self.tables.lock().unwrap();
        let reporter_id = t.current_user.as_ref().map(|u| u.id.clone());
        let bug = Bug {
            id,
            title: req.title.clone(),
            description: req.description.clone(),
            priority: req.priority.unwrap_or(Priority::Medium),
            status: req.status.unwrap_or(Status::Triage),
            source: req.source.unwrap_or(Source::InternalQa),
            reporter_email: req.reporter_email.clone(),
            screenshots: req.screenshots.clone(),
            project_id: req.project_id.clone(),
            reporter_id,
            reporter: None,
            created_at: ts(300),
            updated_at: ts(300),
        };
        t.bugs.push(bug.clone());
        Ok(bug)
    }

    async fn update_bug(&self, bug_id: &str, req: &UpdateBugRequest) -> ApiResult<Bug> {
        self.enter("update_bug")?;
        let mut t = self.tables.lock().unwrap();
        let bug = t
            .bugs
            .iter_mut()
            .find(|b| b.id == bug_id)
            .ok_or_else(|| Self::not_found("Bug"))?;
        if let Some(title) = &req.title {
            bug.title = title.clone();
        }
        if let Some(desc) = &req.description {
            bug.description = Some(desc.clone());
        }
        if let Some(priority) = req.priority {
            bug.priority = priority;
        }
        if let Some(source) = req.source {
            bug.source = source;
        }
        if let Some(email) = &req.reporter_email {
            bug.reporter_email = Some(email.clone());
        }
        if let Some(shots) = &req.screenshots {
            bug.screenshots = shots.clone();
        }
        bug.updated_at = bug.updated_at + Duration::seconds(1);
        Ok(bug.clone())
    }

    async fn update_bug_status(&self, bug_id: &str, status: Status) -> ApiResult<Bug> {
        let gate = self.status_gates.lock().unwrap().get(&status).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.enter("update_bug_status")?;
        let mut t = self.tables.lock().unwrap();
        let bug = t
            .bugs
            .iter_mut()
            .find(|b| b.id == bug_id)
            .ok_or_else(|| Self::not_found("Bug"))?;
        bug.status = status;
        bug.updated_at = Utc::now();
        Ok(bug.clone())
    }

    async fn delete_bug(&self, bug_id: &str) -> ApiResult<()> {
        self.enter("delete_bug")?;
        let mut t = self.tables.lock().unwrap();
        let before = t.bugs.len();
        t.bugs.retain(|b| b.id != bug_id);
        if t.bugs.len() == before {
            return Err(Self::not_found("Bug"));
        }
        Ok(())
    }

    async fn project_members(&self, project_id: &str) -> ApiResult<Vec<ProjectMember>> {
        self.enter("project_members")?;
        let t = self.tables.lock().unwrap();
        Ok(t.members
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn add_member(
        &self,
        project_id: &str,
        req: &AddMemberRequest,
    ) -> ApiResult<AddMemberResponse> {
        self.enter("add_member")?;
        let id = self.next_id("member");
        let mut t = self.tables.lock().unwrap();
        let role = req.role.unwrap_or(MemberRole::Member);
        let existing = t.users.iter().find(|u| u.email == req.email).cloned();
        match existing {
            Some(user) => {
                if t
                    .members
                    .iter()
                    .any(|m| m.project_id == project_id && m.user_id == user.id)
                {
                    return Err(ClientError::Api {
                        status: 409,
                        message: "User is already a member of this project".into(),
                    });
                }
                let member = ProjectMember {
                    id,
                    project_id: project_id.to_string(),
                    user_id: user.id.clone(),
                    user: Some(user),
                    role,
                    invited_by: t.current_user.as_ref().map(|u| u.id.clone()),
                    created_at: ts(400),
                    updated_at: ts(400),
                };
                t.members.push(member.clone());
                Ok(AddMemberResponse {
                    message: Some("Member added".into()),
                    member: Some(member),
                    invitation: None,
                })
            }
            None => Ok(AddMemberResponse {
                message: Some("Invitation sent".into()),
                member: None,
                invitation: Some(Invitation {
                    id: format!("inv-{}", id),
                    email: req.email.clone(),
                    role: role.as_str().to_string(),
                    status: "PENDING".into(),
                    expires_at: ts(86_400),
                }),
            }),
        }
    }

    async fn update_member_role(
        &self,
        project_id: &str,
        member_id: &str,
        role: MemberRole,
    ) -> ApiResult<ProjectMember> {
        self.enter("update_member_role")?;
        let mut t = self.tables.lock().unwrap();
        let member = t
            .members
            .iter_mut()
            .find(|m| m.id == member_id && m.project_id == project_id)
            .ok_or_else(|| Self::not_found("Member"))?;
        member.role = role;
        member.updated_at = member.updated_at + Duration::seconds(1);
        Ok(member.clone())
    }

    async fn remove_member(&self, project_id: &str, member_id: &str) -> ApiResult<()> {
        self.enter("remove_member")?;
        let mut t = self.tables.lock().unwrap();
        let before = t.members.len();
        t.members
            .retain(|m| !(m.id == member_id && m.project_id == project_id));
        if t.members.len() == before {
            return Err(Self::not_found("Member"));
        }
        Ok(())
    }

    async fn request_access(
        &self,
        project_id: &str,
        message: Option<&str>,
    ) -> ApiResult<AccessRequest> {
        self.enter("request_access")?;
        let id = self.next_id("request");
        let mut t = self.tables.lock().unwrap();
        let user_id = t
            .current_user
            .as_ref()
            .map(|u| u.id.clone())
            .ok_or(ClientError::Unauthorized {
                message: "Not authenticated".into(),
            })?;
        let request = AccessRequest {
            id,
            project_id: project_id.to_string(),
            user_id,
            user: None,
            status: RequestStatus::Pending,
            message: message.map(str::to_string),
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
            created_at: ts(500),
            updated_at: ts(500),
        };
        t.requests.push(request.clone());
        Ok(request)
    }

    async fn access_requests(&self, project_id: &str) -> ApiResult<Vec<AccessRequest>> {
        self.enter("access_requests")?;
        let t = self.tables.lock().unwrap();
        Ok(t.requests
            .iter()
            .filter(|r| r.project_id == project_id && r.status == RequestStatus::Pending)
            .cloned()
            .collect())
    }

    async fn approve_access_request(
        &self,
        request_id: &str,
        role: Option<MemberRole>,
    ) -> ApiResult<ProjectMember> {
        self.enter("approve_access_request")?;
        let id = self.next_id("member");
        let mut t = self.tables.lock().unwrap();
        let reviewer = t.current_user.as_ref().map(|u| u.id.clone());
        let request = t
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| Self::not_found("Access request"))?;
        request.status = RequestStatus::Approved;
        request.reviewed_by = reviewer.clone();
        let member = ProjectMember {
            id,
            project_id: request.project_id.clone(),
            user_id: request.user_id.clone(),
            user: None,
            role: role.unwrap_or(MemberRole::Viewer),
            invited_by: reviewer,
            created_at: ts(600),
            updated_at: ts(600),
        };
        t.members.push(member.clone());
        Ok(member)
    }

    async fn reject_access_request(&self, request_id: &str, note: Option<&str>) -> ApiResult<()> {
        self.enter("reject_access_request")?;
        let mut t = self.tables.lock().unwrap();
        let reviewer = t.current_user.as_ref().map(|u| u.id.clone());
        let request = t
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| Self::not_found("Access request"))?;
        request.status = RequestStatus::Rejected;
        request.reviewed_by = reviewer;
        request.review_note = note.map(str::to_string);
        Ok(())
    }
}
