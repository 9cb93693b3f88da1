use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::StoreCell;
use crate::api::{AddMemberRequest, BugTrackerApi};
use crate::errors::ClientError;
use crate::models::{
    AccessRequest, Invitation, MemberRole, ProjectMember, RequestStatus, dedup_by_id,
    remove_by_id, upsert,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembersState {
    pub members: Vec<ProjectMember>,
    pub access_requests: Vec<AccessRequest>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// What the server did with an `add_member` call.
#[derive(Debug, Clone, PartialEq)]
pub enum AddMemberOutcome {
    /// The email belonged to an account, which is now a member.
    Member(ProjectMember),
    /// No account yet; an invitation was emailed.
    Invitation(Invitation),
    /// Neither shape came back; only the server's message is known.
    Processed(Option<String>),
}

#[derive(Clone)]
pub struct MembersStore {
    api: Arc<dyn BugTrackerApi>,
    cell: StoreCell<MembersState>,
}

impl MembersStore {
    pub fn new(api: Arc<dyn BugTrackerApi>) -> Self {
        Self {
            api,
            cell: StoreCell::new(MembersState::default()),
        }
    }

    pub fn snapshot(&self) -> MembersState {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MembersState> {
        self.cell.subscribe()
    }

    /// Replace the cached memberships of one project. Other projects'
    /// entries are kept.
    pub async fn fetch_project_members(&self, project_id: &str) -> bool {
        self.cell.begin();
        match self.api.project_members(project_id).await {
            Ok(members) => {
                debug!(project_id, count = members.len(), "fetched members");
                self.cell.update(|s| {
                    s.members.retain(|m| m.project_id != project_id);
                    s.members.extend(dedup_by_id(members));
                    s.is_loading = false;
                });
                true
            }
            Err(e) => {
                warn!(project_id, error = %e, "failed to fetch members");
                self.cell.fail(e.user_message());
                false
            }
        }
    }

    pub async fn fetch_access_requests(&self, project_id: &str) -> bool {
        self.cell.begin();
        match self.api.access_requests(project_id).await {
            Ok(requests) => {
                debug!(project_id, count = requests.len(), "fetched access requests");
                self.cell.update(|s| {
                    s.access_requests.retain(|r| r.project_id != project_id);
                    s.access_requests.extend(dedup_by_id(requests));
                    s.is_loading = false;
                });
                true
            }
            Err(e) => {
                warn!(project_id, error = %e, "failed to fetch access requests");
                self.cell.fail(e.user_message());
                false
            }
        }
    }

    pub async fn add_member(
        &self,
        project_id: &str,
        email: &str,
        role: Option<MemberRole>,
    ) -> Option<AddMemberOutcome> {
        self.cell.begin();
        let req = AddMemberRequest {
            email: email.to_string(),
            role,
        };
        match self.api.add_member(project_id, &req).await {
            Ok(resp) => {
                let outcome = match (resp.member, resp.invitation) {
                    (Some(member), _) => AddMemberOutcome::Member(member),
                    (None, Some(invitation)) => AddMemberOutcome::Invitation(invitation),
                    (None, None) => AddMemberOutcome::Processed(resp.message),
                };
                info!(project_id, email, ?outcome, "add member");
                self.cell.update(|s| {
                    if let AddMemberOutcome::Member(member) = &outcome {
                        upsert(&mut s.members, member.clone());
                    }
                    s.is_loading = false;
                });
                Some(outcome)
            }
            Err(e) => {
                warn!(project_id, email, error = %e, "failed to add member");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    pub async fn update_member_role(
        &self,
        member_id: &str,
        role: MemberRole,
    ) -> Option<ProjectMember> {
        let project_id = self.cached_project_of(member_id)?;
        self.cell.begin();
        match self
            .api
            .update_member_role(&project_id, member_id, role)
            .await
        {
            Ok(member) => {
                self.cell.update(|s| {
                    upsert(&mut s.members, member.clone());
                    s.is_loading = false;
                });
                Some(member)
            }
            Err(e) => {
                warn!(member_id, error = %e, "failed to update member role");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    pub async fn remove_member(&self, member_id: &str) -> bool {
        let Some(project_id) = self.cached_project_of(member_id) else {
            return false;
        };
        self.cell.begin();
        match self.api.remove_member(&project_id, member_id).await {
            Ok(()) => {
                self.cell.update(|s| {
                    remove_by_id(&mut s.members, member_id);
                    s.is_loading = false;
                });
                true
            }
            Err(e) => {
                warn!(member_id, error = %e, "failed to remove member");
                self.cell.fail(e.user_message());
                false
            }
        }
    }

    /// Ask to join a project. The pending request is cached so the caller
    /// can show it.
    pub async fn request_access(
        &self,
        project_id: &str,
        message: Option<&str>,
    ) -> Option<AccessRequest> {
        self.cell.begin();
        match self.api.request_access(project_id, message).await {
            Ok(request) => {
                self.cell.update(|s| {
                    upsert(&mut s.access_requests, request.clone());
                    s.is_loading = false;
                });
                Some(request)
            }
            Err(e) => {
                warn!(project_id, error = %e, "failed to request access");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    /// Dropping the request and adding the membership happen in one store
    /// update, so no observer sees both or neither.
    pub async fn approve_access_request(
        &self,
        request_id: &str,
        role: Option<MemberRole>,
    ) -> Option<ProjectMember> {
        self.cell.begin();
        match self.api.approve_access_request(request_id, role).await {
            Ok(member) => {
                info!(request_id, user_id = %member.user_id, "access request approved");
                self.cell.update(|s| {
                    remove_by_id(&mut s.access_requests, request_id);
                    upsert(&mut s.members, member.clone());
                    s.is_loading = false;
                });
                Some(member)
            }
            Err(e) => {
                warn!(request_id, error = %e, "failed to approve access request");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    pub async fn reject_access_request(&self, request_id: &str, note: Option<&str>) -> bool {
        self.cell.begin();
        match self.api.reject_access_request(request_id, note).await {
            Ok(()) => {
                info!(request_id, "access request rejected");
                self.cell.update(|s| {
                    remove_by_id(&mut s.access_requests, request_id);
                    s.is_loading = false;
                });
                true
            }
            Err(e) => {
                warn!(request_id, error = %e, "failed to reject access request");
                self.cell.fail(e.user_message());
                false
            }
        }
    }

    pub fn pending_requests(&self, project_id: &str) -> Vec<AccessRequest> {
        self.cell.read(|s| {
            s.access_requests
                .iter()
                .filter(|r| r.project_id == project_id && r.status == RequestStatus::Pending)
                .cloned()
                .collect()
        })
    }

    pub fn members_of(&self, project_id: &str) -> Vec<ProjectMember> {
        self.cell.read(|s| {
            s.members
                .iter()
                .filter(|m| m.project_id == project_id)
                .cloned()
                .collect()
        })
    }

    pub fn clear_error(&self) {
        self.cell.clear_error();
    }

    /// Project id of a cached membership. Records the error when missing.
    fn cached_project_of(&self, member_id: &str) -> Option<String> {
        let project_id = self.cell.read(|s| {
            s.members
                .iter()
                .find(|m| m.id == member_id)
                .map(|m| m.project_id.clone())
        });
        if project_id.is_none() {
            let err = ClientError::NotCached {
                kind: "Member",
                id: member_id.to_string(),
            };
            warn!(member_id, "membership is not loaded");
            self.cell.update(|s| s.error = Some(err.user_message()));
        }
        project_id
    }
}
