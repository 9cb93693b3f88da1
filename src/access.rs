//! Role resolution and permission gates.
//!
//! These are pure functions over read-only snapshots: the caller passes the
//! project and the membership list it already holds instead of this module
//! reaching into another store.
//!
//! | Role     | Drag / create bugs | Manage members, review requests | Delete bugs, edit project |
//! |----------|--------------------|---------------------------------|---------------------------|
//! | `Owner`  | yes                | yes                             | yes                       |
//! | `Admin`  | yes                | yes                             | no                        |
//! | `Member` | yes                | no                              | no                        |
//! | `Viewer` | no                 | no                              | no                        |

use serde::{Deserialize, Serialize};

use crate::models::{MemberRole, Project, ProjectMember};

/// A user's effective standing in one project. `Owner` is not a membership
/// role; it comes from `Project::owner_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MemberRole> for ProjectRole {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Viewer => Self::Viewer,
            MemberRole::Member => Self::Member,
            MemberRole::Admin => Self::Admin,
        }
    }
}

/// Owner if the user owns the project, else their membership role in it.
pub fn resolve_role(
    project: &Project,
    user_id: &str,
    members: &[ProjectMember],
) -> Option<ProjectRole> {
    if project.owner_id == user_id {
        return Some(ProjectRole::Owner);
    }
    members
        .iter()
        .find(|m| m.project_id == project.id && m.user_id == user_id)
        .map(|m| m.role.into())
}

/// Whether the user may see the project at all.
pub fn has_access(project: &Project, user_id: &str, members: &[ProjectMember]) -> bool {
    project.is_public || resolve_role(project, user_id, members).is_some()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub can_drag_bugs: bool,
    pub can_create_bugs: bool,
    pub can_manage_members: bool,
    pub can_review_requests: bool,
    pub can_delete_bugs: bool,
    pub can_edit_project: bool,
}

impl Permissions {
    pub fn for_role(role: Option<ProjectRole>) -> Self {
        let Some(role) = role else {
            return Self::default();
        };
        let contributor = matches!(
            role,
            ProjectRole::Owner | ProjectRole::Admin | ProjectRole::Member
        );
        let manager = matches!(role, ProjectRole::Owner | ProjectRole::Admin);
        let owner = role == ProjectRole::Owner;
        Self {
            can_drag_bugs: contributor,
            can_create_bugs: contributor,
            can_manage_members: manager,
            can_review_requests: manager,
            can_delete_bugs: owner,
            can_edit_project: owner,
        }
    }

    pub fn resolve(project: &Project, user_id: &str, members: &[ProjectMember]) -> Self {
        Self::for_role(resolve_role(project, user_id, members))
    }
}
