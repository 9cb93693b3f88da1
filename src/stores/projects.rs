use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::StoreCell;
use crate::access::{Permissions, ProjectRole};
use crate::api::{BugTrackerApi, CreateProjectRequest, UpdateProjectRequest};
use crate::models::{Project, ProjectMember, dedup_by_id, remove_by_id, upsert};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectsState {
    /// Owned and shared projects of the signed-in user.
    pub projects: Vec<Project>,
    pub public_projects: Vec<Project>,
    pub current_project: Option<Project>,
    /// Caller's role in `current_project`, as reported by the server.
    pub current_role: Option<ProjectRole>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ProjectsStore {
    api: Arc<dyn BugTrackerApi>,
    cell: StoreCell<ProjectsState>,
}

impl ProjectsStore {
    pub fn new(api: Arc<dyn BugTrackerApi>) -> Self {
        Self {
            api,
            cell: StoreCell::new(ProjectsState::default()),
        }
    }

    pub fn snapshot(&self) -> ProjectsState {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProjectsState> {
        self.cell.subscribe()
    }

    pub async fn fetch_my_projects(&self) -> bool {
        self.cell.begin();
        match self.api.my_projects().await {
            Ok(projects) => {
                debug!(count = projects.len(), "fetched projects");
                self.cell.update(|s| {
                    s.projects = dedup_by_id(projects);
                    s.is_loading = false;
                });
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch projects");
                self.cell.fail(e.user_message());
                false
            }
        }
    }

    pub async fn fetch_public_projects(&self) -> bool {
        self.cell.begin();
        match self.api.public_projects().await {
            Ok(projects) => {
                debug!(count = projects.len(), "fetched public projects");
                self.cell.update(|s| {
                    s.public_projects = dedup_by_id(projects);
                    s.is_loading = false;
                });
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch public projects");
                self.cell.fail(e.user_message());
                false
            }
        }
    }

    /// Load one project and make it current. On failure the current slot is
    /// emptied rather than left pointing at a previous project.
    pub async fn fetch_project_by_slug(&self, slug: &str) -> Option<Project> {
        self.cell.begin();
        match self.api.project_by_slug(slug).await {
            Ok(resp) => {
                let project = resp.project;
                self.cell.update(|s| {
                    s.current_project = Some(project.clone());
                    s.current_role = resp.user_role;
                    s.is_loading = false;
                });
                Some(project)
            }
            Err(e) => {
                warn!(slug, error = %e, "failed to fetch project");
                self.cell.update(|s| {
                    s.current_project = None;
                    s.current_role = None;
                    s.is_loading = false;
                    s.error = Some(e.user_message());
                });
                None
            }
        }
    }

    pub async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Option<Project> {
        self.cell.begin();
        let req = CreateProjectRequest {
            name: name.to_string(),
            description: description.map(str::to_string),
            is_public,
        };
        match self.api.create_project(&req).await {
            Ok(project) => {
                debug!(id = %project.id, slug = %project.slug, "project created");
                self.cell.update(|s| {
                    upsert(&mut s.projects, project.clone());
                    if project.is_public {
                        upsert(&mut s.public_projects, project.clone());
                    }
                    s.is_loading = false;
                });
                Some(project)
            }
            Err(e) => {
                warn!(error = %e, "failed to create project");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    pub async fn update_project(
        &self,
        project_id: &str,
        req: UpdateProjectRequest,
    ) -> Option<Project> {
        self.cell.begin();
        match self.api.update_project(project_id, &req).await {
            Ok(project) => {
                self.cell.update(|s| {
                    upsert(&mut s.projects, project.clone());
                    if project.is_public {
                        upsert(&mut s.public_projects, project.clone());
                    } else {
                        remove_by_id(&mut s.public_projects, &project.id);
                    }
                    if s.current_project.as_ref().is_some_and(|c| c.id == project.id) {
                        s.current_project = Some(project.clone());
                    }
                    s.is_loading = false;
                });
                Some(project)
            }
            Err(e) => {
                warn!(project_id, error = %e, "failed to update project");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    pub async fn delete_project(&self, project_id: &str) -> bool {
        self.cell.begin();
        match self.api.delete_project(project_id).await {
            Ok(()) => {
                self.cell.update(|s| {
                    remove_by_id(&mut s.projects, project_id);
                    remove_by_id(&mut s.public_projects, project_id);
                    if s.current_project.as_ref().is_some_and(|c| c.id == project_id) {
                        s.current_project = None;
                        s.current_role = None;
                    }
                    s.is_loading = false;
                });
                true
            }
            Err(e) => {
                warn!(project_id, error = %e, "failed to delete project");
                self.cell.fail(e.user_message());
                false
            }
        }
    }

    /// Switch the current project without a fetch. The cached role is kept
    /// only if the project does not change.
    pub fn set_current_project(&self, project: Option<Project>) {
        self.cell.update(|s| {
            let same = match (&s.current_project, &project) {
                (Some(a), Some(b)) => a.id == b.id,
                _ => false,
            };
            if !same {
                s.current_role = None;
            }
            s.current_project = project;
        });
    }

    /// Cache lookup across both lists.
    pub fn project_by_slug(&self, slug: &str) -> Option<Project> {
        self.cell.read(|s| {
            s.projects
                .iter()
                .chain(s.public_projects.iter())
                .chain(s.current_project.iter())
                .find(|p| p.slug == slug)
                .cloned()
        })
    }

    /// Projects the user owns, followed by those they are a member of.
    /// `members` is a snapshot the caller took from the members store.
    pub fn accessible_projects(&self, user_id: &str, members: &[ProjectMember]) -> Vec<Project> {
        self.cell.read(|s| {
            let owned = s.projects.iter().filter(|p| p.owner_id == user_id);
            let shared = s.projects.iter().filter(|p| {
                p.owner_id != user_id
                    && members
                        .iter()
                        .any(|m| m.project_id == p.id && m.user_id == user_id)
            });
            owned.chain(shared).cloned().collect()
        })
    }

    pub fn current_permissions(&self) -> Permissions {
        self.cell.read(|s| Permissions::for_role(s.current_role))
    }

    pub fn clear_error(&self) {
        self.cell.clear_error();
    }
}
