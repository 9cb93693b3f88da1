//! Bugs of the active project, including the optimistic status path.
//!
//! Only `update_bug_status` is optimistic. Board moves happen while the
//! user is dragging, so the cache is rewritten before the request is sent
//! and restored from a whole-list snapshot if it fails. Every other
//! mutation waits for the server and reconciles with its response.
//!
//! Concurrent status changes to the same bug are not serialized: whichever
//! response arrives last is what the cache shows.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::StoreCell;
use super::optimistic::apply_optimistic;
use crate::api::{BugTrackerApi, CreateBugRequest, UpdateBugRequest};
use crate::board::Board;
use crate::errors::ClientError;
use crate::models::{Bug, Status, dedup_by_id, remove_by_id, upsert};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BugsState {
    pub bugs: Vec<Bug>,
    /// Project whose bugs `bugs` holds, set when a fetch starts.
    pub active_project_id: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

fn bugs_of(state: &mut BugsState) -> &mut Vec<Bug> {
    &mut state.bugs
}

fn active_project(state: &BugsState) -> Option<String> {
    state.active_project_id.clone()
}

#[derive(Clone)]
pub struct BugsStore {
    api: Arc<dyn BugTrackerApi>,
    cell: StoreCell<BugsState>,
}

impl BugsStore {
    pub fn new(api: Arc<dyn BugTrackerApi>) -> Self {
        Self {
            api,
            cell: StoreCell::new(BugsState::default()),
        }
    }

    pub fn snapshot(&self) -> BugsState {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BugsState> {
        self.cell.subscribe()
    }

    /// Replace the cached list with the project's bugs. A response for a
    /// project that is no longer active is dropped.
    pub async fn fetch_bugs_by_project(&self, project_id: &str) -> bool {
        self.cell.update(|s| {
            s.active_project_id = Some(project_id.to_string());
            s.is_loading = true;
        });

        let result = self.api.bugs_by_project(project_id).await;
        let is_active = |s: &BugsState| s.active_project_id.as_deref() == Some(project_id);

        match result {
            Ok(bugs) => {
                self.cell.update(|s| {
                    if is_active(s) {
                        debug!(project_id, count = bugs.len(), "fetched bugs");
                        s.bugs = dedup_by_id(bugs);
                        s.is_loading = false;
                    } else {
                        debug!(project_id, "dropping bugs for inactive project");
                    }
                });
                true
            }
            Err(e) => {
                warn!(project_id, error = %e, "failed to fetch bugs");
                self.cell.update(|s| {
                    if is_active(s) {
                        s.is_loading = false;
                        s.error = Some(e.user_message());
                    }
                });
                false
            }
        }
    }

    /// Fetch one bug and upsert it when it belongs to the active project.
    pub async fn fetch_bug(&self, bug_id: &str) -> Option<Bug> {
        self.cell.begin();
        match self.api.bug(bug_id).await {
            Ok(bug) => {
                self.cell.update(|s| {
                    if s
                        .active_project_id
                        .as_deref()
                        .is_none_or(|p| p == bug.project_id)
                    {
                        upsert(&mut s.bugs, bug.clone());
                    }
                    s.is_loading = false;
                });
                Some(bug)
            }
            Err(e) => {
                warn!(bug_id, error = %e, "failed to fetch bug");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    pub async fn create_bug(&self, req: CreateBugRequest) -> Option<Bug> {
        self.cell.begin();
        match self.api.create_bug(&req).await {
            Ok(bug) => {
                debug!(id = %bug.id, "bug created");
                self.cell.update(|s| {
                    upsert(&mut s.bugs, bug.clone());
                    s.is_loading = false;
                });
                Some(bug)
            }
            Err(e) => {
                warn!(error = %e, "failed to create bug");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    pub async fn update_bug(&self, bug_id: &str, req: UpdateBugRequest) -> Option<Bug> {
        self.cell.begin();
        match self.api.update_bug(bug_id, &req).await {
            Ok(bug) => {
                self.cell.update(|s| {
                    upsert(&mut s.bugs, bug.clone());
                    s.is_loading = false;
                });
                Some(bug)
            }
            Err(e) => {
                warn!(bug_id, error = %e, "failed to update bug");
                self.cell.fail(e.user_message());
                None
            }
        }
    }

    /// Move a bug to `status` immediately, then confirm with the server.
    ///
    /// On failure the bug list is restored to exactly what it was before the
    /// move and the error is recorded. If another project was loaded while
    /// the request was in flight, its list is kept as is. A bug that is not
    /// in the cache is rejected without a request.
    pub async fn update_bug_status(&self, bug_id: &str, status: Status) -> bool {
        let cached = self.cell.read(|s| s.bugs.iter().any(|b| b.id == bug_id));
        if !cached {
            let err = ClientError::NotCached {
                kind: "Bug",
                id: bug_id.to_string(),
            };
            warn!(bug_id, "status change for a bug that is not loaded");
            self.cell.update(|s| s.error = Some(err.user_message()));
            return false;
        }

        let result = apply_optimistic(
            &self.cell,
            bugs_of,
            active_project,
            |bugs: &mut Vec<Bug>| {
                if let Some(bug) = bugs.iter_mut().find(|b| b.id == bug_id) {
                    bug.status = status;
                    bug.updated_at = Utc::now();
                }
            },
            self.api.update_bug_status(bug_id, status),
            |s: &mut BugsState, confirmed: &Bug| {
                if let Some(slot) = s.bugs.iter_mut().find(|b| b.id == confirmed.id) {
                    *slot = confirmed.clone();
                }
            },
            |s: &mut BugsState, e: &ClientError| {
                s.error = Some(e.user_message());
            },
        )
        .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(bug_id, %status, error = %e, "status change rejected, board restored");
                false
            }
        }
    }

    pub async fn delete_bug(&self, bug_id: &str) -> bool {
        self.cell.begin();
        match self.api.delete_bug(bug_id).await {
            Ok(()) => {
                self.cell.update(|s| {
                    remove_by_id(&mut s.bugs, bug_id);
                    s.is_loading = false;
                });
                true
            }
            Err(e) => {
                warn!(bug_id, error = %e, "failed to delete bug");
                self.cell.fail(e.user_message());
                false
            }
        }
    }

    pub fn bugs_by_status(&self, status: Status) -> Vec<Bug> {
        self.cell.read(|s| {
            s.bugs
                .iter()
                .filter(|b| b.status == status)
                .cloned()
                .collect()
        })
    }

    pub fn board(&self, filter: Option<&str>) -> Board {
        self.cell.read(|s| Board::build(&s.bugs, filter))
    }

    pub fn clear_error(&self) {
        self.cell.clear_error();
    }
}
