use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub slug: String,
    pub is_public: bool,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bug_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_bug_count: Option<u32>,
}

/// Ordered from least to most urgent, so `Priority::Low < Priority::Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Workflow position of a bug. Any status may be set from any other;
/// there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Triage,
    InProgress,
    CodeReview,
    QaTesting,
    Deployed,
}

impl Status {
    /// Board column order.
    pub const ALL: [Status; 5] = [
        Self::Triage,
        Self::InProgress,
        Self::CodeReview,
        Self::QaTesting,
        Self::Deployed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Triage => "TRIAGE",
            Self::InProgress => "IN_PROGRESS",
            Self::CodeReview => "CODE_REVIEW",
            Self::QaTesting => "QA_TESTING",
            Self::Deployed => "DEPLOYED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Triage => "Triage",
            Self::InProgress => "In Progress",
            Self::CodeReview => "Code Review",
            Self::QaTesting => "QA Testing",
            Self::Deployed => "Deployed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "TRIAGE" => Ok(Self::Triage),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "CODE_REVIEW" => Ok(Self::CodeReview),
            "QA_TESTING" => Ok(Self::QaTesting),
            "DEPLOYED" => Ok(Self::Deployed),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// Where a bug report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    CustomerReport,
    InternalQa,
    AutomatedTest,
    ProductionAlert,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerReport => "CUSTOMER_REPORT",
            Self::InternalQa => "INTERNAL_QA",
            Self::AutomatedTest => "AUTOMATED_TEST",
            Self::ProductionAlert => "PRODUCTION_ALERT",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CustomerReport => "Customer Report",
            Self::InternalQa => "Internal QA",
            Self::AutomatedTest => "Automated Test",
            Self::ProductionAlert => "Production Alert",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "CUSTOMER_REPORT" => Ok(Self::CustomerReport),
            "INTERNAL_QA" => Ok(Self::InternalQa),
            "AUTOMATED_TEST" => Ok(Self::AutomatedTest),
            "PRODUCTION_ALERT" => Ok(Self::ProductionAlert),
            _ => Err(format!("Invalid source: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bug {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: Priority,
    pub status: Status,
    pub source: Source,
    #[serde(default)]
    pub reporter_email: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    pub project_id: String,
    #[serde(default)]
    pub reporter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Viewer,
    Member,
    Admin,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "VIEWER",
            Self::Member => "MEMBER",
            Self::Admin => "ADMIN",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Viewer => "Can view bugs only",
            Self::Member => "Can view and create bugs",
            Self::Admin => "Can manage bugs and members",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VIEWER" => Ok(Self::Viewer),
            "MEMBER" => Ok(Self::Member),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub role: MemberRole,
    #[serde(default)]
    pub invited_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub status: RequestStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deferred membership: the server emailed an invite because no account
/// exists for the address yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
}

/// Collections the stores cache are keyed by this.
pub trait Entity {
    fn id(&self) -> &str;
}

impl Entity for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Bug {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for ProjectMember {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for AccessRequest {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Replace the entry sharing `item`'s id, or append it. Never leaves two
/// entries with the same id behind.
pub fn upsert<T: Entity>(items: &mut Vec<T>, item: T) {
    let mut slots = items.iter().enumerate().filter(|(_, e)| e.id() == item.id());
    match slots.next().map(|(i, _)| i) {
        Some(first) => {
            let extra: Vec<usize> = slots.map(|(i, _)| i).collect();
            for i in extra.into_iter().rev() {
                items.remove(i);
            }
            items[first] = item;
        }
        None => items.push(item),
    }
}

/// Drop every entry with the given id. Returns whether anything was removed.
pub fn remove_by_id<T: Entity>(items: &mut Vec<T>, id: &str) -> bool {
    let before = items.len();
    items.retain(|e| e.id() != id);
    items.len() != before
}

/// Collapse duplicate ids from a server listing, keeping the last occurrence
/// in the position of the first.
pub fn dedup_by_id<T: Entity>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        upsert(&mut out, item);
    }
    out
}
