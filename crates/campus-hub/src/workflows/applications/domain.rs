use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(format!("app-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for any campus user (student, faculty member, administrator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Campus roles as asserted by the upstream authentication gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Faculty,
    Hod,
    Dean,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Faculty => "FACULTY",
            Role::Hod => "HOD",
            Role::Dean => "DEAN",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Some(Role::Student),
            "FACULTY" => Some(Role::Faculty),
            "HOD" => Some(Role::Hod),
            "DEAN" => Some(Role::Dean),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verified identity of whoever is calling into the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
    pub department: Option<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(user_id),
            role,
            department: None,
        }
    }

    pub fn in_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

/// Categories of request a student can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationKind {
    Leave,
    Certificate,
    General,
}

impl ApplicationKind {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationKind::Leave => "LEAVE",
            ApplicationKind::Certificate => "CERTIFICATE",
            ApplicationKind::General => "GENERAL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LEAVE" => Some(ApplicationKind::Leave),
            "CERTIFICATE" => Some(ApplicationKind::Certificate),
            "GENERAL" => Some(ApplicationKind::General),
            _ => None,
        }
    }
}

/// Raw body of `POST /api/applications`; validated by the intake guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateApplicationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Validated request content, one shape per [`ApplicationKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApplicationPayload {
    Leave(LeaveDetails),
    Certificate(CertificateDetails),
    General(GeneralDetails),
}

impl ApplicationPayload {
    pub fn kind(&self) -> ApplicationKind {
        match self {
            ApplicationPayload::Leave(_) => ApplicationKind::Leave,
            ApplicationPayload::Certificate(_) => ApplicationKind::Certificate,
            ApplicationPayload::General(_) => ApplicationKind::General,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeaveDetails {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CertificateDetails {
    pub certificate: String,
    pub purpose: String,
    #[serde(default = "default_copies")]
    pub copies: u8,
}

fn default_copies() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneralDetails {
    pub subject: String,
    pub description: String,
}

/// Reviewer action requested through `PATCH /api/applications/:id/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    ApproveForward,
    Reject,
    Escalate,
}

impl ReviewDecision {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewDecision::ApproveForward => "APPROVE_FORWARD",
            ReviewDecision::Reject => "REJECT",
            ReviewDecision::Escalate => "ESCALATE",
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

/// What a comment entry records besides review decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentAction {
    ApproveForward,
    Reject,
    Escalate,
    Withdraw,
}

impl From<ReviewDecision> for CommentAction {
    fn from(value: ReviewDecision) -> Self {
        match value {
            ReviewDecision::ApproveForward => CommentAction::ApproveForward,
            ReviewDecision::Reject => CommentAction::Reject,
            ReviewDecision::Escalate => CommentAction::Escalate,
        }
    }
}

/// Append-only audit entry attached to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerComment {
    pub reviewer_id: UserId,
    pub reviewer_role: Role,
    pub action: CommentAction,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
