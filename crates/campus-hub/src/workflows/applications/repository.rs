use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, ApplicationKind, ApplicationPayload, Caller, ReviewerComment, Role, UserId,
};
use super::policy::responsible_role;
use super::state::{ApplicationState, ApplicationStatus, WorkflowLevel};

/// Stored application: request content, chain position, and audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub applicant_id: UserId,
    pub payload: ApplicationPayload,
    pub state: ApplicationState,
    pub mentor_id: UserId,
    pub department: Option<String>,
    pub reviewer_comments: Vec<ReviewerComment>,
    pub withdrawn: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn kind(&self) -> ApplicationKind {
        self.payload.kind()
    }

    pub fn status(&self) -> ApplicationStatus {
        self.state.status()
    }

    pub fn workflow_level(&self) -> WorkflowLevel {
        self.state.workflow_level()
    }

    pub fn view(&self) -> ApplicationView {
        ApplicationView {
            id: self.id.clone(),
            applicant_id: self.applicant_id.clone(),
            kind: self.kind(),
            payload: self.payload.clone(),
            status: self.status(),
            workflow_level: self.workflow_level(),
            awaiting_role: responsible_role(self.state),
            mentor_id: self.mentor_id.clone(),
            department: self.department.clone(),
            reviewer_comments: self.reviewer_comments.clone(),
            withdrawn: self.withdrawn,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// JSON shape returned by the REST endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub applicant_id: UserId,
    #[serde(rename = "type")]
    pub kind: ApplicationKind,
    pub payload: ApplicationPayload,
    pub status: ApplicationStatus,
    pub workflow_level: WorkflowLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_role: Option<Role>,
    pub mentor_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub reviewer_comments: Vec<ReviewerComment>,
    pub withdrawn: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter over stored applications. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationQuery {
    pub applicant_id: Option<UserId>,
    /// Role that currently owns the next move.
    pub awaiting_role: Option<Role>,
    pub mentor_id: Option<UserId>,
    /// Only enforced against records that carry a department.
    pub department: Option<String>,
    pub status: Option<ApplicationStatus>,
}

impl ApplicationQuery {
    /// Everything `caller` is allowed to see.
    pub fn visible_to(caller: &Caller) -> Self {
        match caller.role {
            Role::Student => Self {
                applicant_id: Some(caller.user_id.clone()),
                ..Self::default()
            },
            Role::Faculty => Self {
                awaiting_role: Some(Role::Faculty),
                mentor_id: Some(caller.user_id.clone()),
                ..Self::default()
            },
            Role::Hod => Self {
                awaiting_role: Some(Role::Hod),
                department: caller.department.clone(),
                ..Self::default()
            },
            Role::Dean => Self {
                awaiting_role: Some(Role::Dean),
                ..Self::default()
            },
            Role::Admin => Self::default(),
        }
    }

    pub fn with_status(mut self, status: Option<ApplicationStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        if let Some(applicant_id) = &self.applicant_id {
            if &record.applicant_id != applicant_id {
                return false;
            }
        }
        if let Some(role) = self.awaiting_role {
            if responsible_role(record.state) != Some(role) {
                return false;
            }
        }
        if let Some(mentor_id) = &self.mentor_id {
            if &record.mentor_id != mentor_id {
                return false;
            }
        }
        if let (Some(wanted), Some(actual)) = (&self.department, &record.department) {
            if !wanted.eq_ignore_ascii_case(actual) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status() != status {
                return false;
            }
        }
        true
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    /// Matching records, most recently updated first.
    fn query(&self, query: &ApplicationQuery) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    /// Replace the stored record only while its state still equals `expected`.
    fn compare_and_swap(
        &self,
        expected: ApplicationState,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed since it was read (now {current})")]
    StaleState { current: ApplicationStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Newest activity first; ties fall back to creation time, then id.
pub fn sort_by_recent_activity(records: &mut [ApplicationRecord]) {
    records.sort_by(|left, right| {
        right
            .updated_at
            .cmp(&left.updated_at)
            .then_with(|| right.created_at.cmp(&left.created_at))
            .then_with(|| left.id.cmp(&right.id))
    });
}

/// Process-local store; the conditional update holds the lock for the whole
/// compare and write.
#[derive(Debug, Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl InMemoryApplicationRepository {
    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ApplicationId, ApplicationRecord>>, RepositoryError> {
        self.records.lock().map_err(|_| {
            RepositoryError::Unavailable("application store lock poisoned".to_string())
        })
    }

    pub fn len(&self) -> usize {
        self.lock().map(|guard| guard.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn query(&self, query: &ApplicationQuery) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.lock()?;
        let mut matches: Vec<ApplicationRecord> = guard
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        drop(guard);
        sort_by_recent_activity(&mut matches);
        Ok(matches)
    }

    fn compare_and_swap(
        &self,
        expected: ApplicationState,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let current = guard.get_mut(&record.id).ok_or(RepositoryError::NotFound)?;
        if current.state != expected {
            return Err(RepositoryError::StaleState {
                current: current.status(),
            });
        }
        *current = record.clone();
        Ok(record)
    }
}
