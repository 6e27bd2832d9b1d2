use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use tracing::{info, warn};

use super::directory::{DirectoryError, StudentDirectory};
use super::domain::{
    ApplicationId, Caller, CommentAction, CreateApplicationRequest, ReviewDecision,
    ReviewerComment, Role, StatusUpdateRequest, UserId,
};
use super::intake::{IntakeGuard, IntakePolicy, IntakeViolation};
use super::notifications::{Notification, NotificationPublisher};
use super::policy::{PolicyViolation, ReviewPolicy};
use super::repository::{
    ApplicationQuery, ApplicationRecord, ApplicationRepository, RepositoryError,
};
use super::state::{ApplicationState, ApplicationStatus, TransitionError};
use crate::config::WorkflowConfig;

const WITHDRAWAL_NOTE: &str = "withdrawn by applicant";

/// Service composing intake validation, the review policy, storage, and notifications.
pub struct ApplicationWorkflowService<R, D, N> {
    intake: Arc<IntakeGuard>,
    policy: ReviewPolicy,
    repository: Arc<R>,
    directory: Arc<D>,
    notifications: Arc<N>,
}

impl<R, D, N> ApplicationWorkflowService<R, D, N>
where
    R: ApplicationRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        directory: Arc<D>,
        notifications: Arc<N>,
        config: &WorkflowConfig,
    ) -> Self {
        let intake = IntakeGuard::with_policy(IntakePolicy {
            require_rejection_comment: config.require_rejection_comment,
            ..IntakePolicy::default()
        });
        Self::with_intake(intake, repository, directory, notifications)
    }

    pub fn with_intake(
        intake: IntakeGuard,
        repository: Arc<R>,
        directory: Arc<D>,
        notifications: Arc<N>,
    ) -> Self {
        Self {
            intake: Arc::new(intake),
            policy: ReviewPolicy,
            repository,
            directory,
            notifications,
        }
    }

    /// Submit a new application on behalf of a student.
    pub fn create(
        &self,
        caller: &Caller,
        request: CreateApplicationRequest,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        if caller.role != Role::Student {
            return Err(ApplicationServiceError::StudentsOnly { role: caller.role });
        }

        let payload = self.intake.payload_from_request(request)?;
        let profile = self.directory.lookup(&caller.user_id)?;
        let assignment = profile.and_then(|profile| {
            let department = profile.department;
            profile.mentor_id.map(|mentor| (mentor, department))
        });
        let Some((mentor_id, department)) = assignment else {
            return Err(ApplicationServiceError::MentorUnassigned(
                caller.user_id.clone(),
            ));
        };

        let now = Utc::now();
        let record = ApplicationRecord {
            id: ApplicationId::generate(),
            applicant_id: caller.user_id.clone(),
            payload,
            state: ApplicationState::Pending,
            mentor_id,
            department: department.or_else(|| caller.department.clone()),
            reviewer_comments: Vec::new(),
            withdrawn: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(record)?;
        info!(
            application_id = %stored.id.0,
            applicant = %stored.applicant_id.0,
            kind = stored.kind().label(),
            "application submitted"
        );

        let mut details = BTreeMap::new();
        details.insert("applicant".to_string(), stored.applicant_id.0.clone());
        details.insert("type".to_string(), stored.kind().label().to_string());
        self.notify(Notification {
            recipient: stored.mentor_id.clone(),
            template: "application_awaiting_review".to_string(),
            application_id: stored.id.clone(),
            details,
        });

        Ok(stored)
    }

    /// Applications visible to the caller, most recently updated first.
    pub fn list(
        &self,
        caller: &Caller,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationRecord>, ApplicationServiceError> {
        let query = ApplicationQuery::visible_to(caller).with_status(status);
        Ok(self.repository.query(&query)?)
    }

    /// Fetch one application; records the caller cannot see read as missing.
    pub fn get(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let record = self.existing(application_id)?;
        let visible = record.applicant_id == caller.user_id
            || ApplicationQuery::visible_to(caller).matches(&record);
        if !visible {
            return Err(ApplicationServiceError::NotFound(application_id.clone()));
        }
        Ok(record)
    }

    /// Apply a reviewer decision and commit it against the state it was read in.
    pub fn update_status(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
        request: StatusUpdateRequest,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let record = self.existing(application_id)?;
        self.policy.authorize(caller, &record)?;
        let next = record.state.apply(request.decision)?;
        let comment = self
            .intake
            .review_comment(request.decision, request.comment.as_deref())?;

        let expected = record.state;
        let now = Utc::now().max(record.updated_at);
        let mut updated = record;
        updated.state = next;
        updated.reviewer_comments.push(ReviewerComment {
            reviewer_id: caller.user_id.clone(),
            reviewer_role: caller.role,
            action: CommentAction::from(request.decision),
            comment: comment.clone(),
            created_at: now,
        });
        updated.version += 1;
        updated.updated_at = now;

        let stored = self
            .repository
            .compare_and_swap(expected, updated)
            .map_err(|err| swap_error(application_id, err))?;

        info!(
            application_id = %stored.id.0,
            reviewer = %caller.user_id.0,
            role = caller.role.label(),
            decision = request.decision.label(),
            status = stored.status().label(),
            workflow_level = stored.workflow_level().label(),
            "application status updated"
        );

        self.notify(decision_notification(&stored, caller, request.decision, &comment));
        Ok(stored)
    }

    /// Withdraw a still-pending application. The record stays for audit.
    pub fn cancel(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let record = self.existing(application_id)?;
        if record.applicant_id != caller.user_id {
            return Err(ApplicationServiceError::NotApplicant);
        }
        if record.state != ApplicationState::Pending {
            return Err(ApplicationServiceError::NotCancellable {
                status: record.status(),
            });
        }

        let now = Utc::now().max(record.updated_at);
        let mut updated = record;
        updated.state = ApplicationState::Rejected;
        updated.withdrawn = true;
        updated.reviewer_comments.push(ReviewerComment {
            reviewer_id: caller.user_id.clone(),
            reviewer_role: caller.role,
            action: CommentAction::Withdraw,
            comment: WITHDRAWAL_NOTE.to_string(),
            created_at: now,
        });
        updated.version += 1;
        updated.updated_at = now;

        let stored = self
            .repository
            .compare_and_swap(ApplicationState::Pending, updated)
            .map_err(|err| swap_error(application_id, err))?;

        info!(
            application_id = %stored.id.0,
            applicant = %stored.applicant_id.0,
            "application withdrawn"
        );
        Ok(stored)
    }

    fn existing(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        self.repository
            .fetch(application_id)?
            .ok_or_else(|| ApplicationServiceError::NotFound(application_id.clone()))
    }

    fn notify(&self, notification: Notification) {
        let application_id = notification.application_id.clone();
        let template = notification.template.clone();
        if let Err(err) = self.notifications.publish(notification) {
            warn!(
                application_id = %application_id.0,
                %template,
                error = %err,
                "notification dispatch failed; transition kept"
            );
        }
    }
}

fn decision_notification(
    record: &ApplicationRecord,
    reviewer: &Caller,
    decision: ReviewDecision,
    comment: &str,
) -> Notification {
    let template = match record.state {
        ApplicationState::Approved => "application_approved",
        ApplicationState::Rejected => "application_rejected",
        ApplicationState::Escalated { .. } => "application_escalated",
        ApplicationState::Pending | ApplicationState::UnderReview { .. } => {
            "application_forwarded"
        }
    };

    let mut details = BTreeMap::new();
    details.insert("decision".to_string(), decision.label().to_string());
    details.insert("status".to_string(), record.status().label().to_string());
    details.insert(
        "workflowLevel".to_string(),
        record.workflow_level().label().to_string(),
    );
    details.insert("reviewerRole".to_string(), reviewer.role.label().to_string());
    if !comment.is_empty() {
        details.insert("comment".to_string(), comment.to_string());
    }

    Notification {
        recipient: record.applicant_id.clone(),
        template: template.to_string(),
        application_id: record.id.clone(),
        details,
    }
}

fn swap_error(application_id: &ApplicationId, err: RepositoryError) -> ApplicationServiceError {
    match err {
        RepositoryError::StaleState { current } => {
            ApplicationServiceError::ConcurrentUpdate { current }
        }
        RepositoryError::NotFound => ApplicationServiceError::NotFound(application_id.clone()),
        other => ApplicationServiceError::Repository(other),
    }
}

/// Caller-facing classification of service failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    InvalidState,
    Internal,
}

impl ErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Authorization => "AUTHORIZATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error("only students may submit applications, not {role}")]
    StudentsOnly { role: Role },
    #[error("no mentor is assigned to student {0}")]
    MentorUnassigned(UserId),
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("only the applicant may withdraw this application")]
    NotApplicant,
    #[error("application is {status}; only pending applications can be withdrawn")]
    NotCancellable { status: ApplicationStatus },
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("application changed while the decision was applied (now {current})")]
    ConcurrentUpdate { current: ApplicationStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl ApplicationServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationServiceError::Intake(_) | ApplicationServiceError::MentorUnassigned(_) => {
                ErrorKind::Validation
            }
            ApplicationServiceError::StudentsOnly { .. }
            | ApplicationServiceError::NotApplicant => ErrorKind::Authorization,
            ApplicationServiceError::Policy(violation) => {
                if violation.is_state_conflict() {
                    ErrorKind::InvalidState
                } else {
                    ErrorKind::Authorization
                }
            }
            ApplicationServiceError::Transition(_)
            | ApplicationServiceError::NotCancellable { .. }
            | ApplicationServiceError::ConcurrentUpdate { .. } => ErrorKind::InvalidState,
            ApplicationServiceError::NotFound(_) => ErrorKind::NotFound,
            ApplicationServiceError::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            ApplicationServiceError::Repository(_) | ApplicationServiceError::Directory(_) => {
                ErrorKind::Internal
            }
        }
    }
}
