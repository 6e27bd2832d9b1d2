//! Student application approval workflow.
//!
//! Students submit leave, certificate, and general requests that travel the
//! mentor, head-of-department, and dean review chain. The service here owns
//! validation, the review policy, optimistic commits, and applicant
//! notifications; `router` exposes it over HTTP.

pub mod directory;
pub mod domain;
pub mod envelope;
pub mod identity;
pub mod intake;
pub mod notifications;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;
pub mod state;

#[cfg(test)]
mod tests;

pub use directory::{DirectoryError, StaticStudentDirectory, StudentDirectory, StudentProfile};
pub use domain::{
    ApplicationId, ApplicationKind, ApplicationPayload, Caller, CertificateDetails, CommentAction,
    CreateApplicationRequest, GeneralDetails, LeaveDetails, ReviewDecision, ReviewerComment, Role,
    StatusUpdateRequest, UserId,
};
pub use envelope::{ApiEnvelope, ApiError, ApiSuccess};
pub use intake::{IntakeGuard, IntakePolicy, IntakeViolation};
pub use notifications::{Notification, NotificationError, NotificationPublisher};
pub use policy::{PolicyViolation, ReviewPolicy, ReviewSeat, REVIEW_SEATS};
pub use repository::{
    ApplicationQuery, ApplicationRecord, ApplicationRepository, ApplicationView,
    InMemoryApplicationRepository, RepositoryError,
};
pub use router::application_router;
pub use service::{ApplicationServiceError, ApplicationWorkflowService, ErrorKind};
pub use state::{
    ApplicationState, ApplicationStatus, ForwardedTier, ReviewTier, TransitionError,
    WorkflowLevel,
};
