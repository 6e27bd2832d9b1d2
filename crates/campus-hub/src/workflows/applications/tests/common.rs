use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::config::WorkflowConfig;
use crate::workflows::applications::directory::{StaticStudentDirectory, StudentProfile};
use crate::workflows::applications::domain::{
    ApplicationId, Caller, CreateApplicationRequest, ReviewDecision, Role, StatusUpdateRequest,
    UserId,
};
use crate::workflows::applications::notifications::{
    Notification, NotificationError, NotificationPublisher,
};
use crate::workflows::applications::repository::{
    ApplicationQuery, ApplicationRecord, ApplicationRepository, InMemoryApplicationRepository,
    RepositoryError,
};
use crate::workflows::applications::state::{ApplicationState, ForwardedTier, ReviewTier};
use crate::workflows::applications::{application_router, ApplicationWorkflowService};

pub(super) type TestService = ApplicationWorkflowService<
    InMemoryApplicationRepository,
    StaticStudentDirectory,
    MemoryNotifications,
>;

pub(super) fn student() -> Caller {
    Caller::new("stu-1", Role::Student).in_department("CSE")
}

pub(super) fn other_student() -> Caller {
    Caller::new("stu-2", Role::Student).in_department("ECE")
}

pub(super) fn mentor() -> Caller {
    Caller::new("fac-1", Role::Faculty).in_department("CSE")
}

pub(super) fn other_faculty() -> Caller {
    Caller::new("fac-2", Role::Faculty).in_department("ECE")
}

pub(super) fn hod() -> Caller {
    Caller::new("hod-cse", Role::Hod).in_department("CSE")
}

pub(super) fn other_hod() -> Caller {
    Caller::new("hod-ece", Role::Hod).in_department("ECE")
}

pub(super) fn dean() -> Caller {
    Caller::new("dean-1", Role::Dean)
}

pub(super) fn admin() -> Caller {
    Caller::new("admin-1", Role::Admin)
}

pub(super) fn directory() -> StaticStudentDirectory {
    StaticStudentDirectory::from_profiles([
        StudentProfile {
            student_id: UserId::new("stu-1"),
            department: Some("CSE".to_string()),
            mentor_id: Some(UserId::new("fac-1")),
        },
        StudentProfile {
            student_id: UserId::new("stu-2"),
            department: Some("ECE".to_string()),
            mentor_id: Some(UserId::new("fac-2")),
        },
        StudentProfile {
            student_id: UserId::new("stu-orphan"),
            department: Some("CSE".to_string()),
            mentor_id: None,
        },
    ])
}

pub(super) fn leave_request() -> CreateApplicationRequest {
    CreateApplicationRequest {
        kind: "LEAVE".to_string(),
        payload: json!({
            "fromDate": "2026-03-10",
            "toDate": "2026-03-12",
            "reason": "  Sister's wedding  "
        }),
    }
}

pub(super) fn certificate_request() -> CreateApplicationRequest {
    CreateApplicationRequest {
        kind: "certificate".to_string(),
        payload: json!({
            "certificate": "Bonafide",
            "purpose": "Scholarship renewal"
        }),
    }
}

pub(super) fn general_request() -> CreateApplicationRequest {
    CreateApplicationRequest {
        kind: "GENERAL".to_string(),
        payload: json!({
            "subject": "Lab access",
            "description": "Weekend access to the robotics lab"
        }),
    }
}

pub(super) fn decision(decision: ReviewDecision, comment: &str) -> StatusUpdateRequest {
    StatusUpdateRequest {
        decision,
        comment: Some(comment.to_string()),
    }
}

pub(super) fn approve() -> StatusUpdateRequest {
    decision(ReviewDecision::ApproveForward, "looks fine")
}

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryApplicationRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = ApplicationWorkflowService::new(
        repository.clone(),
        Arc::new(directory()),
        notifications.clone(),
        &WorkflowConfig::default(),
    );
    (service, repository, notifications)
}

/// Submit as `student()` and walk the record to `state` through real decisions.
pub(super) fn submitted_in(service: &TestService, state: ApplicationState) -> ApplicationRecord {
    let record = service
        .create(&student(), leave_request())
        .expect("submission succeeds");
    let forward = ReviewDecision::ApproveForward;
    let steps: Vec<(Caller, ReviewDecision)> = match state {
        ApplicationState::Pending => Vec::new(),
        ApplicationState::UnderReview {
            tier: ForwardedTier::Hod,
        } => vec![(mentor(), forward)],
        ApplicationState::UnderReview {
            tier: ForwardedTier::Dean,
        } => vec![(mentor(), forward), (hod(), forward)],
        ApplicationState::Escalated {
            tier: ReviewTier::Mentor,
        } => vec![(mentor(), ReviewDecision::Escalate)],
        ApplicationState::Escalated {
            tier: ReviewTier::Hod,
        } => vec![(mentor(), forward), (hod(), ReviewDecision::Escalate)],
        ApplicationState::Escalated {
            tier: ReviewTier::Dean,
        } => vec![
            (mentor(), forward),
            (hod(), forward),
            (dean(), ReviewDecision::Escalate),
        ],
        ApplicationState::Approved => {
            vec![(mentor(), forward), (hod(), forward), (dean(), forward)]
        }
        ApplicationState::Rejected => vec![(mentor(), ReviewDecision::Reject)],
    };

    let mut current = record;
    for (caller, step) in steps {
        current = service
            .update_status(&caller, &current.id, decision(step, "step"))
            .expect("setup transition succeeds");
    }
    assert_eq!(current.state, state, "fixture reached requested state");
    current
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifications {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notification mutex poisoned").clone()
    }

    pub(super) fn templates_for(&self, recipient: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|notification| notification.recipient.as_str() == recipient)
            .map(|notification| notification.template)
            .collect()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifications;

impl NotificationPublisher for FailingNotifications {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay refused".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn query(&self, _query: &ApplicationQuery) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn compare_and_swap(
        &self,
        _expected: ApplicationState,
        _record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn application_router_with_service(service: TestService) -> axum::Router {
    application_router(Arc::new(service))
}
