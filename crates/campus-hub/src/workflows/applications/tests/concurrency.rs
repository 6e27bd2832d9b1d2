use super::common::*;
use crate::config::WorkflowConfig;
use crate::workflows::applications::domain::{ApplicationId, ReviewDecision};
use crate::workflows::applications::repository::{
    ApplicationQuery, ApplicationRecord, ApplicationRepository, InMemoryApplicationRepository,
    RepositoryError,
};
use crate::workflows::applications::state::{ApplicationState, ApplicationStatus, ForwardedTier};
use crate::workflows::applications::{
    ApplicationServiceError, ApplicationWorkflowService, ErrorKind,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

/// Store whose next `gated` reads each wait until all of them have read, so
/// every gated caller works from the same pre-state.
struct LockstepRepository {
    inner: Arc<InMemoryApplicationRepository>,
    gated: AtomicUsize,
    barrier: Barrier,
}

impl LockstepRepository {
    fn new(inner: Arc<InMemoryApplicationRepository>, readers: usize) -> Self {
        Self {
            inner,
            gated: AtomicUsize::new(readers),
            barrier: Barrier::new(readers),
        }
    }
}

impl ApplicationRepository for LockstepRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let fetched = self.inner.fetch(id);
        let gated = self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait();
        }
        fetched
    }

    fn query(&self, query: &ApplicationQuery) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.inner.query(query)
    }

    fn compare_and_swap(
        &self,
        expected: ApplicationState,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        self.inner.compare_and_swap(expected, record)
    }
}

#[test]
fn concurrent_hod_approvals_commit_exactly_once() {
    let (setup, repository, notifications) = build_service();
    let record = submitted_in(
        &setup,
        ApplicationState::UnderReview {
            tier: ForwardedTier::Hod,
        },
    );
    let service = ApplicationWorkflowService::new(
        Arc::new(LockstepRepository::new(repository.clone(), 2)),
        Arc::new(directory()),
        notifications,
        &WorkflowConfig::default(),
    );
    let (service, id) = (&service, &record.id);

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| scope.spawn(move || service.update_status(&hod(), id, approve())))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("reviewer thread completes"))
            .collect()
    });

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1, "{outcomes:?}");
    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert!(
                matches!(err, ApplicationServiceError::ConcurrentUpdate { .. }),
                "{err:?}"
            );
            assert_eq!(err.kind(), ErrorKind::InvalidState);
        }
    }

    let stored = repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(
        stored.state,
        ApplicationState::UnderReview {
            tier: ForwardedTier::Dean
        }
    );
    assert_eq!(stored.version, record.version + 1);
    assert_eq!(stored.reviewer_comments.len(), record.reviewer_comments.len() + 1);
}

#[test]
fn hod_reading_after_the_winning_commit_is_out_of_tier() {
    let (service, _, _) = build_service();
    let record = submitted_in(
        &service,
        ApplicationState::UnderReview {
            tier: ForwardedTier::Hod,
        },
    );
    service
        .update_status(&hod(), &record.id, approve())
        .expect("first hod approval commits");

    let err = service
        .update_status(&hod(), &record.id, approve())
        .expect_err("record now awaits the dean");
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

/// Store that lets another reviewer sneak a rejection in between the read and
/// the conditional write.
struct InterleavingRepository {
    inner: InMemoryApplicationRepository,
}

impl ApplicationRepository for InterleavingRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn query(&self, query: &ApplicationQuery) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.inner.query(query)
    }

    fn compare_and_swap(
        &self,
        expected: ApplicationState,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        if let Some(mut current) = self.inner.fetch(&record.id)? {
            let before = current.state;
            current.state = ApplicationState::Rejected;
            self.inner.compare_and_swap(before, current)?;
        }
        self.inner.compare_and_swap(expected, record)
    }
}

#[test]
fn lost_compare_and_swap_reports_the_winning_state() {
    let repository = Arc::new(InterleavingRepository {
        inner: InMemoryApplicationRepository::default(),
    });
    let service = ApplicationWorkflowService::new(
        repository.clone(),
        Arc::new(directory()),
        Arc::new(MemoryNotifications::default()),
        &WorkflowConfig::default(),
    );
    let record = service
        .create(&student(), general_request())
        .expect("submission succeeds");

    match service.update_status(
        &mentor(),
        &record.id,
        decision(ReviewDecision::ApproveForward, "ok"),
    ) {
        Err(err @ ApplicationServiceError::ConcurrentUpdate { .. }) => {
            assert_eq!(err.kind(), ErrorKind::InvalidState);
            assert!(matches!(
                err,
                ApplicationServiceError::ConcurrentUpdate {
                    current: ApplicationStatus::Rejected
                }
            ));
        }
        other => panic!("expected concurrent update, got {other:?}"),
    }

    let stored = repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.state, ApplicationState::Rejected);
}
