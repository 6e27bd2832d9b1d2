use campus_hub::error::AppError;
use campus_hub::workflows::applications::{
    Notification, NotificationError, NotificationPublisher, StaticStudentDirectory,
    StudentProfile, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Publisher used by `serve`: logs each notification and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingPublisher;

impl NotificationPublisher for LoggingPublisher {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        log_notification(&notification);
        Ok(())
    }
}

fn log_notification(notification: &Notification) {
    info!(
        recipient = %notification.recipient,
        template = %notification.template,
        application_id = %notification.application_id,
        "notification queued"
    );
}

/// Outbox that logs every notification and keeps a copy for inspection.
#[derive(Default, Clone)]
pub(crate) struct InMemoryOutbox {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationPublisher for InMemoryOutbox {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        log_notification(&notification);
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| NotificationError::Transport("outbox lock poisoned".to_string()))?;
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryOutbox {
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Load the student directory from `path`, or fall back to the sample roster.
pub(crate) fn load_directory(path: Option<&Path>) -> Result<StaticStudentDirectory, AppError> {
    match path {
        Some(path) => {
            let directory = StaticStudentDirectory::from_path(path)?;
            info!(path = %path.display(), students = directory.len(), "student directory loaded");
            Ok(directory)
        }
        None => {
            warn!("no student directory configured; using the sample roster");
            Ok(sample_directory())
        }
    }
}

/// Small roster used by the demo and by `serve` when no directory is configured.
pub(crate) fn sample_directory() -> StaticStudentDirectory {
    let profile = |student: &str, department: &str, mentor: &str| StudentProfile {
        student_id: UserId::new(student),
        department: Some(department.to_string()),
        mentor_id: Some(UserId::new(mentor)),
    };
    StaticStudentDirectory::from_profiles([
        profile("stu-1001", "CSE", "fac-201"),
        profile("stu-1002", "CSE", "fac-201"),
        profile("stu-2001", "ECE", "fac-301"),
    ])
}
