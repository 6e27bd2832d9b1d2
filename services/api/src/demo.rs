use crate::infra::{sample_directory, InMemoryOutbox};
use campus_hub::config::WorkflowConfig;
use campus_hub::error::AppError;
use campus_hub::workflows::applications::{
    ApplicationRecord, ApplicationServiceError, ApplicationWorkflowService, Caller,
    CreateApplicationRequest, InMemoryApplicationRepository, ReviewDecision, Role,
    StaticStudentDirectory, StatusUpdateRequest,
};
use chrono::{Duration, Local};
use clap::Args;
use serde_json::json;
use std::sync::Arc;

type DemoService = ApplicationWorkflowService<
    InMemoryApplicationRepository,
    StaticStudentDirectory,
    InMemoryOutbox,
>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the final JSON view of each application.
    #[arg(long)]
    pub(crate) show_payloads: bool,
    /// Allow rejections without a reviewer comment.
    #[arg(long)]
    pub(crate) lenient_rejections: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        show_payloads,
        lenient_rejections,
    } = args;

    let config = WorkflowConfig {
        require_rejection_comment: !lenient_rejections,
        ..WorkflowConfig::default()
    };
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let outbox = Arc::new(InMemoryOutbox::default());
    let service: DemoService = ApplicationWorkflowService::new(
        repository,
        Arc::new(sample_directory()),
        outbox.clone(),
        &config,
    );

    let student = Caller::new("stu-1001", Role::Student).in_department("CSE");
    let mentor = Caller::new("fac-201", Role::Faculty).in_department("CSE");
    let hod = Caller::new("hod-cse", Role::Hod).in_department("CSE");
    let dean = Caller::new("dean-01", Role::Dean);

    println!("CampusHub approval workflow demo");

    println!("\nLeave request: mentor forwards, head of department rejects");
    let today = Local::now().date_naive();
    let leave = CreateApplicationRequest {
        kind: "LEAVE".to_string(),
        payload: json!({
            "fromDate": (today + Duration::days(7)).to_string(),
            "toDate": (today + Duration::days(9)).to_string(),
            "reason": "Family function out of town"
        }),
    };
    let mut shown = Vec::new();
    if let Some(record) = step("student submits", service.create(&student, leave)) {
        let id = record.id.clone();
        step(
            "mentor approves",
            service.update_status(
                &mentor,
                &id,
                review(ReviewDecision::ApproveForward, "Attendance is fine"),
            ),
        );
        step(
            "HOD rejects",
            service.update_status(
                &hod,
                &id,
                review(ReviewDecision::Reject, "Clashes with internal exams"),
            ),
        );
        step(
            "HOD approves again",
            service.update_status(&hod, &id, review(ReviewDecision::ApproveForward, "")),
        );
        shown.push(id);
    }

    println!("\nCertificate request: withdrawn while still pending");
    let certificate = CreateApplicationRequest {
        kind: "CERTIFICATE".to_string(),
        payload: json!({ "certificate": "Bonafide", "purpose": "Bank account", "copies": 2 }),
    };
    if let Some(record) = step("student submits", service.create(&student, certificate)) {
        step("student withdraws", service.cancel(&student, &record.id));
        shown.push(record.id);
    }

    println!("\nGeneral request: escalated by the mentor, resolved by the HOD and dean");
    let general = CreateApplicationRequest {
        kind: "GENERAL".to_string(),
        payload: json!({
            "subject": "Project lab access",
            "description": "Weekend access for the final-year robotics project"
        }),
    };
    if let Some(record) = step("student submits", service.create(&student, general)) {
        let id = record.id.clone();
        step(
            "mentor escalates",
            service.update_status(
                &mentor,
                &id,
                review(ReviewDecision::Escalate, "Needs department sign-off"),
            ),
        );
        step("student tries to withdraw", service.cancel(&student, &id));
        step(
            "HOD approves on escalation",
            service.update_status(
                &hod,
                &id,
                review(ReviewDecision::ApproveForward, "Approved for this term"),
            ),
        );
        step(
            "dean approves",
            service.update_status(&dean, &id, review(ReviewDecision::ApproveForward, "")),
        );
        shown.push(id);
    }

    println!("\nNotifications dispatched");
    for notification in outbox.sent() {
        println!(
            "  - {} -> {} ({})",
            notification.template, notification.recipient, notification.application_id
        );
    }

    if show_payloads {
        println!("\nFinal application views");
        for id in shown {
            match service.get(&student, &id) {
                Ok(record) => match serde_json::to_string_pretty(&record.view()) {
                    Ok(json) => println!("{json}"),
                    Err(err) => println!("  view unavailable: {err}"),
                },
                Err(err) => println!("  lookup failed: {err}"),
            }
        }
    }

    Ok(())
}

fn review(decision: ReviewDecision, comment: &str) -> StatusUpdateRequest {
    StatusUpdateRequest {
        decision,
        comment: Some(comment.to_string()).filter(|comment| !comment.is_empty()),
    }
}

fn step(
    label: &str,
    outcome: Result<ApplicationRecord, ApplicationServiceError>,
) -> Option<ApplicationRecord> {
    match outcome {
        Ok(record) => {
            println!(
                "- {label}: {} {}@{}",
                record.id,
                record.status(),
                record.workflow_level()
            );
            Some(record)
        }
        Err(err) => {
            println!("- {label}: refused with {} ({err})", err.kind().code());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_against_in_memory_collaborators() {
        run_demo(DemoArgs {
            show_payloads: true,
            lenient_rejections: false,
        })
        .expect("demo completes");
    }
}
