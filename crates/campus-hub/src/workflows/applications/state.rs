//! Approval chain state.
//!
//! An application's position is a single [`ApplicationState`]; the public
//! `status` and `workflowLevel` fields are projections of it, so a terminal
//! status can never be paired with an open review tier.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::ReviewDecision;

/// Reviewer tiers in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewTier {
    Mentor,
    Hod,
    Dean,
}

impl ReviewTier {
    pub const fn label(self) -> &'static str {
        self.level().label()
    }

    pub const fn level(self) -> WorkflowLevel {
        match self {
            ReviewTier::Mentor => WorkflowLevel::Mentor,
            ReviewTier::Hod => WorkflowLevel::Hod,
            ReviewTier::Dean => WorkflowLevel::Dean,
        }
    }

    /// The tier that follows this one, `None` once the chain is exhausted.
    pub const fn next(self) -> Option<ReviewTier> {
        match self {
            ReviewTier::Mentor => Some(ReviewTier::Hod),
            ReviewTier::Hod => Some(ReviewTier::Dean),
            ReviewTier::Dean => None,
        }
    }
}

/// Tiers a forwarded application can wait at. The mentor tier is only ever
/// reached through [`ApplicationState::Pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForwardedTier {
    Hod,
    Dean,
}

impl ForwardedTier {
    pub const fn review_tier(self) -> ReviewTier {
        match self {
            ForwardedTier::Hod => ReviewTier::Hod,
            ForwardedTier::Dean => ReviewTier::Dean,
        }
    }
}

/// Public projection of the tier currently responsible for an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowLevel {
    Mentor,
    Hod,
    Dean,
    Completed,
}

impl WorkflowLevel {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowLevel::Mentor => "MENTOR",
            WorkflowLevel::Hod => "HOD",
            WorkflowLevel::Dean => "DEAN",
            WorkflowLevel::Completed => "COMPLETED",
        }
    }
}

/// Public projection of the application's review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Escalated,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Escalated => "ESCALATED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(ApplicationStatus::Pending),
            "UNDER_REVIEW" => Some(ApplicationStatus::UnderReview),
            "APPROVED" => Some(ApplicationStatus::Approved),
            "REJECTED" => Some(ApplicationStatus::Rejected),
            "ESCALATED" => Some(ApplicationStatus::Escalated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationState {
    /// Freshly submitted, waiting on the student's mentor.
    Pending,
    UnderReview {
        tier: ForwardedTier,
    },
    /// Raised out of normal order; the tier above `tier` has to step in.
    Escalated {
        tier: ReviewTier,
    },
    Approved,
    Rejected,
}

impl ApplicationState {
    pub const fn status(self) -> ApplicationStatus {
        match self {
            ApplicationState::Pending => ApplicationStatus::Pending,
            ApplicationState::UnderReview { .. } => ApplicationStatus::UnderReview,
            ApplicationState::Escalated { .. } => ApplicationStatus::Escalated,
            ApplicationState::Approved => ApplicationStatus::Approved,
            ApplicationState::Rejected => ApplicationStatus::Rejected,
        }
    }

    pub const fn workflow_level(self) -> WorkflowLevel {
        match self {
            ApplicationState::Pending => WorkflowLevel::Mentor,
            ApplicationState::UnderReview { tier } => tier.review_tier().level(),
            ApplicationState::Escalated { tier } => tier.level(),
            ApplicationState::Approved | ApplicationState::Rejected => WorkflowLevel::Completed,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationState::Approved | ApplicationState::Rejected
        )
    }

    /// Apply a reviewer decision made by whoever currently owns the record.
    ///
    /// Callers are expected to have cleared the review policy first; this only
    /// knows which states can follow which.
    pub fn apply(self, decision: ReviewDecision) -> Result<ApplicationState, TransitionError> {
        match (self, decision) {
            (ApplicationState::Approved | ApplicationState::Rejected, _) => {
                Err(TransitionError::Terminal {
                    status: self.status(),
                })
            }
            (_, ReviewDecision::Reject) => Ok(ApplicationState::Rejected),
            (ApplicationState::Pending, ReviewDecision::ApproveForward) => {
                Ok(advance_from(ReviewTier::Mentor))
            }
            (ApplicationState::Pending, ReviewDecision::Escalate) => {
                Ok(ApplicationState::Escalated {
                    tier: ReviewTier::Mentor,
                })
            }
            (ApplicationState::UnderReview { tier }, ReviewDecision::ApproveForward) => {
                Ok(advance_from(tier.review_tier()))
            }
            (ApplicationState::UnderReview { tier }, ReviewDecision::Escalate) => {
                Ok(ApplicationState::Escalated {
                    tier: tier.review_tier(),
                })
            }
            // The intervening tier signs off on its own behalf too, so the
            // chain resumes after it.
            (ApplicationState::Escalated { tier }, ReviewDecision::ApproveForward) => {
                Ok(match tier.next() {
                    Some(intervening) => advance_from(intervening),
                    None => ApplicationState::Approved,
                })
            }
            (ApplicationState::Escalated { tier }, ReviewDecision::Escalate) => match tier.next() {
                Some(higher) => Ok(ApplicationState::Escalated { tier: higher }),
                None => Err(TransitionError::NoHigherAuthority { tier }),
            },
        }
    }
}

fn advance_from(tier: ReviewTier) -> ApplicationState {
    match tier {
        ReviewTier::Mentor => ApplicationState::UnderReview {
            tier: ForwardedTier::Hod,
        },
        ReviewTier::Hod => ApplicationState::UnderReview {
            tier: ForwardedTier::Dean,
        },
        ReviewTier::Dean => ApplicationState::Approved,
    }
}

/// Decision not legal from the current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("application is already {status} and cannot change")]
    Terminal { status: ApplicationStatus },
    #[error("escalation from the {tier} tier has no higher authority")]
    NoHigherAuthority { tier: ReviewTier },
}

impl fmt::Display for ReviewTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ForwardedTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.review_tier().label())
    }
}

impl fmt::Display for WorkflowLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
