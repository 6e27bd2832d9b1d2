use super::domain::{Caller, Role};
use super::repository::ApplicationRecord;
use super::state::{ApplicationState, ReviewTier};

/// One row of the review table: which tier a role reviews in normal order and
/// which escalated tier it has to step in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSeat {
    pub role: Role,
    pub reviews: Option<ReviewTier>,
    pub intervenes_for: Option<ReviewTier>,
}

/// Seats in chain order; a seat's index is its rank.
pub const REVIEW_SEATS: [ReviewSeat; 4] = [
    ReviewSeat {
        role: Role::Faculty,
        reviews: Some(ReviewTier::Mentor),
        intervenes_for: None,
    },
    ReviewSeat {
        role: Role::Hod,
        reviews: Some(ReviewTier::Hod),
        intervenes_for: Some(ReviewTier::Mentor),
    },
    ReviewSeat {
        role: Role::Dean,
        reviews: Some(ReviewTier::Dean),
        intervenes_for: Some(ReviewTier::Hod),
    },
    ReviewSeat {
        role: Role::Admin,
        reviews: None,
        intervenes_for: Some(ReviewTier::Dean),
    },
];

fn rank(role: Role) -> Option<usize> {
    REVIEW_SEATS.iter().position(|seat| seat.role == role)
}

/// Role that owns the next move on an application in `state`, if any.
pub fn responsible_role(state: ApplicationState) -> Option<Role> {
    let seat = match state {
        ApplicationState::Pending => REVIEW_SEATS
            .iter()
            .find(|seat| seat.reviews == Some(ReviewTier::Mentor)),
        ApplicationState::UnderReview { tier } => REVIEW_SEATS
            .iter()
            .find(|seat| seat.reviews == Some(tier.review_tier())),
        ApplicationState::Escalated { tier } => REVIEW_SEATS
            .iter()
            .find(|seat| seat.intervenes_for == Some(tier)),
        ApplicationState::Approved | ApplicationState::Rejected => None,
    };
    seat.map(|seat| seat.role)
}

/// Whether the caller stands in the mentor/department relation a seat needs.
///
/// Faculty only review their own mentees. A head of department only reviews
/// their department when both sides carry one.
pub fn is_assigned(caller: &Caller, record: &ApplicationRecord) -> bool {
    match caller.role {
        Role::Faculty => record.mentor_id == caller.user_id,
        Role::Hod => match (&caller.department, &record.department) {
            (Some(caller_department), Some(record_department)) => {
                caller_department.eq_ignore_ascii_case(record_department)
            }
            _ => true,
        },
        Role::Student | Role::Dean | Role::Admin => true,
    }
}

/// Why a caller may not act on an application right now.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("{role} does not review applications")]
    NotAReviewer { role: Role },
    #[error("application is already {status} and closed to review")]
    Closed { status: &'static str },
    #[error("caller is not assigned to review this application")]
    NotAssigned,
    #[error("application is awaiting {responsible}, not {role}")]
    NotYourTier { role: Role, responsible: Role },
}

impl PolicyViolation {
    /// `true` when the failure reflects the record's state rather than the
    /// caller's authority.
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, PolicyViolation::Closed { .. })
    }
}

/// Gate for reviewer decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewPolicy;

impl ReviewPolicy {
    pub fn authorize(
        &self,
        caller: &Caller,
        record: &ApplicationRecord,
    ) -> Result<(), PolicyViolation> {
        if rank(caller.role).is_none() {
            return Err(PolicyViolation::NotAReviewer { role: caller.role });
        }

        let Some(responsible) = responsible_role(record.state) else {
            return Err(PolicyViolation::Closed {
                status: record.state.status().label(),
            });
        };

        if !is_assigned(caller, record) {
            return Err(PolicyViolation::NotAssigned);
        }

        if caller.role != responsible {
            return Err(PolicyViolation::NotYourTier {
                role: caller.role,
                responsible,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::applications::state::ForwardedTier;

    #[test]
    fn every_open_state_has_exactly_one_owner() {
        let open = [
            ApplicationState::Pending,
            ApplicationState::UnderReview {
                tier: ForwardedTier::Hod,
            },
            ApplicationState::UnderReview {
                tier: ForwardedTier::Dean,
            },
            ApplicationState::Escalated {
                tier: ReviewTier::Mentor,
            },
            ApplicationState::Escalated {
                tier: ReviewTier::Hod,
            },
            ApplicationState::Escalated {
                tier: ReviewTier::Dean,
            },
        ];
        let owners: Vec<_> = open.iter().map(|state| responsible_role(*state)).collect();
        assert_eq!(
            owners,
            vec![
                Some(Role::Faculty),
                Some(Role::Hod),
                Some(Role::Dean),
                Some(Role::Hod),
                Some(Role::Dean),
                Some(Role::Admin),
            ]
        );
        assert_eq!(responsible_role(ApplicationState::Approved), None);
        assert_eq!(responsible_role(ApplicationState::Rejected), None);
    }

    #[test]
    fn students_hold_no_seat() {
        assert_eq!(rank(Role::Student), None);
        assert!(REVIEW_SEATS.iter().all(|seat| seat.role != Role::Student));
    }
}
