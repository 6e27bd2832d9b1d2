use serde::de::DeserializeOwned;

use super::domain::{
    ApplicationKind, ApplicationPayload, CertificateDetails, CreateApplicationRequest,
    GeneralDetails, LeaveDetails, ReviewDecision,
};

/// Validation errors raised while accepting requests into the workflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("unknown application type '{0}'")]
    UnknownType(String),
    #[error("payload for {kind} must be a JSON object")]
    MissingPayload { kind: &'static str },
    #[error("payload for {kind} is malformed: {detail}")]
    MalformedPayload { kind: &'static str, detail: String },
    #[error("field '{field}' must not be blank")]
    BlankField { field: &'static str },
    #[error("field '{field}' exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("leave must end on or after its start date")]
    InvertedLeaveRange,
    #[error("leave may span at most {max} days")]
    LeaveTooLong { max: i64 },
    #[error("copies must be between 1 and {max}")]
    CopiesOutOfRange { max: u8 },
    #[error("a comment is required to {0}")]
    CommentRequired(ReviewDecision),
}

const DEFAULT_MAX_TEXT_LEN: usize = 2_000;
const DEFAULT_MAX_LEAVE_DAYS: i64 = 90;
const DEFAULT_MAX_COPIES: u8 = 10;

/// Limits applied to free text and request sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakePolicy {
    pub max_text_len: usize,
    pub max_leave_days: i64,
    pub max_copies: u8,
    pub require_rejection_comment: bool,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            max_leave_days: DEFAULT_MAX_LEAVE_DAYS,
            max_copies: DEFAULT_MAX_COPIES,
            require_rejection_comment: true,
        }
    }
}

/// Guard responsible for producing validated [`ApplicationPayload`]s.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard {
    policy: IntakePolicy,
}

impl IntakeGuard {
    pub fn with_policy(policy: IntakePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    /// Convert an inbound request body into a typed, trimmed payload.
    pub fn payload_from_request(
        &self,
        request: CreateApplicationRequest,
    ) -> Result<ApplicationPayload, IntakeViolation> {
        let kind = ApplicationKind::parse(&request.kind)
            .ok_or_else(|| IntakeViolation::UnknownType(request.kind.trim().to_string()))?;

        if !request.payload.is_object() {
            return Err(IntakeViolation::MissingPayload { kind: kind.label() });
        }

        match kind {
            ApplicationKind::Leave => {
                let mut details: LeaveDetails = decode(kind, request.payload)?;
                details.reason = self.text("reason", &details.reason)?;
                if details.to_date < details.from_date {
                    return Err(IntakeViolation::InvertedLeaveRange);
                }
                let span = (details.to_date - details.from_date).num_days() + 1;
                if span > self.policy.max_leave_days {
                    return Err(IntakeViolation::LeaveTooLong {
                        max: self.policy.max_leave_days,
                    });
                }
                Ok(ApplicationPayload::Leave(details))
            }
            ApplicationKind::Certificate => {
                let mut details: CertificateDetails = decode(kind, request.payload)?;
                details.certificate = self.text("certificate", &details.certificate)?;
                details.purpose = self.text("purpose", &details.purpose)?;
                if details.copies == 0 || details.copies > self.policy.max_copies {
                    return Err(IntakeViolation::CopiesOutOfRange {
                        max: self.policy.max_copies,
                    });
                }
                Ok(ApplicationPayload::Certificate(details))
            }
            ApplicationKind::General => {
                let mut details: GeneralDetails = decode(kind, request.payload)?;
                details.subject = self.text("subject", &details.subject)?;
                details.description = self.text("description", &details.description)?;
                Ok(ApplicationPayload::General(details))
            }
        }
    }

    /// Normalize a reviewer comment, enforcing the rejection-comment rule.
    pub fn review_comment(
        &self,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> Result<String, IntakeViolation> {
        let comment = comment.map(str::trim).unwrap_or_default();
        if comment.is_empty()
            && decision == ReviewDecision::Reject
            && self.policy.require_rejection_comment
        {
            return Err(IntakeViolation::CommentRequired(decision));
        }
        if comment.chars().count() > self.policy.max_text_len {
            return Err(IntakeViolation::FieldTooLong {
                field: "comment",
                max: self.policy.max_text_len,
            });
        }
        Ok(comment.to_string())
    }

    fn text(&self, field: &'static str, raw: &str) -> Result<String, IntakeViolation> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IntakeViolation::BlankField { field });
        }
        if trimmed.chars().count() > self.policy.max_text_len {
            return Err(IntakeViolation::FieldTooLong {
                field,
                max: self.policy.max_text_len,
            });
        }
        Ok(trimmed.to_string())
    }
}

fn decode<T: DeserializeOwned>(
    kind: ApplicationKind,
    payload: serde_json::Value,
) -> Result<T, IntakeViolation> {
    serde_json::from_value(payload).map_err(|err| IntakeViolation::MalformedPayload {
        kind: kind.label(),
        detail: err.to_string(),
    })
}
