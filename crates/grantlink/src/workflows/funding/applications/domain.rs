use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::funding::domain::{OpportunityId, ProfileId, UserId};

/// Identifier wrapper for stored application submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

/// Answers keyed by field label, exactly as submitted.
///
/// Values stay free-form JSON: field kinds describe the input widget, not a
/// storage type, and answers are never coerced on the way in.
pub type AnswerSet = BTreeMap<String, Value>;

/// Review status tracked throughout a submission's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(ApplicationStatus::Submitted),
            "under_review" => Some(ApplicationStatus::UnderReview),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }

    /// Whether a review may move a submission from `self` to `next`.
    ///
    /// Every listed status is currently reachable from every other; funders
    /// routinely walk decisions back, so no edge is guarded yet. Tightening
    /// the lifecycle later only means editing this table.
    pub const fn can_transition_to(self, next: ApplicationStatus) -> bool {
        match (self, next) {
            (_, ApplicationStatus::Submitted)
            | (_, ApplicationStatus::UnderReview)
            | (_, ApplicationStatus::Approved)
            | (_, ApplicationStatus::Rejected) => true,
        }
    }
}

/// One NGO's stored answer set against one opportunity's field schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub id: SubmissionId,
    pub funding_opportunity_id: OpportunityId,
    pub applicant_user_id: UserId,
    pub applicant_profile_id: ProfileId,
    pub answers: AnswerSet,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
