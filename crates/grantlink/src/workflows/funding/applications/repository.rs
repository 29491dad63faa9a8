use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AnswerSet, ApplicationSubmission, SubmissionId};
use crate::workflows::funding::domain::{
    FieldDefinition, FundingOpportunity, NgoProfileSnapshot, OpportunityId, ProfileId, UserId,
};

/// Error enumeration for storage and directory failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Payload accepted by [`SubmissionRepository::insert`]; the store assigns the
/// id, initial status, and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub funding_opportunity_id: OpportunityId,
    pub applicant_user_id: UserId,
    pub applicant_profile_id: ProfileId,
    pub answers: AnswerSet,
}

/// Storage abstraction for application submissions.
///
/// Uniqueness of the (opportunity, applicant) pair is a store-level
/// constraint: `insert` must check and write inside one critical section so
/// concurrent duplicate submissions cannot both land.
pub trait SubmissionRepository: Send + Sync {
    /// Persist a new submission with `status = submitted` and fresh
    /// timestamps, or fail with [`RepositoryError::Conflict`] when the
    /// applicant already applied to the opportunity.
    fn insert(&self, new: NewSubmission) -> Result<ApplicationSubmission, RepositoryError>;

    /// Replace a stored submission; [`RepositoryError::NotFound`] when absent.
    fn update(&self, record: ApplicationSubmission)
        -> Result<ApplicationSubmission, RepositoryError>;

    fn fetch(&self, id: &SubmissionId) -> Result<Option<ApplicationSubmission>, RepositoryError>;

    /// All submissions by one applicant, newest submission first.
    fn for_applicant(&self, user: &UserId) -> Result<Vec<ApplicationSubmission>, RepositoryError>;

    /// All submissions for one opportunity, oldest first, so reviewers see a
    /// first-come-first-served queue.
    fn for_opportunity(
        &self,
        id: &OpportunityId,
    ) -> Result<Vec<ApplicationSubmission>, RepositoryError>;
}

/// Read/write access to funding opportunities, scoped to what the
/// application workflow needs.
pub trait OpportunityDirectory: Send + Sync {
    fn fetch(&self, id: &OpportunityId) -> Result<Option<FundingOpportunity>, RepositoryError>;

    /// Persist the outcome of a form update. Callers resolve the stored
    /// schema first (see `schema::resolve_schema_update`), so `fields` is
    /// already `None` whenever `accepts_integrated_app` is false.
    fn store_application_form(
        &self,
        id: &OpportunityId,
        accepts_integrated_app: bool,
        fields: Option<Vec<FieldDefinition>>,
    ) -> Result<FundingOpportunity, RepositoryError>;
}

/// Read access to NGO organizational profiles and account contact addresses.
pub trait ProfileDirectory: Send + Sync {
    fn snapshot_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<NgoProfileSnapshot>, RepositoryError>;

    fn snapshot(&self, id: &ProfileId) -> Result<Option<NgoProfileSnapshot>, RepositoryError>;

    fn contact_email(&self, user: &UserId) -> Result<Option<String>, RepositoryError>;
}

/// Identifier wrapper for in-app notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

/// An in-app notification row. Immutable after creation except for the
/// read flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_user_id: UserId,
    pub message: String,
    pub link: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for a new in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_user_id: UserId,
    pub message: String,
    pub link: String,
}

/// Outbound email payload handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Dispatch error for the notification boundary.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Outbound fan-out boundary for submission and status-change events.
///
/// Both calls are enqueue-only: implementations hand the payload to their
/// transport and return without waiting on delivery. The workflow logs
/// failures and moves on; a lost notification never rolls back the write
/// that triggered it.
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, notification: NewNotification) -> Result<(), DispatchError>;

    fn email(&self, email: OutboundEmail) -> Result<(), DispatchError>;
}

/// Read side of the in-app notification store, backing the inbox endpoints.
pub trait NotificationInbox: Send + Sync {
    /// Unread notifications for one user, newest first, capped at `limit`.
    fn unread_for(&self, user: &UserId, limit: usize)
        -> Result<Vec<Notification>, RepositoryError>;

    /// Mark the given notifications read, skipping rows the caller does not
    /// own. Returns how many rows actually flipped.
    fn mark_read(&self, user: &UserId, ids: &[NotificationId]) -> Result<usize, RepositoryError>;

    fn mark_all_read(&self, user: &UserId) -> Result<usize, RepositoryError>;
}

/// Reference to the opportunity a submission targets, for applicant-facing
/// listings. `None` when the opportunity no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityRef {
    pub id: OpportunityId,
    pub title: String,
    pub funder_name: String,
}

/// A submission joined with opportunity display data, for the applicant's
/// own listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicantSubmissionView {
    #[serde(flatten)]
    pub submission: ApplicationSubmission,
    pub opportunity: Option<OpportunityRef>,
}

/// A submission joined with applicant identity and profile snapshot, for the
/// funder's review queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunitySubmissionView {
    #[serde(flatten)]
    pub submission: ApplicationSubmission,
    pub applicant_email: Option<String>,
    pub applicant_profile: Option<NgoProfileSnapshot>,
}
