//! Integrated application intake, review listing, and status lifecycle.
//!
//! NGOs apply to funding opportunities by answering the funder's custom field
//! schema. Submissions are stored once per (opportunity, applicant) pair and
//! then move through their review statuses under the owning funder's control,
//! fanning out best-effort notifications along the way.

pub mod domain;
pub mod export;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{AnswerSet, ApplicationStatus, ApplicationSubmission, SubmissionId};
pub use repository::{
    ApplicantSubmissionView, DispatchError, NewNotification, NewSubmission, Notification,
    NotificationDispatcher, NotificationId, NotificationInbox, OpportunityDirectory,
    OpportunityRef, OpportunitySubmissionView, OutboundEmail, ProfileDirectory, RepositoryError,
    SubmissionRepository,
};
pub use router::application_router;
pub use service::{ApplicationError, IntegratedApplicationService};
pub use validation::{validate_answers, ValidationError};
