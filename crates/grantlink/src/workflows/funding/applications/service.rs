use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use super::domain::{AnswerSet, ApplicationStatus, ApplicationSubmission, SubmissionId};
use super::export;
use super::repository::{
    ApplicantSubmissionView, NewNotification, NewSubmission, NotificationDispatcher,
    OpportunityDirectory, OpportunityRef, OpportunitySubmissionView, OutboundEmail,
    ProfileDirectory, RepositoryError, SubmissionRepository,
};
use super::validation::{validate_answers, ValidationError};
use crate::workflows::funding::domain::{FundingOpportunity, Identity, OpportunityId, Role};
use crate::workflows::funding::schema::{resolve_schema_update, SchemaError};

/// Service composing the schema validator, submission store, and the status
/// lifecycle, with notification fan-out on the way out.
pub struct IntegratedApplicationService<O, P, S, N> {
    opportunities: Arc<O>,
    profiles: Arc<P>,
    submissions: Arc<S>,
    dispatcher: Arc<N>,
    base_url: String,
}

/// Error raised by the integrated application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("you have already submitted an application for this opportunity")]
    DuplicateApplication,
    #[error("an NGO profile must be created before submitting applications")]
    ProfileRequired,
    #[error("funding opportunity not found")]
    OpportunityNotFound,
    #[error("application submission not found")]
    SubmissionNotFound,
    #[error("access denied")]
    NotOwner,
    #[error("access denied")]
    RoleDenied,
    #[error("status change from {from} to {to} is not allowed")]
    TransitionNotAllowed { from: &'static str, to: &'static str },
    #[error("failed to render export: {0}")]
    Export(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => ApplicationError::DuplicateApplication,
            RepositoryError::NotFound => ApplicationError::SubmissionNotFound,
            other => ApplicationError::Repository(other),
        }
    }
}

impl<O, P, S, N> IntegratedApplicationService<O, P, S, N>
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(
        opportunities: Arc<O>,
        profiles: Arc<P>,
        submissions: Arc<S>,
        dispatcher: Arc<N>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            opportunities,
            profiles,
            submissions,
            dispatcher,
            base_url: base_url.into(),
        }
    }

    /// Submit a new application for an opportunity, returning the stored
    /// record. The owning funder is notified once the write lands.
    pub fn submit(
        &self,
        identity: &Identity,
        opportunity_id: &OpportunityId,
        answers: AnswerSet,
    ) -> Result<ApplicationSubmission, ApplicationError> {
        if identity.role != Role::Ngo {
            return Err(ApplicationError::RoleDenied);
        }

        let opportunity = self
            .opportunities
            .fetch(opportunity_id)
            .map_err(ApplicationError::Repository)?
            .ok_or(ApplicationError::OpportunityNotFound)?;

        validate_answers(&opportunity, &answers)?;

        let profile = self
            .profiles
            .snapshot_for_user(&identity.user_id)
            .map_err(ApplicationError::Repository)?
            .ok_or(ApplicationError::ProfileRequired)?;

        let stored = self.submissions.insert(NewSubmission {
            funding_opportunity_id: opportunity.id.clone(),
            applicant_user_id: identity.user_id.clone(),
            applicant_profile_id: profile.id.clone(),
            answers,
        })?;

        self.notify_funder_of_submission(&opportunity, &profile.ngo_name);

        Ok(stored)
    }

    /// All of the caller's submissions, newest first, joined with opportunity
    /// display data where the opportunity still resolves.
    pub fn my_submissions(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ApplicantSubmissionView>, ApplicationError> {
        let records = self
            .submissions
            .for_applicant(&identity.user_id)
            .map_err(ApplicationError::Repository)?;

        let mut views = Vec::with_capacity(records.len());
        for submission in records {
            let opportunity = self
                .opportunities
                .fetch(&submission.funding_opportunity_id)
                .map_err(ApplicationError::Repository)?
                .map(|opportunity| OpportunityRef {
                    id: opportunity.id,
                    title: opportunity.title,
                    funder_name: opportunity.funder_name,
                });
            views.push(ApplicantSubmissionView {
                submission,
                opportunity,
            });
        }
        Ok(views)
    }

    /// The review queue for one opportunity, oldest first, restricted to the
    /// owning funder.
    pub fn opportunity_submissions(
        &self,
        identity: &Identity,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<OpportunitySubmissionView>, ApplicationError> {
        let opportunity = self.owned_opportunity(identity, opportunity_id)?;

        let records = self
            .submissions
            .for_opportunity(&opportunity.id)
            .map_err(ApplicationError::Repository)?;

        let mut views = Vec::with_capacity(records.len());
        for submission in records {
            let applicant_email = self
                .profiles
                .contact_email(&submission.applicant_user_id)
                .map_err(ApplicationError::Repository)?;
            let applicant_profile = self
                .profiles
                .snapshot(&submission.applicant_profile_id)
                .map_err(ApplicationError::Repository)?;
            views.push(OpportunitySubmissionView {
                submission,
                applicant_email,
                applicant_profile,
            });
        }
        Ok(views)
    }

    /// Move a submission to a new review status. Only the funder owning the
    /// linked opportunity may call this; an effective change notifies the
    /// applicant exactly once, while re-applying the current status stays
    /// silent.
    pub fn update_status(
        &self,
        identity: &Identity,
        submission_id: &SubmissionId,
        new_status: ApplicationStatus,
    ) -> Result<ApplicationSubmission, ApplicationError> {
        let mut submission = self
            .submissions
            .fetch(submission_id)
            .map_err(ApplicationError::Repository)?
            .ok_or(ApplicationError::SubmissionNotFound)?;

        // A submission whose opportunity no longer resolves cannot prove
        // ownership, so it is treated the same as someone else's.
        let opportunity = self
            .opportunities
            .fetch(&submission.funding_opportunity_id)
            .map_err(ApplicationError::Repository)?
            .ok_or(ApplicationError::NotOwner)?;
        if opportunity.funder_user_id != identity.user_id {
            return Err(ApplicationError::NotOwner);
        }

        let previous = submission.status;
        if !previous.can_transition_to(new_status) {
            return Err(ApplicationError::TransitionNotAllowed {
                from: previous.label(),
                to: new_status.label(),
            });
        }

        submission.status = new_status;
        submission.updated_at = Utc::now();
        let stored = self.submissions.update(submission)?;

        if previous != new_status {
            self.notify_applicant_of_status(&stored, &opportunity, new_status);
        }

        Ok(stored)
    }

    /// Apply a form update to an opportunity: validate the candidate field
    /// list and persist the resolved schema. Owning funder or admin only.
    pub fn configure_application_form(
        &self,
        identity: &Identity,
        opportunity_id: &OpportunityId,
        accepts_integrated_app: bool,
        raw_fields: Option<&Value>,
    ) -> Result<FundingOpportunity, ApplicationError> {
        let opportunity = self
            .opportunities
            .fetch(opportunity_id)
            .map_err(ApplicationError::Repository)?
            .ok_or(ApplicationError::OpportunityNotFound)?;

        let owns = opportunity.funder_user_id == identity.user_id;
        if !owns && identity.role != Role::Admin {
            return Err(ApplicationError::NotOwner);
        }

        let fields = resolve_schema_update(accepts_integrated_app, raw_fields)?;

        let updated = self
            .opportunities
            .store_application_form(opportunity_id, accepts_integrated_app, fields)
            .map_err(|err| match err {
                RepositoryError::NotFound => ApplicationError::OpportunityNotFound,
                other => ApplicationError::Repository(other),
            })?;

        Ok(updated)
    }

    /// Render the review queue as CSV, one column per schema field. Same
    /// authorization as [`Self::opportunity_submissions`].
    pub fn export_submissions_csv(
        &self,
        identity: &Identity,
        opportunity_id: &OpportunityId,
    ) -> Result<String, ApplicationError> {
        let opportunity = self.owned_opportunity(identity, opportunity_id)?;
        let views = self.opportunity_submissions(identity, opportunity_id)?;

        let schema = opportunity.integrated_app_fields.as_deref().unwrap_or(&[]);
        export::render_submissions_csv(schema, &views)
            .map_err(|err| ApplicationError::Export(err.to_string()))
    }

    fn owned_opportunity(
        &self,
        identity: &Identity,
        opportunity_id: &OpportunityId,
    ) -> Result<FundingOpportunity, ApplicationError> {
        let opportunity = self
            .opportunities
            .fetch(opportunity_id)
            .map_err(ApplicationError::Repository)?
            .ok_or(ApplicationError::OpportunityNotFound)?;

        if opportunity.funder_user_id != identity.user_id {
            return Err(ApplicationError::NotOwner);
        }

        Ok(opportunity)
    }

    fn notify_funder_of_submission(&self, opportunity: &FundingOpportunity, ngo_name: &str) {
        let link = format!("/funder/funding/{}/applications", opportunity.id.0);
        let message = format!(
            "New application received from {} for \"{}\".",
            ngo_name, opportunity.title
        );

        self.dispatch_notification(NewNotification {
            recipient_user_id: opportunity.funder_user_id.clone(),
            message,
            link: link.clone(),
        });

        if let Some(address) = opportunity.funder_email.as_deref() {
            let subject = format!("New Application Received for \"{}\"", opportunity.title);
            let text = format!(
                "Hi,\n\nYou have received a new application from {} for your funding opportunity \"{}\".\n\nView applications here: {}{}",
                ngo_name, opportunity.title, self.base_url, link
            );
            let html = format!(
                "<p>Hi,</p><p>You have received a new application from <strong>{}</strong> for your funding opportunity \"<strong>{}</strong>\".</p><p><a href=\"{}{}\">View Applications</a></p>",
                ngo_name, opportunity.title, self.base_url, link
            );
            self.dispatch_email(OutboundEmail {
                to: address.to_string(),
                subject,
                text,
                html,
            });
        }
    }

    fn notify_applicant_of_status(
        &self,
        submission: &ApplicationSubmission,
        opportunity: &FundingOpportunity,
        status: ApplicationStatus,
    ) {
        let link = "/my-applications".to_string();
        let message = format!(
            "Status for your application to \"{}\" updated to: {}.",
            opportunity.title,
            status.label()
        );

        self.dispatch_notification(NewNotification {
            recipient_user_id: submission.applicant_user_id.clone(),
            message,
            link: link.clone(),
        });

        let address = match self.profiles.contact_email(&submission.applicant_user_id) {
            Ok(address) => address,
            Err(err) => {
                warn!(error = %err, "skipping status email, applicant address unavailable");
                None
            }
        };

        if let Some(address) = address {
            let subject = format!("Application Status Update for \"{}\"", opportunity.title);
            let text = format!(
                "Hi,\n\nThe status for your application to the funding opportunity \"{}\" has been updated to: {}.\n\nYou can view your applications here: {}{}",
                opportunity.title,
                status.label(),
                self.base_url,
                link
            );
            let html = format!(
                "<p>Hi,</p><p>The status for your application to the funding opportunity \"<strong>{}</strong>\" has been updated to: <strong>{}</strong>.</p><p><a href=\"{}{}\">View My Applications</a></p>",
                opportunity.title,
                status.label(),
                self.base_url,
                link
            );
            self.dispatch_email(OutboundEmail {
                to: address,
                subject,
                text,
                html,
            });
        }
    }

    fn dispatch_notification(&self, notification: NewNotification) {
        if let Err(err) = self.dispatcher.notify(notification) {
            warn!(error = %err, "failed to enqueue in-app notification");
        }
    }

    fn dispatch_email(&self, email: OutboundEmail) {
        let recipient = email.to.clone();
        if let Err(err) = self.dispatcher.email(email) {
            warn!(error = %err, %recipient, "failed to enqueue notification email");
        }
    }
}
