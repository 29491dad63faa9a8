use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Value};

use crate::workflows::funding::applications::domain::{
    AnswerSet, ApplicationStatus, ApplicationSubmission, SubmissionId,
};
use crate::workflows::funding::applications::repository::{
    DispatchError, NewNotification, NewSubmission, Notification, NotificationDispatcher,
    NotificationId, NotificationInbox, OpportunityDirectory, OutboundEmail, ProfileDirectory,
    RepositoryError, SubmissionRepository,
};
use crate::workflows::funding::applications::service::IntegratedApplicationService;
use crate::workflows::funding::domain::{
    FieldDefinition, FieldKind, FundingOpportunity, Identity, NgoProfileSnapshot, OpportunityId,
    ProfileId, Role, UserId,
};

pub(super) const BASE_URL: &str = "http://localhost:3000";

pub(super) fn funder() -> Identity {
    Identity::new("funder-1", Role::Funder)
}

pub(super) fn other_funder() -> Identity {
    Identity::new("funder-2", Role::Funder)
}

pub(super) fn applicant() -> Identity {
    Identity::new("ngo-1", Role::Ngo)
}

pub(super) fn second_applicant() -> Identity {
    Identity::new("ngo-2", Role::Ngo)
}

pub(super) fn budget_schema() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition {
            label: "Budget".to_string(),
            kind: FieldKind::Number,
            required: true,
        },
        FieldDefinition {
            label: "Notes".to_string(),
            kind: FieldKind::Textarea,
            required: false,
        },
    ]
}

pub(super) fn opportunity() -> FundingOpportunity {
    FundingOpportunity {
        id: OpportunityId("opp-1".to_string()),
        title: "Community Grants 2026".to_string(),
        funder_name: "Open Futures Fund".to_string(),
        funder_user_id: funder().user_id,
        funder_email: Some("grants@openfutures.example".to_string()),
        accepts_integrated_app: true,
        integrated_app_fields: Some(budget_schema()),
    }
}

pub(super) fn answers(pairs: &[(&str, Value)]) -> AnswerSet {
    pairs
        .iter()
        .map(|(label, value)| (label.to_string(), value.clone()))
        .collect()
}

pub(super) fn budget_answers() -> AnswerSet {
    answers(&[("Budget", json!("5000")), ("Notes", json!("ready to start"))])
}

#[derive(Default)]
pub(super) struct MemoryOpportunities {
    records: Mutex<HashMap<OpportunityId, FundingOpportunity>>,
}

impl MemoryOpportunities {
    pub(super) fn seed(&self, opportunity: FundingOpportunity) {
        self.records
            .lock()
            .expect("lock")
            .insert(opportunity.id.clone(), opportunity);
    }

    pub(super) fn remove(&self, id: &OpportunityId) {
        self.records.lock().expect("lock").remove(id);
    }
}

impl OpportunityDirectory for MemoryOpportunities {
    fn fetch(&self, id: &OpportunityId) -> Result<Option<FundingOpportunity>, RepositoryError> {
        Ok(self.records.lock().expect("lock").get(id).cloned())
    }

    fn store_application_form(
        &self,
        id: &OpportunityId,
        accepts_integrated_app: bool,
        fields: Option<Vec<FieldDefinition>>,
    ) -> Result<FundingOpportunity, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        let opportunity = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        opportunity.accepts_integrated_app = accepts_integrated_app;
        opportunity.integrated_app_fields = if accepts_integrated_app { fields } else { None };
        Ok(opportunity.clone())
    }
}

#[derive(Default)]
pub(super) struct MemoryProfiles {
    snapshots: Mutex<HashMap<UserId, NgoProfileSnapshot>>,
    emails: Mutex<HashMap<UserId, String>>,
}

impl MemoryProfiles {
    pub(super) fn seed(&self, user: &Identity, profile_id: &str, ngo_name: &str, email: &str) {
        self.snapshots.lock().expect("lock").insert(
            user.user_id.clone(),
            NgoProfileSnapshot {
                id: ProfileId(profile_id.to_string()),
                ngo_name: ngo_name.to_string(),
            },
        );
        self.emails
            .lock()
            .expect("lock")
            .insert(user.user_id.clone(), email.to_string());
    }
}

impl ProfileDirectory for MemoryProfiles {
    fn snapshot_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<NgoProfileSnapshot>, RepositoryError> {
        Ok(self.snapshots.lock().expect("lock").get(user).cloned())
    }

    fn snapshot(&self, id: &ProfileId) -> Result<Option<NgoProfileSnapshot>, RepositoryError> {
        Ok(self
            .snapshots
            .lock()
            .expect("lock")
            .values()
            .find(|snapshot| &snapshot.id == id)
            .cloned())
    }

    fn contact_email(&self, user: &UserId) -> Result<Option<String>, RepositoryError> {
        Ok(self.emails.lock().expect("lock").get(user).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemorySubmissions {
    records: Mutex<Vec<ApplicationSubmission>>,
    sequence: AtomicU64,
}

impl SubmissionRepository for MemorySubmissions {
    fn insert(&self, new: NewSubmission) -> Result<ApplicationSubmission, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        let duplicate = guard.iter().any(|record| {
            record.funding_opportunity_id == new.funding_opportunity_id
                && record.applicant_user_id == new.applicant_user_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        let record = ApplicationSubmission {
            id: SubmissionId(format!("sub-{id:04}")),
            funding_opportunity_id: new.funding_opportunity_id,
            applicant_user_id: new.applicant_user_id,
            applicant_profile_id: new.applicant_profile_id,
            answers: new.answers,
            status: ApplicationStatus::Submitted,
            submitted_at: now,
            updated_at: now,
        };
        guard.push(record.clone());
        Ok(record)
    }

    fn update(
        &self,
        record: ApplicationSubmission,
    ) -> Result<ApplicationSubmission, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        let slot = guard
            .iter_mut()
            .find(|stored| stored.id == record.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record.clone();
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<ApplicationSubmission>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .iter()
            .find(|record| &record.id == id)
            .cloned())
    }

    fn for_applicant(&self, user: &UserId) -> Result<Vec<ApplicationSubmission>, RepositoryError> {
        let mut records: Vec<ApplicationSubmission> = self
            .records
            .lock()
            .expect("lock")
            .iter()
            .filter(|record| &record.applicant_user_id == user)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.0.cmp(&a.id.0)));
        Ok(records)
    }

    fn for_opportunity(
        &self,
        id: &OpportunityId,
    ) -> Result<Vec<ApplicationSubmission>, RepositoryError> {
        let mut records: Vec<ApplicationSubmission> = self
            .records
            .lock()
            .expect("lock")
            .iter()
            .filter(|record| &record.funding_opportunity_id == id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.0.cmp(&b.id.0)));
        Ok(records)
    }
}

#[derive(Default)]
pub(super) struct MemoryDispatcher {
    notifications: Mutex<Vec<Notification>>,
    emails: Mutex<Vec<OutboundEmail>>,
    sequence: AtomicU64,
}

impl MemoryDispatcher {
    pub(super) fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().expect("lock").clone()
    }

    pub(super) fn emails(&self) -> Vec<OutboundEmail> {
        self.emails.lock().expect("lock").clone()
    }
}

impl NotificationDispatcher for MemoryDispatcher {
    fn notify(&self, notification: NewNotification) -> Result<(), DispatchError> {
        let mut guard = self.notifications.lock().expect("lock");
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        guard.push(Notification {
            id: NotificationId(format!("note-{id:04}")),
            recipient_user_id: notification.recipient_user_id,
            message: notification.message,
            link: notification.link,
            is_read: false,
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn email(&self, email: OutboundEmail) -> Result<(), DispatchError> {
        self.emails.lock().expect("lock").push(email);
        Ok(())
    }
}

impl NotificationInbox for MemoryDispatcher {
    fn unread_for(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let mut rows: Vec<Notification> = self
            .notifications
            .lock()
            .expect("lock")
            .iter()
            .filter(|row| &row.recipient_user_id == user && !row.is_read)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    fn mark_read(&self, user: &UserId, ids: &[NotificationId]) -> Result<usize, RepositoryError> {
        let mut guard = self.notifications.lock().expect("lock");
        let mut updated = 0;
        for row in guard.iter_mut() {
            if &row.recipient_user_id == user && !row.is_read && ids.contains(&row.id) {
                row.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn mark_all_read(&self, user: &UserId) -> Result<usize, RepositoryError> {
        let mut guard = self.notifications.lock().expect("lock");
        let mut updated = 0;
        for row in guard.iter_mut() {
            if &row.recipient_user_id == user && !row.is_read {
                row.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

/// Dispatcher that refuses every call, for failure-isolation tests.
#[derive(Default)]
pub(super) struct FailingDispatcher;

impl NotificationDispatcher for FailingDispatcher {
    fn notify(&self, _notification: NewNotification) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("outbox offline".to_string()))
    }

    fn email(&self, _email: OutboundEmail) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("outbox offline".to_string()))
    }
}

pub(super) type Service<N = MemoryDispatcher> =
    IntegratedApplicationService<MemoryOpportunities, MemoryProfiles, MemorySubmissions, N>;

pub(super) struct Fixture {
    pub(super) service: Service,
    pub(super) opportunities: Arc<MemoryOpportunities>,
    pub(super) submissions: Arc<MemorySubmissions>,
    pub(super) dispatcher: Arc<MemoryDispatcher>,
}

pub(super) fn fixture() -> Fixture {
    let opportunities = Arc::new(MemoryOpportunities::default());
    let profiles = Arc::new(MemoryProfiles::default());
    let submissions = Arc::new(MemorySubmissions::default());
    let dispatcher = Arc::new(MemoryDispatcher::default());

    opportunities.seed(opportunity());
    profiles.seed(&applicant(), "prof-1", "River Relief", "hello@riverrelief.example");
    profiles.seed(
        &second_applicant(),
        "prof-2",
        "Bright Steps",
        "team@brightsteps.example",
    );

    let service = IntegratedApplicationService::new(
        opportunities.clone(),
        profiles.clone(),
        submissions.clone(),
        dispatcher.clone(),
        BASE_URL,
    );

    Fixture {
        service,
        opportunities,
        submissions,
        dispatcher,
    }
}
