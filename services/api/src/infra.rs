use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use grantlink::workflows::funding::applications::{
    ApplicationStatus, ApplicationSubmission, DispatchError, NewNotification, NewSubmission,
    Notification, NotificationDispatcher, NotificationId, NotificationInbox, OpportunityDirectory,
    OutboundEmail, ProfileDirectory, RepositoryError, SubmissionId, SubmissionRepository,
};
use grantlink::workflows::funding::{
    FieldDefinition, FieldKind, FundingOpportunity, NgoProfileSnapshot, OpportunityId, ProfileId,
    UserId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryOpportunityDirectory {
    records: Mutex<HashMap<OpportunityId, FundingOpportunity>>,
}

impl InMemoryOpportunityDirectory {
    pub(crate) fn seed(&self, opportunity: FundingOpportunity) {
        self.records
            .lock()
            .expect("opportunity mutex poisoned")
            .insert(opportunity.id.clone(), opportunity);
    }
}

impl OpportunityDirectory for InMemoryOpportunityDirectory {
    fn fetch(&self, id: &OpportunityId) -> Result<Option<FundingOpportunity>, RepositoryError> {
        let guard = self.records.lock().expect("opportunity mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn store_application_form(
        &self,
        id: &OpportunityId,
        accepts_integrated_app: bool,
        fields: Option<Vec<FieldDefinition>>,
    ) -> Result<FundingOpportunity, RepositoryError> {
        let mut guard = self.records.lock().expect("opportunity mutex poisoned");
        let opportunity = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        opportunity.accepts_integrated_app = accepts_integrated_app;
        opportunity.integrated_app_fields = if accepts_integrated_app { fields } else { None };
        Ok(opportunity.clone())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryProfileDirectory {
    snapshots: Mutex<HashMap<UserId, NgoProfileSnapshot>>,
    emails: Mutex<HashMap<UserId, String>>,
}

impl InMemoryProfileDirectory {
    pub(crate) fn seed(&self, user_id: &str, profile_id: &str, ngo_name: &str, email: &str) {
        let user = UserId(user_id.to_string());
        self.snapshots.lock().expect("profile mutex poisoned").insert(
            user.clone(),
            NgoProfileSnapshot {
                id: ProfileId(profile_id.to_string()),
                ngo_name: ngo_name.to_string(),
            },
        );
        self.emails
            .lock()
            .expect("profile mutex poisoned")
            .insert(user, email.to_string());
    }

    pub(crate) fn seed_email(&self, user_id: &str, email: &str) {
        self.emails
            .lock()
            .expect("profile mutex poisoned")
            .insert(UserId(user_id.to_string()), email.to_string());
    }
}

impl ProfileDirectory for InMemoryProfileDirectory {
    fn snapshot_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<NgoProfileSnapshot>, RepositoryError> {
        let guard = self.snapshots.lock().expect("profile mutex poisoned");
        Ok(guard.get(user).cloned())
    }

    fn snapshot(&self, id: &ProfileId) -> Result<Option<NgoProfileSnapshot>, RepositoryError> {
        let guard = self.snapshots.lock().expect("profile mutex poisoned");
        Ok(guard.values().find(|snapshot| &snapshot.id == id).cloned())
    }

    fn contact_email(&self, user: &UserId) -> Result<Option<String>, RepositoryError> {
        let guard = self.emails.lock().expect("profile mutex poisoned");
        Ok(guard.get(user).cloned())
    }
}

#[derive(Default)]
pub(crate) struct InMemorySubmissionRepository {
    records: Mutex<Vec<ApplicationSubmission>>,
    sequence: AtomicU64,
}

impl SubmissionRepository for InMemorySubmissionRepository {
    fn insert(&self, new: NewSubmission) -> Result<ApplicationSubmission, RepositoryError> {
        // Check and write under one lock so concurrent duplicates cannot both
        // land; this stands in for a database unique constraint.
        let mut guard = self.records.lock().expect("submission mutex poisoned");
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
            id: SubmissionId(format!("sub-{id:06}")),
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
        let mut guard = self.records.lock().expect("submission mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|stored| stored.id == record.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record.clone();
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<ApplicationSubmission>, RepositoryError> {
        let guard = self.records.lock().expect("submission mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn for_applicant(&self, user: &UserId) -> Result<Vec<ApplicationSubmission>, RepositoryError> {
        let guard = self.records.lock().expect("submission mutex poisoned");
        let mut records: Vec<ApplicationSubmission> = guard
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
        let guard = self.records.lock().expect("submission mutex poisoned");
        let mut records: Vec<ApplicationSubmission> = guard
            .iter()
            .filter(|record| &record.funding_opportunity_id == id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.0.cmp(&b.id.0)));
        Ok(records)
    }
}

/// In-app notification store doubling as the outbound dispatch queue. Emails
/// are held for inspection; a real deployment would drain them through an
/// SMTP relay.
#[derive(Default)]
pub(crate) struct InMemoryNotificationHub {
    notifications: Mutex<Vec<Notification>>,
    emails: Mutex<Vec<OutboundEmail>>,
    sequence: AtomicU64,
}

impl InMemoryNotificationHub {
    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }

    pub(crate) fn emails(&self) -> Vec<OutboundEmail> {
        self.emails.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationDispatcher for InMemoryNotificationHub {
    fn notify(&self, notification: NewNotification) -> Result<(), DispatchError> {
        let mut guard = self
            .notifications
            .lock()
            .expect("notification mutex poisoned");
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        guard.push(Notification {
            id: NotificationId(format!("note-{id:06}")),
            recipient_user_id: notification.recipient_user_id,
            message: notification.message,
            link: notification.link,
            is_read: false,
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn email(&self, email: OutboundEmail) -> Result<(), DispatchError> {
        info!(to = %email.to, subject = %email.subject, "queueing notification email");
        self.emails
            .lock()
            .expect("notification mutex poisoned")
            .push(email);
        Ok(())
    }
}

impl NotificationInbox for InMemoryNotificationHub {
    fn unread_for(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let guard = self
            .notifications
            .lock()
            .expect("notification mutex poisoned");
        let mut rows: Vec<Notification> = guard
            .iter()
            .filter(|row| &row.recipient_user_id == user && !row.is_read)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    fn mark_read(&self, user: &UserId, ids: &[NotificationId]) -> Result<usize, RepositoryError> {
        let mut guard = self
            .notifications
            .lock()
            .expect("notification mutex poisoned");
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
        let mut guard = self
            .notifications
            .lock()
            .expect("notification mutex poisoned");
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

/// Seed a small marketplace so the API is exercisable without a database.
pub(crate) fn seed_dev_fixtures(
    opportunities: &InMemoryOpportunityDirectory,
    profiles: &InMemoryProfileDirectory,
) {
    opportunities.seed(FundingOpportunity {
        id: OpportunityId("opp-0001".to_string()),
        title: "Community Grants 2026".to_string(),
        funder_name: "Open Futures Fund".to_string(),
        funder_user_id: UserId("funder-0001".to_string()),
        funder_email: Some("grants@openfutures.example".to_string()),
        accepts_integrated_app: true,
        integrated_app_fields: Some(vec![
            FieldDefinition {
                label: "Budget".to_string(),
                kind: FieldKind::Number,
                required: true,
            },
            FieldDefinition {
                label: "Project summary".to_string(),
                kind: FieldKind::Textarea,
                required: true,
            },
            FieldDefinition {
                label: "Website".to_string(),
                kind: FieldKind::Url,
                required: false,
            },
        ]),
    });
    opportunities.seed(FundingOpportunity {
        id: OpportunityId("opp-0002".to_string()),
        title: "Water Access Initiative".to_string(),
        funder_name: "Clearwater Trust".to_string(),
        funder_user_id: UserId("funder-0002".to_string()),
        funder_email: None,
        accepts_integrated_app: false,
        integrated_app_fields: None,
    });

    profiles.seed(
        "ngo-0001",
        "prof-0001",
        "River Relief",
        "hello@riverrelief.example",
    );
    profiles.seed(
        "ngo-0002",
        "prof-0002",
        "Bright Steps",
        "team@brightsteps.example",
    );
    profiles.seed_email("funder-0001", "grants@openfutures.example");

    info!("seeded development fixtures: 2 opportunities, 2 NGO profiles");
}
