use crate::infra::{
    seed_dev_fixtures, InMemoryNotificationHub, InMemoryOpportunityDirectory,
    InMemoryProfileDirectory, InMemorySubmissionRepository,
};
use clap::Args;
use grantlink::error::AppError;
use grantlink::workflows::funding::applications::{
    ApplicationStatus, IntegratedApplicationService,
};
use grantlink::workflows::funding::{Identity, OpportunityId, Role};
use serde_json::json;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Base URL embedded in the demo notification emails.
    #[arg(long, default_value = "http://localhost:3000")]
    pub(crate) base_url: String,
    /// Print the funder's CSV export of the review queue.
    #[arg(long)]
    pub(crate) show_export: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let opportunities = Arc::new(InMemoryOpportunityDirectory::default());
    let profiles = Arc::new(InMemoryProfileDirectory::default());
    let submissions = Arc::new(InMemorySubmissionRepository::default());
    let hub = Arc::new(InMemoryNotificationHub::default());
    seed_dev_fixtures(&opportunities, &profiles);

    let service = IntegratedApplicationService::new(
        opportunities,
        profiles,
        submissions,
        hub.clone(),
        args.base_url,
    );

    let funder = Identity::new("funder-0001", Role::Funder);
    let ngo = Identity::new("ngo-0001", Role::Ngo);
    let second_ngo = Identity::new("ngo-0002", Role::Ngo);
    let opportunity_id = OpportunityId("opp-0001".to_string());

    println!("Integrated application workflow demo");

    let answers = [
        ("Budget".to_string(), json!("12000")),
        (
            "Project summary".to_string(),
            json!("Flood response kits for riverside communities"),
        ),
    ]
    .into_iter()
    .collect();
    let submission = match service.submit(&ngo, &opportunity_id, answers) {
        Ok(submission) => submission,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- {} applied to {} -> {} (id {})",
        ngo.user_id.0,
        opportunity_id.0,
        submission.status.label(),
        submission.id.0
    );

    let answers = [
        ("Budget".to_string(), json!("8000")),
        (
            "Project summary".to_string(),
            json!("After-school tutoring for displaced families"),
        ),
    ]
    .into_iter()
    .collect();
    match service.submit(&second_ngo, &opportunity_id, answers) {
        Ok(second) => println!(
            "- {} applied to {} -> {} (id {})",
            second_ngo.user_id.0,
            opportunity_id.0,
            second.status.label(),
            second.id.0
        ),
        Err(err) => println!("  Second submission rejected: {err}"),
    }

    let answers = [
        ("Budget".to_string(), json!("9000")),
        (
            "Project summary".to_string(),
            json!("Revised budget for the same project"),
        ),
    ]
    .into_iter()
    .collect();
    match service.submit(&ngo, &opportunity_id, answers) {
        Err(err) => println!("- Duplicate attempt rejected: {err}"),
        Ok(_) => println!("- Duplicate attempt unexpectedly accepted"),
    }

    let queue = match service.opportunity_submissions(&funder, &opportunity_id) {
        Ok(queue) => queue,
        Err(err) => {
            println!("  Review queue unavailable: {err}");
            return Ok(());
        }
    };
    println!("\nReview queue for {} ({} entries)", opportunity_id.0, queue.len());
    for view in &queue {
        let applicant = view
            .applicant_profile
            .as_ref()
            .map(|profile| profile.ngo_name.as_str())
            .unwrap_or("unknown applicant");
        println!(
            "- {} | {} | {}",
            view.submission.id.0,
            applicant,
            view.submission.status.label()
        );
    }

    match service.update_status(&funder, &submission.id, ApplicationStatus::Approved) {
        Ok(updated) => println!("\nApproved {} -> {}", updated.id.0, updated.status.label()),
        Err(err) => println!("\nApproval failed: {err}"),
    }
    if service
        .update_status(&funder, &submission.id, ApplicationStatus::Approved)
        .is_ok()
    {
        println!("Repeated approval accepted (no extra notification below)");
    }

    println!("\nIn-app notifications");
    for note in hub.notifications() {
        println!("- to {}: {}", note.recipient_user_id.0, note.message);
    }

    println!("\nQueued emails");
    let emails = hub.emails();
    if emails.is_empty() {
        println!("- none");
    }
    for email in &emails {
        println!("- to {}: {}", email.to, email.subject);
    }

    if args.show_export {
        match service.export_submissions_csv(&funder, &opportunity_id) {
            Ok(csv) => println!("\nReview queue export\n{csv}"),
            Err(err) => println!("\nExport unavailable: {err}"),
        }
    }

    Ok(())
}
