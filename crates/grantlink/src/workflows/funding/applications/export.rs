//! CSV rendering of a funder's review queue.

use serde_json::Value;

use super::repository::OpportunitySubmissionView;
use crate::workflows::funding::domain::FieldDefinition;

/// Render submissions as CSV with one column per schema field, in schema
/// order, preceded by the fixed identity columns.
pub fn render_submissions_csv(
    schema: &[FieldDefinition],
    views: &[OpportunitySubmissionView],
) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "submission_id".to_string(),
        "applicant".to_string(),
        "applicant_email".to_string(),
        "status".to_string(),
        "submitted_at".to_string(),
    ];
    header.extend(schema.iter().map(|field| field.label.clone()));
    writer.write_record(&header)?;

    for view in views {
        let mut row = vec![
            view.submission.id.0.clone(),
            view.applicant_profile
                .as_ref()
                .map(|profile| profile.ngo_name.clone())
                .unwrap_or_default(),
            view.applicant_email.clone().unwrap_or_default(),
            view.submission.status.label().to_string(),
            view.submission.submitted_at.to_rfc3339(),
        ];
        for field in schema {
            let cell = view
                .submission
                .answers
                .get(&field.label)
                .map(render_answer)
                .unwrap_or_default();
            row.push(cell);
        }
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn render_answer(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
