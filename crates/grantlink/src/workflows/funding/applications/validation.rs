use serde_json::Value;

use super::domain::AnswerSet;
use crate::workflows::funding::domain::FundingOpportunity;

/// Validation errors raised while checking an answer set against a schema.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("submission answers are required")]
    EmptyAnswers,
    #[error("this opportunity does not accept integrated applications")]
    OpportunityNotIntegrated,
    #[error("missing required field: {0}")]
    MissingRequiredField(String),
}

/// Check a candidate answer set against the opportunity's stored schema.
///
/// Only presence is enforced: answer values are never checked against the
/// field kind, so a number field happily stores free text. Missing required
/// answers are reported one at a time, first in schema order.
pub fn validate_answers(
    opportunity: &FundingOpportunity,
    answers: &AnswerSet,
) -> Result<(), ValidationError> {
    if answers.is_empty() {
        return Err(ValidationError::EmptyAnswers);
    }

    if !opportunity.accepts_integrated_app {
        return Err(ValidationError::OpportunityNotIntegrated);
    }

    for field in opportunity.required_fields() {
        let answered = answers.get(&field.label).is_some_and(has_value);
        if !answered {
            return Err(ValidationError::MissingRequiredField(field.label.clone()));
        }
    }

    Ok(())
}

/// A value counts as answered unless it is null or trims to an empty string.
fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    }
}
