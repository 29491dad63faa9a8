use serde::{Deserialize, Serialize};

/// Identifier wrapper for platform user accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for funding opportunities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpportunityId(pub String);

/// Identifier wrapper for NGO organizational profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

/// Marketplace role attached to every authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Ngo,
    Funder,
    Provider,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Ngo => "ngo",
            Role::Funder => "funder",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ngo" => Some(Role::Ngo),
            "funder" => Some(Role::Funder),
            "provider" => Some(Role::Provider),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Caller identity supplied explicitly on every core call.
///
/// Token verification happens upstream; the workflow trusts the
/// `(user_id, role)` pair it is handed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role,
        }
    }
}

/// Input widget rendered for a custom application field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Textarea,
    Number,
    Date,
    Url,
    Email,
}

impl FieldKind {
    pub const fn label(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Url => "url",
            FieldKind::Email => "email",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(FieldKind::Text),
            "textarea" => Some(FieldKind::Textarea),
            "number" => Some(FieldKind::Number),
            "date" => Some(FieldKind::Date),
            "url" => Some(FieldKind::Url),
            "email" => Some(FieldKind::Email),
            _ => None,
        }
    }
}

/// One funder-defined custom field within an opportunity's application form.
///
/// Order within the schema is meaningful: it drives rendering order and the
/// order in which missing required answers are reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

/// Directory view of a funding opportunity, reduced to the fields the
/// application workflow reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingOpportunity {
    pub id: OpportunityId,
    pub title: String,
    pub funder_name: String,
    pub funder_user_id: UserId,
    pub funder_email: Option<String>,
    pub accepts_integrated_app: bool,
    /// `Some` only while `accepts_integrated_app` is true.
    pub integrated_app_fields: Option<Vec<FieldDefinition>>,
}

impl FundingOpportunity {
    /// Required fields in schema order; empty when no schema is attached.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.integrated_app_fields
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|field| field.required)
    }
}

/// The applicant organization's profile identity captured at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgoProfileSnapshot {
    pub id: ProfileId,
    pub ngo_name: String,
}
