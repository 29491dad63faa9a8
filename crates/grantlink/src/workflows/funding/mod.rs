//! Funding opportunity domain and the integrated application workflow.

pub mod applications;
pub mod domain;
pub mod schema;

pub use domain::{
    FieldDefinition, FieldKind, FundingOpportunity, Identity, NgoProfileSnapshot, OpportunityId,
    ProfileId, Role, UserId,
};
pub use schema::{parse_field_schema, resolve_schema_update, SchemaError};
