//! Core library for the NGO marketplace integrated application workflow.
//!
//! Funders attach custom field schemas to their funding opportunities, NGOs
//! submit answer sets against those schemas, and the owning funder drives each
//! submission through its review lifecycle. Storage, identity, and outbound
//! notification delivery are collaborator traits so the workflow can run
//! against any backing infrastructure.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
