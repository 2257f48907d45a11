//! Opportunity workflow engine.
//!
//! [`requirements`] declares what each workflow status demands of the
//! record; [`service`] merges incoming changes, runs the requirement
//! checks on the merged candidate, and persists only valid states.

pub mod requirements;
pub mod service;

pub use requirements::{EntryPoint, validate_candidate, validate_requested_status};
pub use service::{OpportunityStore, WorkflowService};
