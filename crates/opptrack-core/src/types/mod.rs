//! Shared value types used across OppTrack crates.

pub mod field_errors;

pub use field_errors::FieldErrors;
