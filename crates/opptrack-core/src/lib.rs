//! # opptrack-core
//!
//! Core crate for OppTrack. Contains configuration schemas, domain
//! events, field-level validation errors, and the unified error system.
//!
//! This crate has **no** internal dependencies on other OppTrack crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
