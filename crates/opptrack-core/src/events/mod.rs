//! Domain events emitted by OppTrack operations.
//!
//! The persistence hook passes an [`OpportunitySaved`] event to the
//! notification dispatcher by explicit method call. A save is either a
//! creation or an update, never both, so the dispatcher's two branches
//! are mutually exclusive.

pub mod opportunity;

pub use opportunity::OpportunitySaved;
