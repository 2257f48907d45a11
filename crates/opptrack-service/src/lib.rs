//! Business services for OppTrack.
//!
//! The workflow engine validates and persists opportunity state changes;
//! the notification dispatcher turns persisted changes into queued
//! delivery jobs. Services own no connection state of their own; they
//! compose repositories from `opptrack-database`.

pub mod attachment;
pub mod context;
pub mod notification;
pub mod subscription;
pub mod workflow;

pub use context::RequestContext;
