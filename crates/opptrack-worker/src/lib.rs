//! Background processing for OppTrack.
//!
//! This crate provides:
//! - A worker runner that polls for and executes queued send jobs
//! - A cron scheduler that triggers the periodic digest
//! - A job executor that dispatches jobs to the correct handler
//! - Handlers for notification delivery and digest assembly

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
