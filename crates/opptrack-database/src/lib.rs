//! # opptrack-database
//!
//! PostgreSQL connection management and concrete repository
//! implementations for all OppTrack entities.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::connect;
pub use migration::run_migrations;
