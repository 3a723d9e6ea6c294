#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database connection and pass-through queries for the accident map.
//!
//! The event table is externally owned and loaded out-of-band; this crate
//! only constructs the connection handle that the rest of the system
//! receives by injection, and serves the degenerate reads (distinct state
//! list, table metadata) that involve no filter compilation.

pub mod db;
pub mod queries;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The store could not be reached or refused the connection.
    /// Transient; safe to retry with backoff.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Description of the connection failure.
        message: String,
    },

    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),
}
