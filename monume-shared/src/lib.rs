//! # MonuMe Shared Library
//!
//! Types, data access and business logic used by the MonuMe tracker API.
//!
//! ## Module Organization
//!
//! - `auth`: Passcode hashing, session tokens and access rules
//! - `db`: Connection pool, migrations and bootstrap data
//! - `email`: Settings store, templates, SMTP transport and dispatcher
//! - `models`: Database models and their queries

pub mod auth;
pub mod db;
pub mod email;
pub mod models;

/// Current version of the MonuMe shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
