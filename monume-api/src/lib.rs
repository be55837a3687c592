//! # MonuMe Tracker API Server Library
//!
//! HTTP surface of the MonuMe employee-performance tracker.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder and session guard
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
