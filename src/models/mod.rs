//! Data models representing database entities and API bodies.
//!
//! This module contains all data structures that map to database tables.

/// Sign-in request/response bodies
pub mod signin;
/// Subscriber aggregate model
pub mod subscriber;
