//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle validation, store access and token issuance.

pub mod auth_service;
pub mod email_service;
pub mod signin_service;
pub mod subscriber_service;
