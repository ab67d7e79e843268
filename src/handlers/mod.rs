//! # HTTP Handlers
//!
//! Request handlers for the API surface:
//! - `auth`: registration/authentication ceremonies and session management
//! - `users`: user profile and listing
//! - `admin`: user-verification mode control
//! - `health`: liveness endpoint

pub mod admin;
pub mod auth;
pub mod health;
pub mod users;
