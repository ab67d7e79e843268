//! # Middleware
//!
//! Request interceptors. Currently only the session-based authentication
//! guard for protected routes.

pub mod auth;
