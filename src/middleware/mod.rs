//! HTTP middleware components.
//!
//! Middleware run before route handlers. They can:
//! - Resolve the caller's session
//! - Short-circuit requests (redirect to the sign-in page)

/// Session resolution middleware
pub mod auth;
