//! Access to the managed backend.
//!
//! - `client`: the explicitly constructed HTTP client and its token-bound `Store`
//! - `query`: select builder for table reads
//! - `auth`: sign-up, sign-in, sign-out and current-user calls

pub mod auth;
pub mod client;
pub mod query;

pub use client::{BackendClient, ClientError, Store};
pub use query::{Direction, Query};
