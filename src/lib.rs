//! Money Flow: personal finance service over a managed backend.
//!
//! Tracks accounts, transactions, debts and repayments. Records live in a
//! hosted Postgres reached through its REST, RPC and auth endpoints; this
//! service validates forms, computes page totals and keeps each signed-in
//! session's pages live from the backend's change feed.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Backend**: REST/RPC/auth over `reqwest`
//! - **Live updates**: signed database webhooks fanned out over `broadcast`
//! - **Format**: JSON requests/responses

pub mod aggregates;
pub mod app;
pub mod backend;
pub mod change_feed;
pub mod config;
pub mod error;
pub mod format;
pub mod forms;
pub mod handlers;
pub mod live;
pub mod middleware;
pub mod models;
pub mod pages;
pub mod services;
pub mod session;
pub mod state;
pub mod validation;
pub mod views;
