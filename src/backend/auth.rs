//! Auth provider calls.
//!
//! Thin wrappers over the backend's auth endpoints:
//! - `POST /auth/v1/signup`
//! - `POST /auth/v1/token?grant_type=password`
//! - `POST /auth/v1/logout`
//! - `GET /auth/v1/user`
//! - `GET /auth/v1/health`

use reqwest::Method;
use serde_json::{Value, json};

use crate::backend::client::{BackendClient, decode, ensure_success};
use crate::error::StoreError;
use crate::models::user::{Session, User};

impl BackendClient {
    /// Register a new user. The display name is stored as user metadata.
    ///
    /// Depending on whether email confirmation is enabled the provider
    /// answers with the bare user or with a session wrapping it; both shapes
    /// are accepted.
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User, StoreError> {
        let response = self
            .request(Method::POST, "auth/v1/signup", None)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "name": name },
            }))
            .send()
            .await?;
        let body: Value = decode(response).await?;
        let user = match body.get("user") {
            Some(user) if !user.is_null() => user.clone(),
            _ => body,
        };
        Ok(serde_json::from_value(user)?)
    }

    /// Password sign-in.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, StoreError> {
        let response = self
            .request(Method::POST, "auth/v1/token", None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        decode(response).await
    }

    /// Revoke the session behind `access_token`.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, "auth/v1/logout", Some(access_token))
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }

    /// Resolve the user owning `access_token`.
    pub async fn current_user(&self, access_token: &str) -> Result<User, StoreError> {
        let response = self
            .request(Method::GET, "auth/v1/user", Some(access_token))
            .send()
            .await?;
        decode(response).await
    }

    /// Probe the auth service; any success status counts as healthy.
    pub async fn health(&self) -> Result<(), StoreError> {
        let response = self
            .request(Method::GET, "auth/v1/health", None)
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }
}
