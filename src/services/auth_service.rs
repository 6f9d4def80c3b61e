//! Auth provider operations.
//!
//! Failures of `get_current_user` are logged and read as "no session";
//! the others surface their message to the caller.

use crate::backend::BackendClient;
use crate::error::StoreError;
use crate::forms::login::Credentials;
use crate::forms::signup::Registration;
use crate::models::user::{Session, User};

pub async fn sign_up(client: &BackendClient, registration: &Registration) -> Result<User, StoreError> {
    let user = client
        .sign_up(&registration.email, &registration.password, &registration.name)
        .await?;
    tracing::info!(user = %user.id, "signup successful, confirmation email sent");
    Ok(user)
}

pub async fn sign_in(client: &BackendClient, credentials: &Credentials) -> Result<Session, StoreError> {
    client
        .sign_in(&credentials.email, &credentials.password)
        .await
}

pub async fn sign_out(client: &BackendClient, access_token: &str) -> Result<(), StoreError> {
    client.sign_out(access_token).await
}

/// The user behind `access_token`, or `None` when the token is unknown or
/// the provider cannot be reached.
pub async fn get_current_user(client: &BackendClient, access_token: &str) -> Option<User> {
    match client.current_user(access_token).await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "error getting current user");
            None
        }
    }
}
