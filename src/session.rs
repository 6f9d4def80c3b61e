//! Sessions and per-session workspaces.
//!
//! `SessionHolder` owns the current auth state of one browser session and
//! publishes every change on a `watch` channel. `SessionRegistry` maps the
//! access token carried by the `mf_session` cookie to that session's
//! `Workspace`: its holder, its mounted live pages and the forms currently
//! being submitted.
//!
//! A workspace is trusted for a bounded time before the auth provider is
//! asked about its token again. Workspaces nobody has used for a while are
//! swept out of the registry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use crate::backend::{BackendClient, Store};
use crate::error::{AppError, StoreError};
use crate::forms::FormKind;
use crate::forms::login::Credentials;
use crate::forms::signup::Registration;
use crate::models::user::User;
use crate::pages::Pages;
use crate::services::auth_service;

/// Signed-in identity: the token the backend issued and who it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSession {
    #[serde(skip)]
    pub access_token: String,
    pub user: User,
}

/// Current auth state of one session, observable through `subscribe`.
#[derive(Debug)]
pub struct SessionHolder {
    client: BackendClient,
    current: watch::Sender<Option<ActiveSession>>,
}

impl SessionHolder {
    pub fn new(client: BackendClient) -> Self {
        let (current, _) = watch::channel(None);
        Self { client, current }
    }

    /// Password sign-in. On success the new session is published.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<ActiveSession, StoreError> {
        let session = auth_service::sign_in(&self.client, credentials).await?;
        let active = ActiveSession {
            access_token: session.access_token,
            user: session.user,
        };
        self.current.send_replace(Some(active.clone()));
        tracing::info!(user = %active.user.id, "signed in");
        Ok(active)
    }

    /// Register a new user. The session stays signed out until the user
    /// confirms their email and signs in.
    pub async fn sign_up(&self, registration: &Registration) -> Result<User, StoreError> {
        auth_service::sign_up(&self.client, registration).await
    }

    /// Revoke the session with the provider, then clear it locally.
    ///
    /// When the provider refuses, the local session is kept and the error returned.
    pub async fn sign_out(&self) -> Result<(), StoreError> {
        let Some(active) = self.current() else {
            return Ok(());
        };
        auth_service::sign_out(&self.client, &active.access_token).await?;
        self.current.send_replace(None);
        tracing::info!(user = %active.user.id, "signed out");
        Ok(())
    }

    /// Re-establish the session behind a previously issued token.
    ///
    /// Returns the user, or `None` (logged, not surfaced) when the provider
    /// does not recognise the token.
    pub async fn restore(&self, access_token: &str) -> Option<User> {
        let user = auth_service::get_current_user(&self.client, access_token).await?;
        self.current.send_replace(Some(ActiveSession {
            access_token: access_token.to_string(),
            user: user.clone(),
        }));
        Some(user)
    }

    pub fn current(&self) -> Option<ActiveSession> {
        self.current.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.current.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Watch auth state changes. The receiver sees the current value first.
    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveSession>> {
        self.current.subscribe()
    }

    /// Table access on behalf of the signed-in user.
    pub fn store(&self) -> Option<Store> {
        self.current
            .borrow()
            .as_ref()
            .map(|s| self.client.store(s.access_token.clone()))
    }
}

/// Everything the server keeps for one signed-in session.
#[derive(Debug)]
pub struct Workspace {
    session: SessionHolder,
    pages: tokio::sync::Mutex<Pages>,
    in_flight: Mutex<HashSet<FormKind>>,

    /// Last time the auth provider confirmed the token
    verified_at: Mutex<Instant>,

    /// Last request made with this session
    last_seen: Mutex<Instant>,
}

impl Workspace {
    /// A workspace for a token the provider has just confirmed.
    pub fn new(session: SessionHolder, transaction_limit: usize) -> Self {
        let now = Instant::now();
        Self {
            session,
            pages: tokio::sync::Mutex::new(Pages::new(transaction_limit)),
            in_flight: Mutex::new(HashSet::new()),
            verified_at: Mutex::new(now),
            last_seen: Mutex::new(now),
        }
    }

    /// Record a request made with this session.
    pub fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    /// True once the token was last confirmed at least `max_age` ago.
    pub fn needs_revalidation(&self, max_age: Duration) -> bool {
        self.verified_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
            >= max_age
    }

    pub fn mark_verified(&self) {
        *self.verified_at.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn session(&self) -> &SessionHolder {
        &self.session
    }

    pub fn pages(&self) -> &tokio::sync::Mutex<Pages> {
        &self.pages
    }

    /// Claim the right to submit `kind` until the guard drops.
    ///
    /// # Errors
    ///
    /// `AppError::SubmissionInFlight` when the same form is already being
    /// submitted from this session.
    pub fn begin_submit(&self, kind: FormKind) -> Result<SubmitGuard<'_>, AppError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(kind) {
            tracing::debug!(form = ?kind, "rejecting concurrent submission");
            return Err(AppError::SubmissionInFlight);
        }
        Ok(SubmitGuard {
            in_flight: &self.in_flight,
            kind,
        })
    }

    pub fn is_submitting(&self, kind: FormKind) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind)
    }
}

/// Marks a form as being submitted; releases it on drop.
#[derive(Debug)]
pub struct SubmitGuard<'a> {
    in_flight: &'a Mutex<HashSet<FormKind>>,
    kind: FormKind,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.kind);
    }
}

/// Access token → workspace. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    workspaces: Arc<RwLock<HashMap<String, Arc<Workspace>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, access_token: &str) -> Option<Arc<Workspace>> {
        self.workspaces.read().await.get(access_token).cloned()
    }

    /// Register a workspace under its token, replacing any previous one.
    pub async fn insert(&self, access_token: String, workspace: Workspace) -> Arc<Workspace> {
        let workspace = Arc::new(workspace);
        self.workspaces
            .write()
            .await
            .insert(access_token, workspace.clone());
        workspace
    }

    /// Forget a session and unmount its pages.
    pub async fn remove(&self, access_token: &str) -> Option<Arc<Workspace>> {
        let workspace = self.workspaces.write().await.remove(access_token)?;
        workspace.pages().lock().await.unmount_all();
        Some(workspace)
    }

    /// Drop every session unused for at least `max_idle`, unmounting its
    /// pages. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted: Vec<Arc<Workspace>> = {
            let mut workspaces = self.workspaces.write().await;
            let idle: Vec<String> = workspaces
                .iter()
                .filter(|(_, workspace)| workspace.idle_for() >= max_idle)
                .map(|(token, _)| token.clone())
                .collect();
            idle.iter()
                .filter_map(|token| workspaces.remove(token))
                .collect()
        };
        for workspace in &evicted {
            workspace.pages().lock().await.unmount_all();
        }
        evicted.len()
    }

    pub async fn len(&self) -> usize {
        self.workspaces.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workspaces.read().await.is_empty()
    }
}

/// Periodically drop sessions idle for `max_idle`.
pub fn spawn_idle_sweeper(registry: SessionRegistry, max_idle: Duration) -> JoinHandle<()> {
    let period = (max_idle / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = registry.evict_idle(max_idle).await;
            if evicted > 0 {
                tracing::info!(evicted, "idle sessions dropped");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn holder() -> SessionHolder {
        let client = BackendClient::new(&Config::for_backend("http://127.0.0.1:9", "anon")).unwrap();
        SessionHolder::new(client)
    }

    #[test]
    fn new_holder_is_signed_out() {
        let holder = holder();
        assert!(!holder.is_authenticated());
        assert!(holder.store().is_none());
        assert!(holder.subscribe().borrow().is_none());
    }

    #[test]
    fn second_submit_of_same_form_is_rejected_until_the_first_ends() {
        let workspace = Workspace::new(holder(), 10);
        let guard = workspace.begin_submit(FormKind::Transaction).unwrap();
        assert!(matches!(
            workspace.begin_submit(FormKind::Transaction),
            Err(AppError::SubmissionInFlight)
        ));
        // other forms are independent
        assert!(workspace.begin_submit(FormKind::Debt).is_ok());
        drop(guard);
        assert!(!workspace.is_submitting(FormKind::Transaction));
        assert!(workspace.begin_submit(FormKind::Transaction).is_ok());
    }

    #[tokio::test]
    async fn removing_a_session_forgets_it() {
        let registry = SessionRegistry::new();
        registry
            .insert("token".to_string(), Workspace::new(holder(), 10))
            .await;
        assert!(registry.get("token").await.is_some());
        assert!(registry.remove("token").await.is_some());
        assert!(registry.get("token").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn sign_out_without_session_is_a_no_op() {
        assert!(holder().sign_out().await.is_ok());
    }

    #[test]
    fn fresh_workspace_is_trusted_until_its_max_age() {
        let workspace = Workspace::new(holder(), 10);
        assert!(!workspace.needs_revalidation(Duration::from_secs(60)));
        assert!(workspace.needs_revalidation(Duration::ZERO));
        workspace.mark_verified();
        assert!(!workspace.needs_revalidation(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_and_unmounted() {
        let registry = SessionRegistry::new();
        let hub = crate::change_feed::ChangeHub::new(8);
        let store = holder().client.store("token");
        let idle = registry
            .insert("idle".to_string(), Workspace::new(holder(), 10))
            .await;
        // mounting fails to fetch from the unreachable backend but still subscribes
        idle.pages().lock().await.sync_accounts(&hub, &store).await;
        assert_eq!(hub.subscriber_count(crate::change_feed::Table::Accounts), 1);

        assert_eq!(registry.evict_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.evict_idle(Duration::ZERO).await, 1);
        assert!(registry.is_empty().await);
        assert_eq!(hub.subscriber_count(crate::change_feed::Table::Accounts), 0);
    }
}
