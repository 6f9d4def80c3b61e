//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::backend::{BackendClient, ClientError};
use crate::change_feed::ChangeHub;
use crate::config::Config;
use crate::session::SessionRegistry;

/// Everything a request may need. Cloned per request; all fields are shared handles.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: BackendClient,
    pub hub: ChangeHub,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let client = BackendClient::new(&config)?;
        let hub = ChangeHub::new(config.change_feed_capacity);
        Ok(Self {
            config: Arc::new(config),
            client,
            hub,
            sessions: SessionRegistry::new(),
        })
    }
}
