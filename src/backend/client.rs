//! HTTP client for the managed backend.
//!
//! `BackendClient` is built once at startup from `Config` and cloned into the
//! application state; nothing reaches the backend through a global. A `Store`
//! binds the client to one caller's access token so row-level security on the
//! backend sees the right user.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::query::Query;
use crate::change_feed::Table;
use crate::config::Config;
use crate::error::StoreError;

const USER_AGENT: &str = concat!("money_flow/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("could not build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Shared handle to the backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl BackendClient {
    /// Build the client from configuration.
    ///
    /// # Errors
    ///
    /// - `SUPABASE_URL` does not parse as a URL
    /// - the TLS backend of `reqwest` fails to initialise
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let base = url::Url::parse(&config.supabase_url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        })
    }

    /// Table access on behalf of a signed-in user.
    pub fn store(&self, access_token: impl Into<String>) -> Store {
        Store {
            client: self.clone(),
            access_token: Some(access_token.into()),
        }
    }

    /// Table access with only the public key.
    pub fn anonymous(&self) -> Store {
        Store {
            client: self.clone(),
            access_token: None,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request carrying the API key and a bearer token.
    ///
    /// Without a user token the anon key doubles as the bearer, which is what
    /// the backend expects for public calls.
    pub(crate) fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.anon_key);
        self.http
            .request(method, self.url(path))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }
}

/// Token-bound view of the backend tables.
#[derive(Debug, Clone)]
pub struct Store {
    client: BackendClient,
    access_token: Option<String>,
}

impl Store {
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn table_request(&self, method: Method, table: Table) -> RequestBuilder {
        self.client.request(
            method,
            &format!("rest/v1/{}", table.name()),
            self.access_token(),
        )
    }

    /// Run a select and decode every row.
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        let response = self
            .table_request(Method::GET, query.table())
            .query(&query.to_params())
            .send()
            .await?;
        decode(response).await
    }

    /// First row of a select, or `NotFound` when nothing matches.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        query: Query,
        what: &str,
    ) -> Result<T, StoreError> {
        let rows: Vec<T> = self.select(&query.limit(1)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(what.to_string()))
    }

    /// Insert rows and return them as stored.
    pub async fn insert<B, T>(&self, table: Table, rows: &[B]) -> Result<Vec<T>, StoreError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .table_request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;
        decode(response).await
    }

    /// Patch the rows where `column = value` and return them.
    pub async fn update<B, T>(
        &self,
        table: Table,
        column: &str,
        value: &str,
        body: &B,
    ) -> Result<Vec<T>, StoreError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .table_request(Method::PATCH, table)
            .query(&[(column, format!("eq.{}", value))])
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    /// Delete the rows where `column = value`.
    pub async fn delete(&self, table: Table, column: &str, value: &str) -> Result<(), StoreError> {
        let response = self
            .table_request(Method::DELETE, table)
            .query(&[(column, format!("eq.{}", value))])
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }

    /// Call a stored procedure and return whatever it returns.
    pub async fn rpc<A: Serialize>(&self, function: &str, args: &A) -> Result<Value, StoreError> {
        let response = self
            .client
            .request(
                Method::POST,
                &format!("rest/v1/rpc/{}", function),
                self.access_token(),
            )
            .json(args)
            .send()
            .await?;
        let body = ensure_success(response).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Decode a JSON body after checking the status.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let body = ensure_success(response).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Read the body, turning a non-success status into `StoreError::Api`.
pub(crate) async fn ensure_success(response: Response) -> Result<String, StoreError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }

    Err(StoreError::Api {
        status: status.as_u16(),
        message: error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string()),
    })
}

/// Pull the human-readable message out of a backend error body.
///
/// The REST layer uses `message`; the auth layer uses `msg`,
/// `error_description` or `error` depending on the endpoint.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        Err(_) => (!trimmed.is_empty()).then(|| trimmed.to_string()),
    }
}
