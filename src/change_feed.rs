//! Typed change feed for backend tables.
//!
//! The backend pushes one database webhook per row change. Each payload is
//! verified, then published on a per-table `broadcast` channel held by
//! `ChangeHub`. Consumers hold a `Subscription<T>` that decodes the raw
//! payload into `ChangeEvent<T>`; dropping the subscription (or calling
//! `unsubscribe`) releases the listener.
//!
//! # Payload
//!
//! ```json
//! {
//!   "type": "UPDATE",
//!   "table": "debt_ledger",
//!   "schema": "public",
//!   "record": { "ledger_id": "DEB-1", "sum_debt": 50, ... },
//!   "old_record": { "ledger_id": "DEB-1" }
//! }
//! ```
//!
//! # Signature
//!
//! Every payload carries `X-Webhook-Signature: sha256=<hex>`, the
//! HMAC-SHA256 of the raw body keyed with the shared feed secret.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Logical backend tables the application reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Accounts,
    Transactions,
    DebtLedger,
    People,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Accounts,
        Table::Transactions,
        Table::DebtLedger,
        Table::People,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Accounts => "accounts",
            Table::Transactions => "transactions",
            Table::DebtLedger => "debt_ledger",
            Table::People => "people",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// A row type that lives in a backend table and can be patched by key.
pub trait Record: DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: Table;

    /// Primary key column name
    const KEY: &'static str;

    fn key(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Change payload exactly as delivered by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,

    pub table: String,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub record: Option<Value>,

    #[serde(default)]
    pub old_record: Option<Value>,
}

/// Typed change for one record type.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    Insert(T),
    Update(T),
    /// Deletes only carry the primary key of the removed row.
    Delete { key: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{0:?} event without a record")]
    MissingRecord(ChangeKind),

    #[error("delete event without `{0}` in old_record")]
    MissingKey(&'static str),

    #[error("record does not match the table schema: {0}")]
    Shape(#[from] serde_json::Error),
}

impl<T: Record> ChangeEvent<T> {
    /// Decode a raw payload into a typed event.
    pub fn decode(raw: &RawChange) -> Result<Self, DecodeError> {
        match raw.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let record = raw
                    .record
                    .clone()
                    .ok_or(DecodeError::MissingRecord(raw.kind))?;
                let record: T = serde_json::from_value(record)?;
                Ok(if raw.kind == ChangeKind::Insert {
                    ChangeEvent::Insert(record)
                } else {
                    ChangeEvent::Update(record)
                })
            }
            ChangeKind::Delete => {
                let key = raw
                    .old_record
                    .as_ref()
                    .and_then(|old| old.get(T::KEY))
                    .and_then(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .ok_or(DecodeError::MissingKey(T::KEY))?;
                Ok(ChangeEvent::Delete { key })
            }
        }
    }
}

/// What a subscription hands back on each poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    Event(ChangeEvent<T>),
    /// The receiver fell behind and this many events were dropped.
    Lagged(u64),
}

/// Fan-out point for change events, one broadcast channel per table.
///
/// Cloning the hub shares the same channels.
#[derive(Debug, Clone)]
pub struct ChangeHub {
    channels: Arc<HashMap<Table, broadcast::Sender<Arc<RawChange>>>>,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let channels = Table::ALL
            .into_iter()
            .map(|table| (table, broadcast::channel(capacity.max(1)).0))
            .collect();
        Self {
            channels: Arc::new(channels),
        }
    }

    /// Publish a payload to its table's subscribers.
    ///
    /// Returns the table and the number of listeners reached, or `None`
    /// when the payload names a table the application does not track.
    pub fn publish(&self, raw: RawChange) -> Option<(Table, usize)> {
        let table = Table::parse(&raw.table)?;
        let sender = self.channels.get(&table)?;
        // send only fails when nobody listens
        let reached = sender.send(Arc::new(raw)).unwrap_or(0);
        Some((table, reached))
    }

    pub fn subscribe<T: Record>(&self) -> Subscription<T> {
        let receiver = self
            .channels
            .get(&T::TABLE)
            .map(|sender| sender.subscribe());
        let subscription = Subscription {
            id: Uuid::new_v4(),
            table: T::TABLE,
            receiver,
            _record: PhantomData,
        };
        tracing::debug!(
            subscription = %subscription.id,
            table = T::TABLE.name(),
            "change feed subscribed"
        );
        subscription
    }

    pub fn subscriber_count(&self, table: Table) -> usize {
        self.channels
            .get(&table)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

/// Live listener on one table. Owned by the consumer; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    id: Uuid,
    table: Table,
    receiver: Option<broadcast::Receiver<Arc<RawChange>>>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Subscription<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Wait for the next event. Returns `None` once unsubscribed or the hub is gone.
    ///
    /// Payloads that fail to decode are logged and skipped.
    pub async fn recv(&mut self) -> Option<Delivery<T>> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(raw) => {
                    if let Some(event) = self.decode(&raw) {
                        return Some(Delivery::Event(event));
                    }
                }
                Err(RecvError::Lagged(missed)) => return Some(Delivery::Lagged(missed)),
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Take the next already-buffered event without waiting.
    pub fn try_next(&mut self) -> Option<Delivery<T>> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.try_recv() {
                Ok(raw) => {
                    if let Some(event) = self.decode(&raw) {
                        return Some(Delivery::Event(event));
                    }
                }
                Err(TryRecvError::Lagged(missed)) => return Some(Delivery::Lagged(missed)),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Release the listener now instead of at drop.
    pub fn unsubscribe(mut self) {
        self.receiver.take();
    }

    fn decode(&self, raw: &RawChange) -> Option<ChangeEvent<T>> {
        match ChangeEvent::<T>::decode(raw) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(
                    subscription = %self.id,
                    table = self.table.name(),
                    error = %e,
                    "skipping undecodable change event"
                );
                None
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        tracing::debug!(
            subscription = %self.id,
            table = self.table.name(),
            "change feed unsubscribed"
        );
    }
}

/// Generate the signature header value for a payload.
///
/// # Format
///
/// `sha256=<hex_encoded_hmac>`
pub fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Check a signature header against the raw body in constant time.
pub fn verify_signature(secret: &str, payload: &[u8], header: &str) -> bool {
    let Some(digest) = header.trim().strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}
