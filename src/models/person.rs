//! People referenced by debt entries.
//!
//! Read-only reference data: used to fill selection lists and to join
//! human-readable names onto ledger rows.

use serde::{Deserialize, Serialize};

use crate::change_feed::{Record, Table};

/// Row of the `people` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub person_id: String,
    pub name: String,
}

impl Record for Person {
    const TABLE: Table = Table::People;
    const KEY: &'static str = "person_id";

    fn key(&self) -> &str {
        &self.person_id
    }
}
