//! Select builder for table reads.
//!
//! Produces the query-string pairs the REST layer of the backend expects:
//!
//! ```text
//! select=*&is_active=eq.true&order=account_name.asc&limit=50
//! ```

use std::fmt::Display;

use crate::change_feed::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn suffix(self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: Table,
    select: String,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
}

impl Query {
    /// `select=*` on `table`, no filters.
    pub fn from(table: Table) -> Self {
        Self {
            table,
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Column list, including embedded joins such as `*,people:person_id(name)`.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    /// Equality filter `column = value`.
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Append an ordering key; earlier keys take precedence.
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order
            .push(format!("{}.{}", column, direction.suffix()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs in a stable order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            params.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}
