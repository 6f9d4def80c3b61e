//! People reference list.

use crate::backend::{Direction, Query, Store};
use crate::change_feed::Table;
use crate::error::StoreError;
use crate::models::person::Person;

/// Everyone who can be picked on the add-debt form, ordered by name.
pub async fn get_people(store: &Store) -> Result<Vec<Person>, StoreError> {
    let query = Query::from(Table::People).order("name", Direction::Ascending);
    store.select(&query).await
}

pub async fn get_person_by_id(store: &Store, person_id: &str) -> Result<Person, StoreError> {
    let query = Query::from(Table::People).eq("person_id", person_id);
    store
        .select_one(query, &format!("Person {}", person_id))
        .await
}
