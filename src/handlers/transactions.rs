//! Transaction HTTP handlers.
//!
//! - GET /transactions - Latest transactions, newest first, plus the add form
//! - POST /transactions - Add a transaction
//! - DELETE /transactions/{id} - Delete a transaction

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use crate::{
    error::{AppError, Outcome},
    forms::{FormController, FormInput, submit, transaction::TransactionForm},
    handlers::{store_for, today},
    middleware::auth::CurrentSession,
    models::transaction::Transaction,
    pages::TransactionsView,
    services::transaction_service,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub transaction_id: String,
}

/// Render the transactions table.
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<Outcome<TransactionsView>>, AppError> {
    let store = store_for(&state, &session);
    let mut pages = session.workspace.pages().lock().await;
    let view = pages.transactions_view(&state.hub, &store, today()).await;
    if pages.token_refused() {
        return Err(AppError::Unauthenticated);
    }
    Ok(Json(Outcome::ok(view)))
}

/// Add a transaction.
///
/// # Request Body
///
/// ```json
/// {
///   "date": "2024-06-10",
///   "amount": "45000",
///   "txn_type": "EXPENSE",
///   "from_account_id": "ACC-1",
///   "category_id": "FOOD",
///   "notes": "Lunch"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the stored transaction
/// - **Error (422)**: field errors, nothing was sent
/// - **Error (409)**: the same form is already being submitted
/// - **Error (502)**: the backend refused the insert
///
/// The table picks the new row up from the change feed.
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Json(input): Json<FormInput>,
) -> Result<(StatusCode, Json<Outcome<Transaction>>), AppError> {
    let _guard = session
        .workspace
        .begin_submit(TransactionForm::KIND)?;

    let mut form = TransactionForm::new(today());
    form.fill(input);

    let store = store_for(&state, &session);
    let transaction = submit(&mut form, |payload| async move {
        transaction_service::create_transaction(&store, &payload).await
    })
    .await?;

    tracing::info!(transaction = %transaction.transaction_id, "transaction added");
    Ok((StatusCode::CREATED, Json(Outcome::ok(transaction))))
}

/// Delete a transaction by id.
pub async fn delete_transaction(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Outcome<Deleted>>, AppError> {
    let store = store_for(&state, &session);
    transaction_service::delete_transaction(&store, &transaction_id).await?;

    tracing::info!(transaction = %transaction_id, "transaction deleted");
    Ok(Json(Outcome::ok(Deleted { transaction_id })))
}
