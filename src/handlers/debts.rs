//! Debt HTTP handlers.
//!
//! - GET /debts - Debt ledger with totals, people and the add form
//! - POST /debts - Open a debt for a person
//! - POST /debts/{ledger_id}/repayments - Record a repayment

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    error::{AppError, Outcome},
    forms::{FormController, FormInput, debt::DebtForm, repayment::RepaymentForm, submit},
    handlers::{store_for, today},
    middleware::auth::CurrentSession,
    models::{debt::DebtEntry, transaction::Transaction},
    pages::DebtsView,
    services::debt_service,
    state::AppState,
};

/// Render the debts table.
pub async fn list_debts(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<Outcome<DebtsView>>, AppError> {
    let store = store_for(&state, &session);
    let mut pages = session.workspace.pages().lock().await;
    let view = pages.debts_view(&state.hub, &store, today()).await;
    if pages.token_refused() {
        return Err(AppError::Unauthenticated);
    }
    Ok(Json(Outcome::ok(view)))
}

/// Open a debt.
///
/// # Request Body
///
/// ```json
/// {
///   "person_id": "P-1",
///   "amount": "250000",
///   "description": "Concert tickets",
///   "period_tag": "20240601"
/// }
/// ```
///
/// `period_tag` defaults to the first day of the current month.
pub async fn create_debt(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Json(input): Json<FormInput>,
) -> Result<(StatusCode, Json<Outcome<DebtEntry>>), AppError> {
    let _guard = session.workspace.begin_submit(DebtForm::KIND)?;

    let mut form = DebtForm::new(today());
    form.fill(input);

    let store = store_for(&state, &session);
    let debt = submit(&mut form, |payload| async move {
        debt_service::add_debt(&store, &payload).await
    })
    .await?;

    tracing::info!(ledger = %debt.ledger_id, person = %debt.person_id, "debt added");
    Ok((StatusCode::CREATED, Json(Outcome::ok(debt))))
}

/// Record a repayment against a ledger entry.
///
/// The amount is bounded by what remains on the entry as the session's
/// debts page currently sees it; entries the page does not hold are
/// fetched.
///
/// # Request Body
///
/// ```json
/// { "amount": "50000", "date": "2024-06-10", "notes": "cash" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the expense transaction recorded
/// - **Error (404)**: no such ledger entry
/// - **Error (422)**: field errors, including an amount over the remaining debt
/// - **Error (409)**: a repayment is already being submitted
pub async fn create_repayment(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(ledger_id): Path<String>,
    Json(input): Json<FormInput>,
) -> Result<(StatusCode, Json<Outcome<Transaction>>), AppError> {
    let _guard = session.workspace.begin_submit(RepaymentForm::KIND)?;
    let store = store_for(&state, &session);

    let snapshot = {
        let mut pages = session.workspace.pages().lock().await;
        pages.sync_debts(&state.hub, &store).await;
        pages.debts.collection().find(&ledger_id).cloned()
    };
    let debt = match snapshot {
        Some(debt) => debt,
        None => debt_service::get_debt_by_id(&store, &ledger_id).await?,
    };

    let mut form = RepaymentForm::new(debt, today());
    form.fill(input);

    let transaction = submit(&mut form, |request| async move {
        debt_service::add_repayment(&store, &request).await
    })
    .await?;

    tracing::info!(
        ledger = %ledger_id,
        transaction = %transaction.transaction_id,
        amount = transaction.amount,
        "repayment recorded"
    );
    Ok((StatusCode::CREATED, Json(Outcome::ok(transaction))))
}
