//! Request handlers.
//!
//! Store calls block, so every handler moves its work onto the blocking pool
//! with a per-request deadline.

use crate::dto::{
    CardsResponse, ChartsResponse, HistoryEntryResponse, ListParams, StatusResponse,
    TransactionBody, TransactionResponse, UpdateCardsBody,
};
use crate::error::ApiError;
use crate::routes::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use finboard_core::{Deadline, LedgerUpdateRequest, NewTransactionRequest};

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn limit_of(params: Result<Query<ListParams>, QueryRejection>) -> Result<u32, ApiError> {
    let Query(params) = params?;
    Ok(params.limit.unwrap_or(u32::MAX))
}

pub async fn get_cards(State(state): State<AppState>) -> Result<Json<CardsResponse>, ApiError> {
    let deadline = Deadline::after(state.request_timeout);
    let mode = state.ledger.amount_mode();
    let snapshot = run_blocking(move || Ok(state.ledger.snapshot(deadline)?)).await?;
    Ok(Json(CardsResponse::from_snapshot(&snapshot, mode)))
}

pub async fn update_cards(
    State(state): State<AppState>,
    body: Result<Json<UpdateCardsBody>, JsonRejection>,
) -> Result<Json<CardsResponse>, ApiError> {
    let Json(body) = body?;
    let request = LedgerUpdateRequest::from(body);
    let deadline = Deadline::after(state.request_timeout);
    let mode = state.ledger.amount_mode();
    let snapshot = run_blocking(move || Ok(state.ledger.update(&request, deadline)?)).await?;
    Ok(Json(CardsResponse::from_snapshot(&snapshot, mode)))
}

pub async fn reset_cards(State(state): State<AppState>) -> Result<Json<CardsResponse>, ApiError> {
    let deadline = Deadline::after(state.request_timeout);
    let mode = state.ledger.amount_mode();
    let snapshot = run_blocking(move || {
        state.ledger.reset_all(deadline)?;
        Ok(state.ledger.snapshot(deadline)?)
    })
    .await?;
    Ok(Json(CardsResponse::from_snapshot(&snapshot, mode)))
}

pub async fn list_history(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let limit = limit_of(params)?;
    let deadline = Deadline::after(state.request_timeout);
    let mode = state.ledger.amount_mode();
    let records = run_blocking(move || Ok(state.ledger.history(limit, deadline)?)).await?;
    Ok(Json(
        records
            .iter()
            .map(|record| HistoryEntryResponse::from_record(record, mode))
            .collect(),
    ))
}

pub async fn get_charts(State(state): State<AppState>) -> Result<Json<ChartsResponse>, ApiError> {
    let deadline = Deadline::after(state.request_timeout);
    let mode = state.ledger.amount_mode();
    let buckets = run_blocking(move || Ok(state.ledger.charts(deadline)?)).await?;
    Ok(Json(ChartsResponse::from_buckets(&buckets, mode)))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let limit = limit_of(params)?;
    let deadline = Deadline::after(state.request_timeout);
    let mode = state.ledger.amount_mode();
    let records = run_blocking(move || Ok(state.transactions.list(limit, deadline)?)).await?;
    Ok(Json(
        records
            .iter()
            .map(|record| TransactionResponse::from_record(record, mode))
            .collect(),
    ))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    body: Result<Json<TransactionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let Json(body) = body?;
    let request = NewTransactionRequest::from(body);
    let deadline = Deadline::after(state.request_timeout);
    let mode = state.ledger.amount_mode();
    let record = run_blocking(move || Ok(state.transactions.record(&request, deadline)?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse::from_record(&record, mode)),
    ))
}

pub async fn health(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let deadline = Deadline::after(state.request_timeout);
    run_blocking(move || Ok(state.store.ping(deadline)?)).await?;
    Ok(Json(StatusResponse { status: "ok" }))
}
