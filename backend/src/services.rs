use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    CategoryTotal, NewReport, NewTransaction, Report, Transaction, TransactionKind, User,
};
use crate::period::Period;
use crate::reports;
use crate::routes::AppState;

/// Unwraps a JSON body, turning extractor rejections into 400s.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::validation(e.body_text()))
}

/// Unwraps query parameters, turning extractor rejections into 400s.
pub fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(v)| v)
        .map_err(|e| ApiError::validation(e.body_text()))
}

/// `Some` only for non-blank strings.
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("{what} inválido: {raw}")))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCount {
    pub deleted_count: u64,
}

fn deleted() -> Json<JsonValue> {
    Json(json!({ "deleted": true }))
}

// users

pub async fn list_users_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn delete_users_handler(
    State(state): State<AppState>,
) -> Result<Json<DeletedCount>, ApiError> {
    let deleted_count = state.store.delete_all_users().await?;
    Ok(Json(DeletedCount { deleted_count }))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    let id = parse_id(&id, "id de usuario")?;
    if !state.store.delete_user(id).await? {
        return Err(ApiError::not_found("Usuario no encontrado"));
    }
    Ok(deleted())
}

pub async fn list_user_transactions_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let user_id = parse_id(&id, "id de usuario")?;
    Ok(Json(state.store.list_transactions(user_id).await?))
}

// transactions

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionReq {
    pub user_id: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "timestamp_or_date")]
    pub date: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub raw_message: Option<String>,
    pub processed: Option<bool>,
    pub ai_confidence: Option<f64>,
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD`, the latter read as
/// midnight UTC.
fn timestamp_or_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Ok(Some(ts));
    }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| de::Error::custom(format!("fecha inválida '{raw}'")))
}

impl CreateTransactionReq {
    fn validate(self) -> Result<NewTransaction, ApiError> {
        let user_id = present(self.user_id)
            .ok_or_else(|| ApiError::validation("userId es requerido para crear la transacción"))?;
        let user_id = parse_id(&user_id, "userId")?;
        let amount = self
            .amount
            .ok_or_else(|| ApiError::validation("amount es requerido para crear la transacción"))?;
        let category = present(self.category).ok_or_else(|| {
            ApiError::validation("category es requerido para crear la transacción")
        })?;
        Ok(NewTransaction {
            user_id,
            amount,
            currency: present(self.currency).unwrap_or_else(|| "COP".to_string()),
            kind: self.kind.unwrap_or_default(),
            category,
            date: self.date.unwrap_or_else(Utc::now),
            source: self.source,
            raw_message: self.raw_message,
            processed: self.processed.unwrap_or(false),
            ai_confidence: self.ai_confidence.unwrap_or(0.0),
        })
    }
}

pub async fn create_transaction_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateTransactionReq>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let new_tx = json_body(payload)?.validate()?;
    let tx = state.store.create_transaction(new_tx).await?;
    let listeners = state.notifier.publish(&tx);
    tracing::info!(
        tx_id = %tx.id,
        user_id = %tx.user_id,
        kind = tx.kind.as_str(),
        listeners,
        "transaction created"
    );
    Ok((StatusCode::CREATED, Json(tx)))
}

#[derive(Deserialize)]
pub struct ListTxQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

pub async fn list_transactions_handler(
    State(state): State<AppState>,
    params: Result<Query<ListTxQuery>, QueryRejection>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let user_id = present(query_params(params)?.user_id)
        .ok_or_else(|| ApiError::validation("userId es requerido para listar transacciones"))?;
    let user_id = parse_id(&user_id, "userId")?;
    Ok(Json(state.store.list_transactions(user_id).await?))
}

pub async fn delete_transactions_handler(
    State(state): State<AppState>,
) -> Result<Json<DeletedCount>, ApiError> {
    let deleted_count = state.store.delete_all_transactions().await?;
    Ok(Json(DeletedCount { deleted_count }))
}

pub async fn delete_transaction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    let id = parse_id(&id, "id de transacción")?;
    if !state.store.delete_transaction(id).await? {
        return Err(ApiError::not_found("Transacción no encontrada"));
    }
    Ok(deleted())
}

// reports

pub async fn monthly_report_handler(
    State(state): State<AppState>,
    Path((id, period)): Path<(String, String)>,
) -> Result<Json<Report>, ApiError> {
    let user_id = parse_id(&id, "id de usuario")?;
    let period: Period = period.parse()?;
    let report = reports::monthly_report(state.store.as_ref(), user_id, &period).await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportReq {
    pub user_id: Option<String>,
    pub period: Option<String>,
    pub total_income: Option<Decimal>,
    pub total_expenses: Option<Decimal>,
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub top_categories: Vec<CategoryTotal>,
}

/// Stores a report as given, without aggregating anything.
pub async fn create_report_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateReportReq>, JsonRejection>,
) -> Result<(StatusCode, Json<Report>), ApiError> {
    let req = json_body(payload)?;
    let user_id = present(req.user_id).ok_or_else(|| ApiError::validation("userId es requerido"))?;
    let user_id = parse_id(&user_id, "userId")?;
    let period: Period = present(req.period)
        .ok_or_else(|| ApiError::validation("period es requerido"))?
        .parse()?;
    let report = state
        .store
        .insert_report(NewReport {
            user_id,
            period: period.to_string(),
            total_income: req.total_income.unwrap_or(Decimal::ZERO),
            total_expenses: req.total_expenses.unwrap_or(Decimal::ZERO),
            balance: req.balance.unwrap_or(Decimal::ZERO),
            top_categories: req.top_categories,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_reports_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Report>>, ApiError> {
    Ok(Json(state.store.list_reports().await?))
}

pub async fn not_found_handler() -> ApiError {
    ApiError::not_found("Ruta no encontrada")
}
