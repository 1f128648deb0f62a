//! Return and replacement endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::Identity;
use crate::service::LifecycleService;
use crate::state::AppState;
use crate::store::lifecycle::{RefundRecord, ReplacementRecord, ReturnRecord};
use crate::store::RequestItem;

#[derive(Debug, Deserialize)]
pub struct RequestPayload {
    pub order_id: Uuid,
    pub items: Vec<RequestItem>,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ReturnView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<RequestItem>,
    pub reason: String,
    pub status: String,
    pub refund_mode: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundRecord>,
}

impl From<ReturnRecord> for ReturnView {
    fn from(record: ReturnRecord) -> Self {
        Self {
            id: record.id,
            order_id: record.order_id,
            user_id: record.user_id,
            items: record.items.0,
            reason: record.reason,
            status: record.status,
            refund_mode: record.refund_mode,
            refund_amount: record.refund_amount,
            processed_at: record.processed_at,
            created_at: record.created_at,
            refund: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReplacementView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<RequestItem>,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReplacementRecord> for ReplacementView {
    fn from(record: ReplacementRecord) -> Self {
        Self {
            id: record.id,
            order_id: record.order_id,
            user_id: record.user_id,
            items: record.items.0,
            reason: record.reason,
            status: record.status,
            created_at: record.created_at,
        }
    }
}

pub async fn request_return(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<RequestPayload>,
) -> Result<(StatusCode, Json<ReturnView>), ApiError> {
    let record = LifecycleService::new(&state)
        .request_return(req.order_id, req.items, req.reason, &identity)
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

pub async fn request_replacement(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<RequestPayload>,
) -> Result<(StatusCode, Json<ReplacementView>), ApiError> {
    let record = LifecycleService::new(&state)
        .request_replacement(req.order_id, req.items, req.reason, &identity)
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

pub async fn get_return(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ReturnView>, ApiError> {
    let (record, refund) = LifecycleService::new(&state).get_return(id, &identity).await?;
    let mut view: ReturnView = record.into();
    view.refund = refund;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct ProcessReturnRequest {
    pub status: String,
    pub comment: Option<String>,
    pub mode: Option<String>,
    pub amount: Option<Decimal>,
}

pub async fn process_return(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(req): Json<ProcessReturnRequest>,
) -> Result<Json<ReturnView>, ApiError> {
    let (record, refund) = LifecycleService::new(&state)
        .process_return(id, &req.status, req.comment, req.mode, req.amount, &identity)
        .await?;
    let mut view: ReturnView = record.into();
    view.refund = refund;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct ProcessReplacementRequest {
    pub status: String,
    pub comment: Option<String>,
}

pub async fn process_replacement(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(req): Json<ProcessReplacementRequest>,
) -> Result<Json<ReplacementView>, ApiError> {
    let record = LifecycleService::new(&state)
        .process_replacement(id, &req.status, req.comment, &identity)
        .await?;
    Ok(Json(record.into()))
}
