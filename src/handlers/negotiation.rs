//! Negotiated-pricing endpoints for business accounts.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::negotiation::NegotiatedItem;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::service::NegotiationService;
use crate::state::AppState;
use crate::store::NegotiationRecord;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub cart_id: Uuid,
    pub items: Vec<NegotiatedItem>,
    pub total_proposed: Decimal,
}

#[derive(Debug, Serialize)]
pub struct NegotiationView {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<NegotiatedItem>,
    pub total_proposed: Decimal,
    pub counter_total: Option<Decimal>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<NegotiationRecord> for NegotiationView {
    fn from(record: NegotiationRecord) -> Self {
        Self {
            id: record.id,
            cart_id: record.cart_id,
            user_id: record.user_id,
            items: record.items.0,
            total_proposed: record.total_proposed,
            counter_total: record.counter_total,
            status: record.status,
            created_at: record.created_at,
        }
    }
}

pub async fn submit(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<NegotiationView>), ApiError> {
    let record = NegotiationService::new(&state)
        .submit(req.cart_id, req.items, req.total_proposed, &identity)
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub status: String,
    pub counter_total: Option<Decimal>,
}

pub async fn process(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<NegotiationView>, ApiError> {
    let record = NegotiationService::new(&state)
        .process(id, &req.status, req.counter_total, &identity)
        .await?;
    Ok(Json(record.into()))
}
