//! Order read and admin endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Address, PricedLine};
use crate::error::ApiError;
use crate::identity::Identity;
use crate::service::LifecycleService;
use crate::state::AppState;
use crate::store::order::HistoryRecord;
use crate::store::{HistoryStore, OrderRecord, OrderStore};

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub items: Vec<PricedLine>,
    pub payment_method: String,
    pub payment_status: String,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub totals: TotalsView,
    pub coupon_code: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryRecord>>,
}

#[derive(Debug, Serialize)]
pub struct TotalsView {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
}

impl From<OrderRecord> for OrderView {
    fn from(order: OrderRecord) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            items: order.items.0,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            shipping_address: order.shipping_address.0,
            billing_address: order.billing_address.map(|a| a.0),
            totals: TotalsView {
                subtotal: order.subtotal,
                discount: order.discount,
                shipping: order.shipping,
                tax: order.tax,
                grand_total: order.grand_total,
            },
            coupon_code: order.coupon_code,
            status: order.status,
            notes: order.notes,
            tracking_number: order.tracking_number,
            created_at: order.created_at,
            history: None,
        }
    }
}

pub async fn get_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, ApiError> {
    let order = OrderStore::new(state.db.clone())
        .get(id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    if !order.owned_by(&identity) {
        return Err(ApiError::Forbidden);
    }
    let history = HistoryStore::new(state.db.clone()).for_order(order.id).await?;
    let mut view: OrderView = order.into();
    view.history = Some(history);
    Ok(Json(view))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let user_id = identity.require_user()?;
    let orders = OrderStore::new(state.db.clone()).list_for_user(user_id).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

pub async fn list_all_orders(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<OrderView>>, ApiError> {
    identity.require_admin()?;
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).min(100);
    let (orders, total) = OrderStore::new(state.db.clone()).list_all(page, per_page).await?;
    Ok(Json(PaginatedResponse {
        data: orders.into_iter().map(Into::into).collect(),
        total,
        page,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub comment: Option<String>,
    pub tracking_number: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let order = LifecycleService::new(&state)
        .update_order_status(id, &req.status, req.comment, req.tracking_number, &identity)
        .await?;
    Ok(Json(order.into()))
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub dispatched: bool,
}

pub async fn send_invoice(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let order = LifecycleService::new(&state).send_invoice(id, &identity).await?;
    // Delivery is best-effort; the log row records how it went.
    Ok(Json(InvoiceResponse {
        order_id: order.id,
        order_number: order.order_number,
        dispatched: true,
    }))
}
