//! Summary and order-creation endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Address, PricedLine};
use crate::error::ApiError;
use crate::identity::Identity;
use crate::service::{AddressInput, CheckoutService, CreateOrderCmd, SummaryService};
use crate::state::AppState;
use crate::store::SummaryRecord;

fn address_input(
    shipping_address: Option<Address>,
    address_id: Option<Uuid>,
) -> Result<AddressInput, ApiError> {
    match (shipping_address, address_id) {
        (Some(address), None) => Ok(AddressInput::Explicit(address)),
        (None, Some(address_id)) => Ok(AddressInput::Saved { address_id }),
        (Some(_), Some(_)) => Err(ApiError::Validation(
            "provide either shipping_address or address_id, not both".into(),
        )),
        (None, None) => Err(ApiError::Validation(
            "a shipping_address or address_id is required".into(),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub cart_id: Uuid,
    pub shipping_address: Option<Address>,
    pub address_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SummaryView {
    pub cart_id: Uuid,
    pub items: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub marketplace_fees: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub total_items: i32,
    pub shipping_address: Address,
}

impl From<SummaryRecord> for SummaryView {
    fn from(summary: SummaryRecord) -> Self {
        Self {
            cart_id: summary.cart_id,
            items: summary.items.0,
            subtotal: summary.subtotal,
            shipping: summary.shipping,
            marketplace_fees: summary.marketplace_fees,
            discount: summary.discount,
            tax: summary.tax,
            total: summary.total,
            total_items: summary.total_items,
            shipping_address: summary.shipping_address.0,
        }
    }
}

pub async fn generate_summary(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryView>, ApiError> {
    let address = address_input(req.shipping_address, req.address_id)?;
    let summary = SummaryService::new(&state)
        .generate(req.cart_id, &identity, address)
        .await?;
    Ok(Json(summary.into()))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub cart_id: Uuid,
    pub payment_method: String,
    pub shipping_address: Option<Address>,
    pub address_id: Option<Uuid>,
    pub billing_address: Option<Address>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
    pub order_number: String,
}

pub async fn create_order(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    // The shipping address is optional here; omitting it reuses the one the
    // summary was priced against.
    let shipping_address = match (req.shipping_address, req.address_id) {
        (None, None) => None,
        (address, id) => Some(address_input(address, id)?),
    };
    let order = CheckoutService::new(&state)
        .create_order(
            CreateOrderCmd {
                cart_id: req.cart_id,
                payment_method: req.payment_method,
                shipping_address,
                billing_address: req.billing_address,
                notes: req.notes,
            },
            &identity,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse { order_id: order.id, order_number: order.order_number }),
    ))
}
