//! Cart endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::cart::CartLine;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::service::CartService;
use crate::state::AppState;
use crate::store::CartRecord;

#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub items: Vec<CartLine>,
    pub coupon_code: Option<String>,
    pub discount: Decimal,
    pub cart_total: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<CartRecord> for CartView {
    fn from(cart: CartRecord) -> Self {
        Self {
            id: cart.id,
            user_id: cart.user_id,
            session_id: cart.session_id,
            items: cart.items.0,
            coupon_code: cart.coupon_code,
            discount: cart.discount,
            cart_total: cart.cart_total,
            updated_at: cart.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub variant_id: Option<Uuid>,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct VariantQuery {
    pub variant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequest {
    #[validate(length(min = 1))]
    pub code: String,
}

pub async fn get_cart(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<CartView>, ApiError> {
    let cart = CartService::new(&state).get(&identity).await?;
    Ok(Json(cart.into()))
}

pub async fn add_item(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartView>), ApiError> {
    req.validate()?;
    let cart = CartService::new(&state)
        .add_item(&identity, req.product_id, req.variant_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

pub async fn update_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let cart = CartService::new(&state)
        .update_item(&identity, product_id, req.variant_id, req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

pub async fn remove_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(product_id): Path<Uuid>,
    Query(query): Query<VariantQuery>,
) -> Result<Json<CartView>, ApiError> {
    let cart = CartService::new(&state)
        .remove_item(&identity, product_id, query.variant_id)
        .await?;
    Ok(Json(cart.into()))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<CartView>, ApiError> {
    let cart = CartService::new(&state).clear(&identity).await?;
    Ok(Json(cart.into()))
}

pub async fn apply_coupon(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CouponRequest>,
) -> Result<Json<CartView>, ApiError> {
    req.validate()?;
    let cart = CartService::new(&state).apply_coupon(&identity, &req.code).await?;
    Ok(Json(cart.into()))
}

pub async fn remove_coupon(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<CartView>, ApiError> {
    let cart = CartService::new(&state).remove_coupon(&identity).await?;
    Ok(Json(cart.into()))
}

pub async fn merge_cart(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<CartView>, ApiError> {
    let cart = CartService::new(&state).merge_guest_cart(&identity).await?;
    Ok(Json(cart.into()))
}
