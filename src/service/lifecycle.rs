//! Order lifecycle: status transitions, returns, replacements, refunds.
//!
//! Every transition is checked against the tables in `domain::status`,
//! appends one history row, and attempts a notification. Notifications never
//! roll a transition back.

use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::domain::status::{OrderStatus, ReplacementStatus, ReturnStatus};
use crate::error::ApiError;
use crate::identity::Identity;
use crate::service::notify::Notifier;
use crate::state::AppState;
use crate::store::{
    HistoryStore, OrderRecord, OrderStore, RefundRecord, RefundStore, ReplacementRecord,
    ReplacementStore, RequestItem, ReturnRecord, ReturnStore,
};

#[derive(Clone)]
pub struct LifecycleService {
    db: sqlx::PgPool,
    orders: OrderStore,
    history: HistoryStore,
    returns: ReturnStore,
    replacements: ReplacementStore,
    refunds: RefundStore,
    notifier: Notifier,
}

impl LifecycleService {
    pub fn new(state: &AppState) -> Self {
        let db = state.db.clone();
        Self {
            orders: OrderStore::new(db.clone()),
            history: HistoryStore::new(db.clone()),
            returns: ReturnStore::new(db.clone()),
            replacements: ReplacementStore::new(db.clone()),
            refunds: RefundStore::new(db.clone()),
            notifier: Notifier::new(state),
            db,
        }
    }

    /// Admin-driven order status change. Illegal transitions (backwards, or
    /// out of a terminal state) are rejected before any write.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: &str,
        comment: Option<String>,
        tracking_number: Option<String>,
        identity: &Identity,
    ) -> Result<OrderRecord, ApiError> {
        identity.require_admin()?;
        let target: OrderStatus = new_status
            .parse()
            .map_err(|_| ApiError::Validation(format!("invalid order status: {new_status}")))?;
        let order = self.orders.get(order_id).await?.ok_or(ApiError::NotFound("order"))?;
        let current = order.status()?;
        if !OrderStatus::allowed(current, target) {
            return Err(ApiError::Validation(format!(
                "cannot move order from {current} to {target}"
            )));
        }

        let updated = self
            .orders
            .update_status(order_id, current, target, tracking_number.as_deref())
            .await?
            .ok_or_else(|| {
                ApiError::Conflict("order status changed concurrently; retry".into())
            })?;
        self.history
            .append(order_id, &target.to_string(), comment.as_deref(), &identity.actor())
            .await?;
        self.notifier
            .order_event(
                "order_status_update",
                updated.id,
                updated.user_id,
                json!({ "order_number": updated.order_number, "status": target.to_string() }),
            )
            .await;
        Ok(updated)
    }

    /// Customer return request; only delivered orders qualify.
    pub async fn request_return(
        &self,
        order_id: Uuid,
        items: Vec<RequestItem>,
        reason: String,
        identity: &Identity,
    ) -> Result<ReturnRecord, ApiError> {
        let user_id = identity.require_user()?;
        let order = self.delivered_order_for(order_id, identity).await?;
        validate_request_items(&order, &items)?;
        if reason.trim().is_empty() {
            return Err(ApiError::Validation("a reason is required".into()));
        }

        let record = self.returns.insert(order_id, user_id, items, reason.trim()).await?;
        self.history
            .append(order_id, "return_requested", None, &identity.actor())
            .await?;
        self.notifier
            .order_event(
                "return_requested",
                order_id,
                order.user_id,
                json!({ "return_id": record.id }),
            )
            .await;
        Ok(record)
    }

    pub async fn request_replacement(
        &self,
        order_id: Uuid,
        items: Vec<RequestItem>,
        reason: String,
        identity: &Identity,
    ) -> Result<ReplacementRecord, ApiError> {
        let user_id = identity.require_user()?;
        let order = self.delivered_order_for(order_id, identity).await?;
        validate_request_items(&order, &items)?;
        if reason.trim().is_empty() {
            return Err(ApiError::Validation("a reason is required".into()));
        }

        let record = self.replacements.insert(order_id, user_id, items, reason.trim()).await?;
        self.history
            .append(order_id, "replacement_requested", None, &identity.actor())
            .await?;
        self.notifier
            .order_event(
                "replacement_requested",
                order_id,
                order.user_id,
                json!({ "replacement_id": record.id }),
            )
            .await;
        Ok(record)
    }

    /// Return status lookup, refund ledger entry included once one exists.
    pub async fn get_return(
        &self,
        return_id: Uuid,
        identity: &Identity,
    ) -> Result<(ReturnRecord, Option<RefundRecord>), ApiError> {
        let record = self.returns.get(return_id).await?.ok_or(ApiError::NotFound("return"))?;
        if !identity.admin && identity.user_id != Some(record.user_id) {
            return Err(ApiError::Forbidden);
        }
        let refund = self.refunds.by_return(return_id).await?;
        Ok((record, refund))
    }

    /// Admin return processing. Moving into `refunded` creates the refund
    /// ledger entry; the conditional update plus the unique index on
    /// `refunds.return_id` make that happen at most once per return.
    pub async fn process_return(
        &self,
        return_id: Uuid,
        new_status: &str,
        comment: Option<String>,
        mode: Option<String>,
        amount: Option<Decimal>,
        identity: &Identity,
    ) -> Result<(ReturnRecord, Option<RefundRecord>), ApiError> {
        identity.require_admin()?;
        let target: ReturnStatus = new_status
            .parse()
            .map_err(|_| ApiError::Validation(format!("invalid return status: {new_status}")))?;
        let record = self.returns.get(return_id).await?.ok_or(ApiError::NotFound("return"))?;
        let current = record.status()?;

        if target == ReturnStatus::Refunded {
            if current == ReturnStatus::Refunded {
                return Err(ApiError::Conflict("return already refunded".into()));
            }
            if !ReturnStatus::allowed(current, target) {
                return Err(ApiError::Validation(format!(
                    "cannot move return from {current} to {target}"
                )));
            }
            let mode = mode
                .ok_or_else(|| ApiError::Validation("refund mode is required".into()))?;
            let amount = amount
                .ok_or_else(|| ApiError::Validation("refund amount is required".into()))?;
            if amount <= Decimal::ZERO {
                return Err(ApiError::Validation("refund amount must be positive".into()));
            }

            let mut tx = self.db.begin().await?;
            let updated = self
                .returns
                .mark_refunded(&mut tx, return_id, &mode, amount)
                .await?
                .ok_or_else(|| {
                    // Lost a race: someone else refunded between our read and
                    // the conditional update.
                    ApiError::Conflict("return already refunded".into())
                })?;
            let refund = self
                .refunds
                .insert(&mut tx, return_id, record.order_id, record.user_id, &mode, amount)
                .await?
                .ok_or_else(|| ApiError::Conflict("refund already recorded".into()))?;
            tx.commit().await?;

            self.history
                .append(record.order_id, "refunded", comment.as_deref(), &identity.actor())
                .await?;
            self.notifier
                .order_event(
                    "refund_processed",
                    record.order_id,
                    Some(record.user_id),
                    json!({ "return_id": return_id, "amount": amount, "mode": mode }),
                )
                .await;
            return Ok((updated, Some(refund)));
        }

        if !ReturnStatus::allowed(current, target) {
            return Err(ApiError::Validation(format!(
                "cannot move return from {current} to {target}"
            )));
        }
        let updated = self
            .returns
            .set_status(return_id, current, target)
            .await?
            .ok_or_else(|| {
                ApiError::Conflict("return status changed concurrently; retry".into())
            })?;
        self.history
            .append(
                record.order_id,
                &format!("return_{target}"),
                comment.as_deref(),
                &identity.actor(),
            )
            .await?;
        self.notifier
            .order_event(
                "return_update",
                record.order_id,
                Some(record.user_id),
                json!({ "return_id": return_id, "status": target.to_string() }),
            )
            .await;
        Ok((updated, None))
    }

    pub async fn process_replacement(
        &self,
        replacement_id: Uuid,
        new_status: &str,
        comment: Option<String>,
        identity: &Identity,
    ) -> Result<ReplacementRecord, ApiError> {
        identity.require_admin()?;
        let target: ReplacementStatus = new_status.parse().map_err(|_| {
            ApiError::Validation(format!("invalid replacement status: {new_status}"))
        })?;
        let record = self
            .replacements
            .get(replacement_id)
            .await?
            .ok_or(ApiError::NotFound("replacement"))?;
        let current = record.status()?;
        if !ReplacementStatus::allowed(current, target) {
            return Err(ApiError::Validation(format!(
                "cannot move replacement from {current} to {target}"
            )));
        }

        let updated = self
            .replacements
            .set_status(replacement_id, current, target)
            .await?
            .ok_or_else(|| {
                ApiError::Conflict("replacement status changed concurrently; retry".into())
            })?;
        self.history
            .append(
                record.order_id,
                &format!("replacement_{target}"),
                comment.as_deref(),
                &identity.actor(),
            )
            .await?;
        self.notifier
            .order_event(
                "replacement_update",
                record.order_id,
                Some(record.user_id),
                json!({ "replacement_id": replacement_id, "status": target.to_string() }),
            )
            .await;
        Ok(updated)
    }

    /// Best-effort invoice dispatch; the notification log gets a row whether
    /// or not delivery worked, and the endpoint never fails on delivery.
    pub async fn send_invoice(&self, order_id: Uuid, identity: &Identity) -> Result<OrderRecord, ApiError> {
        identity.require_admin()?;
        let order = self.orders.get(order_id).await?.ok_or(ApiError::NotFound("order"))?;
        self.notifier
            .order_event(
                "invoice",
                order.id,
                order.user_id,
                json!({ "order_number": order.order_number, "grand_total": order.grand_total }),
            )
            .await;
        Ok(order)
    }

    async fn delivered_order_for(
        &self,
        order_id: Uuid,
        identity: &Identity,
    ) -> Result<OrderRecord, ApiError> {
        let order = self.orders.get(order_id).await?.ok_or(ApiError::NotFound("order"))?;
        if !order.owned_by(identity) {
            return Err(ApiError::Forbidden);
        }
        ensure_delivered(&order)?;
        Ok(order)
    }
}

/// Returns and replacements are only open to delivered orders.
fn ensure_delivered(order: &OrderRecord) -> Result<(), ApiError> {
    if order.status()? != OrderStatus::Delivered {
        return Err(ApiError::Validation(
            "returns and replacements require a delivered order".into(),
        ));
    }
    Ok(())
}

/// Requested items must exist in the order snapshot with at most the
/// delivered quantity.
fn validate_request_items(order: &OrderRecord, items: &[RequestItem]) -> Result<(), ApiError> {
    if items.is_empty() {
        return Err(ApiError::Validation("at least one item is required".into()));
    }
    for item in items {
        if item.quantity == 0 {
            return Err(ApiError::Validation("item quantity must be positive".into()));
        }
        let ordered = order.items.0.iter().find(|line| {
            line.product_id == item.product_id && line.variant_id == item.variant_id
        });
        match ordered {
            Some(line) if line.quantity >= item.quantity => {}
            Some(_) => {
                return Err(ApiError::Validation(
                    "requested quantity exceeds the ordered quantity".into(),
                ))
            }
            None => {
                return Err(ApiError::Validation(
                    "requested item is not part of this order".into(),
                ))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, PricedLine};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sqlx::types::Json;

    fn order_with_items(items: Vec<PricedLine>) -> OrderRecord {
        OrderRecord {
            id: Uuid::from_u128(1),
            order_number: "ORD-100001".into(),
            user_id: Some(Uuid::from_u128(2)),
            cart_id: Uuid::from_u128(3),
            items: Json(items),
            payment_method: "cod".into(),
            payment_status: "cod".into(),
            shipping_address: Json(Address {
                name: "A".into(),
                line1: "1 Main St".into(),
                line2: None,
                city: "Pune".into(),
                state: None,
                pincode: "411001".into(),
                country: "IN".into(),
                phone: None,
            }),
            billing_address: None,
            subtotal: dec!(100),
            discount: Decimal::ZERO,
            shipping: Decimal::ZERO,
            tax: dec!(5),
            grand_total: dec!(105),
            coupon_code: None,
            status: "delivered".into(),
            notes: None,
            tracking_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn priced(product: u128, qty: u32) -> PricedLine {
        PricedLine {
            product_id: Uuid::from_u128(product),
            variant_id: None,
            name: "Widget".into(),
            brand: None,
            image_url: None,
            quantity: qty,
            unit_price: dec!(50),
            line_total: dec!(50) * Decimal::from(qty),
        }
    }

    #[test]
    fn request_items_must_match_order_snapshot() {
        let order = order_with_items(vec![priced(1, 2)]);
        let ok = vec![RequestItem { product_id: Uuid::from_u128(1), variant_id: None, quantity: 2 }];
        assert!(validate_request_items(&order, &ok).is_ok());

        let too_many =
            vec![RequestItem { product_id: Uuid::from_u128(1), variant_id: None, quantity: 3 }];
        assert!(validate_request_items(&order, &too_many).is_err());

        let wrong_product =
            vec![RequestItem { product_id: Uuid::from_u128(9), variant_id: None, quantity: 1 }];
        assert!(validate_request_items(&order, &wrong_product).is_err());

        assert!(validate_request_items(&order, &[]).is_err());
    }

    #[test]
    fn only_delivered_orders_accept_return_requests() {
        let mut order = order_with_items(vec![priced(1, 2)]);
        assert!(ensure_delivered(&order).is_ok());

        for status in ["placed", "confirmed", "processing", "shipped", "cancelled"] {
            order.status = status.into();
            assert!(ensure_delivered(&order).is_err(), "{status} must be rejected");
        }
    }
}
