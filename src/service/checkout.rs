//! Order Creation Orchestrator.
//!
//! Freezes the cart's current summary into an immutable order. The cart
//! clear, order insert, history append and summary consumption run in one
//! transaction; the cart-version compare-and-swap inside it rejects both a
//! concurrent checkout and a summary that predates a cart mutation.

use serde_json::json;
use uuid::Uuid;

use crate::domain::Address;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::service::notify::Notifier;
use crate::service::summary::AddressInput;
use crate::state::AppState;
use crate::store::{
    AddressStore, CartStore, HistoryStore, NewOrder, OrderRecord, OrderStore, SummaryStore,
};

pub struct CreateOrderCmd {
    pub cart_id: Uuid,
    pub payment_method: String,
    pub shipping_address: Option<AddressInput>,
    pub billing_address: Option<Address>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: sqlx::PgPool,
    carts: CartStore,
    summaries: SummaryStore,
    orders: OrderStore,
    history: HistoryStore,
    addresses: AddressStore,
    notifier: Notifier,
}

impl CheckoutService {
    pub fn new(state: &AppState) -> Self {
        let db = state.db.clone();
        Self {
            carts: CartStore::new(db.clone()),
            summaries: SummaryStore::new(db.clone()),
            orders: OrderStore::new(db.clone()),
            history: HistoryStore::new(db.clone()),
            addresses: AddressStore::new(db.clone()),
            notifier: Notifier::new(state),
            db,
        }
    }

    pub async fn create_order(
        &self,
        cmd: CreateOrderCmd,
        identity: &Identity,
    ) -> Result<OrderRecord, ApiError> {
        if cmd.payment_method.trim().is_empty() {
            return Err(ApiError::Validation("payment method is required".into()));
        }

        let cart = self.carts.get(cmd.cart_id).await?.ok_or(ApiError::NotFound("cart"))?;
        if !cart.owned_by(identity) {
            return Err(ApiError::Forbidden);
        }
        if cart.is_empty() {
            return Err(ApiError::EmptyCart);
        }
        let summary = self
            .summaries
            .by_cart(cart.id)
            .await?
            .ok_or(ApiError::NotFound("order summary"))?;

        // Early stale check for a friendly error; the transactional CAS below
        // is the authoritative guard.
        if summary.cart_version != cart.version {
            return Err(ApiError::Conflict(
                "cart changed after the summary was generated; request a new summary".into(),
            ));
        }

        let shipping_address = match cmd.shipping_address {
            Some(input) => {
                let address = self.resolve_address(input, identity).await?;
                // Contact details may change at the last minute, but the
                // destination is what the summary priced shipping for.
                if !same_destination(&address, &summary.shipping_address.0) {
                    return Err(ApiError::Validation(
                        "shipping destination differs from the priced summary; \
                         request a new summary for the new address"
                            .into(),
                    ));
                }
                address
            }
            None => summary.shipping_address.0.clone(),
        };

        let payment_method = cmd.payment_method.trim().to_lowercase();
        let payment_status = if payment_method == "cod" { "cod" } else { "pending" };
        let new_order = NewOrder {
            user_id: cart.user_id,
            cart_id: cart.id,
            items: summary.items.0.clone(),
            payment_method,
            payment_status: payment_status.to_string(),
            shipping_address,
            billing_address: cmd.billing_address,
            totals: summary.totals(),
            coupon_code: cart.coupon_code.clone(),
            notes: cmd.notes,
        };

        let mut tx = self.db.begin().await?;
        let cleared = self
            .carts
            .clear_for_checkout(&mut tx, cart.id, summary.cart_version)
            .await?;
        if !cleared {
            tx.rollback().await?;
            return Err(ApiError::Conflict(
                "checkout already in progress or cart has changed".into(),
            ));
        }
        let order = self.orders.insert(&mut tx, &new_order).await?;
        self.history
            .append_tx(&mut tx, order.id, &order.status, Some("order placed"), &identity.actor())
            .await?;
        self.summaries.delete_by_cart(&mut tx, cart.id).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, order_number = %order.order_number, "order placed");
        self.notifier
            .order_event(
                "order_confirmation",
                order.id,
                order.user_id,
                json!({ "order_number": order.order_number, "grand_total": order.grand_total }),
            )
            .await;

        Ok(order)
    }

    async fn resolve_address(
        &self,
        input: AddressInput,
        identity: &Identity,
    ) -> Result<Address, ApiError> {
        match input {
            AddressInput::Explicit(address) => {
                use validator::Validate;
                address.validate()?;
                Ok(address)
            }
            AddressInput::Saved { address_id } => {
                let user_id = identity.require_user()?;
                self.addresses
                    .for_user(address_id, user_id)
                    .await?
                    .ok_or(ApiError::NotFound("address"))
            }
        }
    }
}

fn same_destination(candidate: &Address, priced: &Address) -> bool {
    candidate.destination() == priced.destination()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(pincode: &str) -> Address {
        Address {
            name: "A".into(),
            line1: "1 Main St".into(),
            line2: None,
            city: "Pune".into(),
            state: Some("MH".into()),
            pincode: pincode.into(),
            country: "IN".into(),
            phone: None,
        }
    }

    #[test]
    fn checkout_address_may_fix_contact_details_but_not_move() {
        let priced = address("411001");

        let mut renamed = address("411001");
        renamed.name = "B".into();
        renamed.phone = Some("555-0100".into());
        assert!(same_destination(&renamed, &priced));

        let moved = address("560001");
        assert!(!same_destination(&moved, &priced));
    }
}
