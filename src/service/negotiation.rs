//! Negotiated pricing for business/bulk accounts.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::negotiation::{self, NegotiatedItem};
use crate::domain::status::NegotiationStatus;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::state::AppState;
use crate::store::{CartStore, NegotiationRecord, NegotiationStore};

#[derive(Clone)]
pub struct NegotiationService {
    carts: CartStore,
    negotiations: NegotiationStore,
}

impl NegotiationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            carts: CartStore::new(state.db.clone()),
            negotiations: NegotiationStore::new(state.db.clone()),
        }
    }

    pub async fn submit(
        &self,
        cart_id: Uuid,
        items: Vec<NegotiatedItem>,
        total_proposed: Decimal,
        identity: &Identity,
    ) -> Result<NegotiationRecord, ApiError> {
        let user_id = identity.require_user()?;
        if items.is_empty() {
            return Err(ApiError::Validation("a proposal needs at least one item".into()));
        }
        if total_proposed <= Decimal::ZERO
            || items.iter().any(|i| i.negotiated_price <= Decimal::ZERO)
        {
            return Err(ApiError::Validation("proposed prices must be positive".into()));
        }
        let cart = self.carts.get(cart_id).await?.ok_or(ApiError::NotFound("cart"))?;
        if !cart.owned_by(identity) {
            return Err(ApiError::Forbidden);
        }
        self.negotiations.insert(cart_id, user_id, items, total_proposed).await
    }

    /// Admin decision. Approval rewrites the cart's line prices through the
    /// pure transform and persists the result, bumping the cart version so
    /// any summary generated before the negotiation is now stale and must be
    /// regenerated.
    pub async fn process(
        &self,
        negotiation_id: Uuid,
        new_status: &str,
        counter_total: Option<Decimal>,
        identity: &Identity,
    ) -> Result<NegotiationRecord, ApiError> {
        identity.require_admin()?;
        let target: NegotiationStatus = new_status.parse().map_err(|_| {
            ApiError::Validation(format!("invalid negotiation status: {new_status}"))
        })?;
        let record = self
            .negotiations
            .get(negotiation_id)
            .await?
            .ok_or(ApiError::NotFound("negotiation"))?;
        let current = record.status()?;
        if !NegotiationStatus::allowed(current, target) {
            return Err(ApiError::Validation(format!(
                "cannot move negotiation from {current} to {target}"
            )));
        }
        if target == NegotiationStatus::Countered && counter_total.is_none() {
            return Err(ApiError::Validation("a counter offer needs a total".into()));
        }

        if target == NegotiationStatus::Approved {
            let cart = self
                .carts
                .get(record.cart_id)
                .await?
                .ok_or(ApiError::NotFound("cart"))?;
            let applied = negotiation::apply_negotiated_pricing(
                cart.lines(),
                &record.items.0,
                cart.discount,
            );
            self.carts
                .save_lines(cart.id, applied.lines, cart.coupon_code.clone(), cart.discount)
                .await?;
        }

        self.negotiations
            .set_status(negotiation_id, current, target, counter_total)
            .await?
            .ok_or_else(|| {
                ApiError::Conflict("negotiation status changed concurrently; retry".into())
            })
    }
}
