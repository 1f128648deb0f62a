//! Pricing Summary Engine.
//!
//! Turns a cart plus a shipping destination into the priced snapshot that
//! checkout later freezes. Reads the cart, never writes it; the only write is
//! the summary upsert, keyed one-per-cart.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::discount::{self, DiscountLine};
use crate::domain::pricing::{self, PricedLine};
use crate::domain::{shipping, Address};
use crate::error::ApiError;
use crate::identity::Identity;
use crate::state::AppState;
use crate::store::{
    AddressStore, CartRecord, CartStore, CatalogStore, CouponStore, ShippingStore, SummaryRecord,
    SummaryStore,
};

/// Shipping destination as the client supplies it: inline, or a saved
/// address id belonging to the calling user.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum AddressInput {
    Saved { address_id: Uuid },
    Explicit(Address),
}

#[derive(Clone)]
pub struct SummaryService {
    carts: CartStore,
    catalog: CatalogStore,
    shipping: ShippingStore,
    coupons: CouponStore,
    addresses: AddressStore,
    summaries: SummaryStore,
    tax_rate: pricing::TaxRate,
}

impl SummaryService {
    pub fn new(state: &AppState) -> Self {
        let db = &state.db;
        Self {
            carts: CartStore::new(db.clone()),
            catalog: CatalogStore::new(db.clone()),
            shipping: ShippingStore::new(db.clone()),
            coupons: CouponStore::new(db.clone()),
            addresses: AddressStore::new(db.clone()),
            summaries: SummaryStore::new(db.clone()),
            tax_rate: state.tax_rate,
        }
    }

    pub async fn generate(
        &self,
        cart_id: Uuid,
        identity: &Identity,
        address: AddressInput,
    ) -> Result<SummaryRecord, ApiError> {
        let cart = self.carts.get(cart_id).await?.ok_or(ApiError::NotFound("cart"))?;
        if !cart.owned_by(identity) {
            return Err(ApiError::Forbidden);
        }
        if cart.is_empty() {
            return Err(ApiError::EmptyCart);
        }

        let address = self.resolve_address(address, identity).await?;
        let (items, line_shipping) = self.price_lines(&cart).await?;
        let subtotal: Decimal = items.iter().map(|i| i.line_total).sum();

        let quote = shipping::resolve(
            &self.shipping.active_rules().await?,
            &address.destination(),
            subtotal,
        );
        let discount = self.evaluate_discount(&cart, &items, subtotal).await?;
        let totals = pricing::compute_totals(
            subtotal,
            quote.cost + line_shipping,
            quote.marketplace_fee,
            discount,
            self.tax_rate,
        );

        self.summaries
            .upsert(cart.id, cart.version, cart.user_id, items, totals, &address)
            .await
    }

    async fn resolve_address(
        &self,
        input: AddressInput,
        identity: &Identity,
    ) -> Result<Address, ApiError> {
        match input {
            AddressInput::Explicit(address) => {
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

    /// Prices every cart line against the live catalog. Returns the snapshot
    /// lines and the sum of per-line shipping charges.
    async fn price_lines(
        &self,
        cart: &CartRecord,
    ) -> Result<(Vec<PricedLine>, Decimal), ApiError> {
        let product_ids: Vec<Uuid> = cart.lines().iter().map(|l| l.product_id).collect();
        let variant_ids: Vec<Uuid> =
            cart.lines().iter().filter_map(|l| l.variant_id).collect();
        let products = self.catalog.products_by_ids(&product_ids).await?;
        let variants = self.catalog.variants_by_ids(&variant_ids).await?;

        let mut line_shipping = Decimal::ZERO;
        let items = cart
            .lines()
            .iter()
            .map(|line| {
                line_shipping += line.shipping_charge.unwrap_or(Decimal::ZERO);
                PricedLine::new(
                    line,
                    products.get(&line.product_id),
                    line.variant_id.and_then(|id| variants.get(&id)),
                )
            })
            .collect();
        Ok((items, line_shipping))
    }

    /// Coupon on the cart wins; otherwise the best active auto-discount.
    async fn evaluate_discount(
        &self,
        cart: &CartRecord,
        items: &[PricedLine],
        subtotal: Decimal,
    ) -> Result<Decimal, ApiError> {
        if let Some(code) = &cart.coupon_code {
            let coupon = self
                .coupons
                .by_code(code)
                .await?
                .ok_or(ApiError::NotFound("coupon"))?;
            return discount::evaluate_coupon(&coupon, subtotal, chrono::Utc::now())
                .map_err(|e| ApiError::Validation(e.to_string()));
        }

        let rules = self.coupons.active_auto_discounts().await?;
        let lines: Vec<DiscountLine> = items
            .iter()
            .map(|i| DiscountLine {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect();
        Ok(discount::evaluate_auto(&rules, &lines, subtotal))
    }
}
