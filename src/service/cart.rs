//! Cart mutations: items, coupons, guest-cart merge.
//!
//! Every mutation goes through `CartStore::save_lines`, which recomputes the
//! stored total and bumps the cart version.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::cart::{self, CartLine};
use crate::domain::discount;
use crate::domain::money;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::state::AppState;
use crate::store::{CartRecord, CartStore, CatalogStore, CouponStore};

#[derive(Clone)]
pub struct CartService {
    carts: CartStore,
    catalog: CatalogStore,
    coupons: CouponStore,
}

impl CartService {
    pub fn new(state: &AppState) -> Self {
        let db = &state.db;
        Self {
            carts: CartStore::new(db.clone()),
            catalog: CatalogStore::new(db.clone()),
            coupons: CouponStore::new(db.clone()),
        }
    }

    pub async fn get(&self, identity: &Identity) -> Result<CartRecord, ApiError> {
        identity.require_any()?;
        self.carts.get_or_create(identity).await
    }

    pub async fn add_item(
        &self,
        identity: &Identity,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: u32,
    ) -> Result<CartRecord, ApiError> {
        identity.require_any()?;
        if quantity == 0 {
            return Err(ApiError::Validation("quantity must be positive".into()));
        }
        let product = self
            .catalog
            .product(product_id)
            .await?
            .filter(|p| p.active)
            .ok_or(ApiError::NotFound("product"))?;
        if i64::from(product.stock) < i64::from(quantity) {
            return Err(ApiError::Validation("not enough stock".into()));
        }
        let unit_price = product.final_price.unwrap_or(product.price);

        let cart = self.carts.get_or_create(identity).await?;
        let mut lines = cart.lines().to_vec();
        cart::upsert_line(
            &mut lines,
            CartLine {
                product_id,
                variant_id,
                quantity,
                price: product.price,
                final_price: unit_price,
                shipping_charge: None,
                negotiated_price: None,
            },
        );
        self.save(&cart, lines).await
    }

    pub async fn update_item(
        &self,
        identity: &Identity,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: u32,
    ) -> Result<CartRecord, ApiError> {
        let cart = self.owned_cart(identity).await?;
        let mut lines = cart.lines().to_vec();
        let position = lines
            .iter()
            .position(|l| l.product_id == product_id && l.variant_id == variant_id)
            .ok_or(ApiError::NotFound("cart item"))?;
        if quantity == 0 {
            lines.remove(position);
        } else {
            lines[position].quantity = quantity;
        }
        self.save(&cart, lines).await
    }

    pub async fn remove_item(
        &self,
        identity: &Identity,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<CartRecord, ApiError> {
        let cart = self.owned_cart(identity).await?;
        let before = cart.lines().len();
        let lines: Vec<CartLine> = cart
            .lines()
            .iter()
            .filter(|l| !(l.product_id == product_id && l.variant_id == variant_id))
            .cloned()
            .collect();
        if lines.len() == before {
            return Err(ApiError::NotFound("cart item"));
        }
        self.save(&cart, lines).await
    }

    pub async fn clear(&self, identity: &Identity) -> Result<CartRecord, ApiError> {
        let cart = self.owned_cart(identity).await?;
        self.carts.save_lines(cart.id, Vec::new(), None, Decimal::ZERO).await
    }

    pub async fn apply_coupon(&self, identity: &Identity, code: &str) -> Result<CartRecord, ApiError> {
        let cart = self.owned_cart(identity).await?;
        if cart.is_empty() {
            return Err(ApiError::EmptyCart);
        }
        let coupon = self
            .coupons
            .by_code(code.trim())
            .await?
            .ok_or(ApiError::NotFound("coupon"))?;
        let subtotal = lines_subtotal(cart.lines());
        let amount = discount::evaluate_coupon(&coupon, subtotal, chrono::Utc::now())
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        self.carts
            .save_lines(cart.id, cart.lines().to_vec(), Some(coupon.code), amount)
            .await
    }

    pub async fn remove_coupon(&self, identity: &Identity) -> Result<CartRecord, ApiError> {
        let cart = self.owned_cart(identity).await?;
        self.carts
            .save_lines(cart.id, cart.lines().to_vec(), None, Decimal::ZERO)
            .await
    }

    /// Folds the caller's guest-session cart into their user cart after
    /// login. The coupon on the user cart is dropped since the merged
    /// subtotal no longer matches what it was validated against.
    pub async fn merge_guest_cart(&self, identity: &Identity) -> Result<CartRecord, ApiError> {
        let user_id = identity.require_user()?;
        let session = identity
            .session_id
            .clone()
            .ok_or_else(|| ApiError::Validation("no guest session to merge".into()))?;

        let guest_identity =
            Identity { user_id: None, session_id: Some(session), admin: false };
        let Some(guest) = self.carts.find_for(&guest_identity).await? else {
            // Nothing to merge; just make sure the user cart exists.
            let user_identity = Identity { user_id: Some(user_id), ..Default::default() };
            return self.carts.get_or_create(&user_identity).await;
        };

        let user_identity = Identity { user_id: Some(user_id), ..Default::default() };
        let user_cart = self.carts.get_or_create(&user_identity).await?;
        let merged = cart::merge_lines(user_cart.lines(), guest.lines());
        let saved = self.carts.save_lines(user_cart.id, merged, None, Decimal::ZERO).await?;
        self.carts.delete(guest.id).await?;
        Ok(saved)
    }

    async fn owned_cart(&self, identity: &Identity) -> Result<CartRecord, ApiError> {
        identity.require_any()?;
        self.carts.find_for(identity).await?.ok_or(ApiError::NotFound("cart"))
    }

    async fn save(&self, cart: &CartRecord, lines: Vec<CartLine>) -> Result<CartRecord, ApiError> {
        // Any item change invalidates a previously applied coupon amount, so
        // recompute it against the new subtotal if one is present.
        let (code, amount) = match &cart.coupon_code {
            Some(code) => match self.coupons.by_code(code).await? {
                Some(coupon) => {
                    let subtotal = lines_subtotal(&lines);
                    match discount::evaluate_coupon(&coupon, subtotal, chrono::Utc::now()) {
                        Ok(amount) => (Some(coupon.code), amount),
                        // Coupon no longer qualifies; drop it quietly.
                        Err(_) => (None, Decimal::ZERO),
                    }
                }
                None => (None, Decimal::ZERO),
            },
            None => (None, Decimal::ZERO),
        };
        self.carts.save_lines(cart.id, lines, code, amount).await
    }
}

fn lines_subtotal(lines: &[CartLine]) -> Decimal {
    money::round(lines.iter().map(CartLine::line_total).sum())
}
