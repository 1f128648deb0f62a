//! Read-only catalog access.

use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::pricing::{Product, Variant};
use crate::error::ApiError;

#[derive(Clone)]
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn product(&self, id: Uuid) -> Result<Option<Product>, ApiError> {
        let product = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product.map(Into::into))
    }

    pub async fn products_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Product>, ApiError> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| (r.id, r.into())).collect())
    }

    pub async fn variants_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Variant>, ApiError> {
        let rows =
            sqlx::query_as::<_, VariantRow>("SELECT * FROM product_variants WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|r| (r.id, r.into())).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    brand: Option<String>,
    image_url: Option<String>,
    price: rust_decimal::Decimal,
    final_price: Option<rust_decimal::Decimal>,
    stock: i32,
    active: bool,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id,
            name: r.name,
            brand: r.brand,
            image_url: r.image_url,
            price: r.price,
            final_price: r.final_price,
            stock: r.stock,
            active: r.active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    name: String,
    price: Option<rust_decimal::Decimal>,
    stock: i32,
}

impl From<VariantRow> for Variant {
    fn from(r: VariantRow) -> Self {
        Variant { id: r.id, product_id: r.product_id, name: r.name, price: r.price, stock: r.stock }
    }
}
