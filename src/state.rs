//! Shared application state.

use crate::domain::TaxRate;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub tax_rate: TaxRate,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, nats: Option<async_nats::Client>, tax_rate: TaxRate) -> Self {
        Self { db, nats, tax_rate }
    }
}
