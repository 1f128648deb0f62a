//! Saved-address lookup (read-only).

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Address;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AddressStore {
    pool: PgPool,
}

impl AddressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolves a saved address, scoped to its owner.
    pub async fn for_user(&self, address_id: Uuid, user_id: Uuid) -> Result<Option<Address>, ApiError> {
        let row = sqlx::query_as::<_, AddressRow>(
            "SELECT * FROM addresses WHERE id = $1 AND user_id = $2",
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    name: String,
    line1: String,
    line2: Option<String>,
    city: String,
    state: Option<String>,
    pincode: String,
    country: String,
    phone: Option<String>,
}

impl From<AddressRow> for Address {
    fn from(r: AddressRow) -> Self {
        Address {
            name: r.name,
            line1: r.line1,
            line2: r.line2,
            city: r.city,
            state: r.state,
            pincode: r.pincode,
            country: r.country,
            phone: r.phone,
        }
    }
}
