//! Database-level guard semantics: the cart-version compare-and-swap behind
//! checkout, the conditional status updates, and the refund-once ledger.
//!
//! These run against a real Postgres and are ignored by default; point
//! `DATABASE_URL` at a disposable database and run with `--ignored`.

use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use storefront_api::domain::status::{OrderStatus, ReturnStatus};
use storefront_api::store::{CartStore, OrderStore, RefundStore, RequestItem, ReturnStore};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations").run(&pool).await.expect("run migrations");
    pool
}

/// Guest cart with one line, already at version 3.
async fn seeded_cart(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO carts (id, session_id, items, cart_total, version) \
         VALUES ($1, $2, $3, 100, 3)",
    )
    .bind(id)
    .bind(format!("sess-{id}"))
    .bind(Json(serde_json::json!([
        { "product_id": Uuid::new_v4(), "quantity": 1, "price": "100", "final_price": "100" }
    ])))
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn seeded_order(pool: &PgPool, status: &str) -> (Uuid, Uuid) {
    let id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, cart_id, items, payment_method, \
         shipping_address, subtotal, discount, shipping, tax, grand_total, status) \
         VALUES ($1, $2, $3, $4, $5, 'cod', $6, 100, 0, 0, 5, 105, $7)",
    )
    .bind(id)
    .bind(format!("ORD-{id}"))
    .bind(user_id)
    .bind(seeded_cart(pool).await)
    .bind(Json(serde_json::json!([])))
    .bind(Json(serde_json::json!({
        "name": "A", "line1": "1 Main St", "city": "Pune",
        "pincode": "411001", "country": "IN"
    })))
    .bind(status)
    .execute(pool)
    .await
    .unwrap();
    (id, user_id)
}

async fn cart_version(pool: &PgPool, cart_id: Uuid) -> i64 {
    let (version,): (i64,) = sqlx::query_as("SELECT version FROM carts WHERE id = $1")
        .bind(cart_id)
        .fetch_one(pool)
        .await
        .unwrap();
    version
}

#[tokio::test]
#[ignore = "needs a Postgres instance via DATABASE_URL"]
async fn checkout_clears_the_cart_at_most_once() {
    let pool = pool().await;
    let store = CartStore::new(pool.clone());
    let cart_id = seeded_cart(&pool).await;

    let mut tx = pool.begin().await.unwrap();
    assert!(store.clear_for_checkout(&mut tx, cart_id, 3).await.unwrap());
    tx.commit().await.unwrap();

    // Same summary version again: the cart is now empty and at version 4.
    let mut tx = pool.begin().await.unwrap();
    assert!(!store.clear_for_checkout(&mut tx, cart_id, 3).await.unwrap());
    tx.rollback().await.unwrap();
    assert_eq!(cart_version(&pool, cart_id).await, 4);
}

#[tokio::test]
#[ignore = "needs a Postgres instance via DATABASE_URL"]
async fn stale_summary_version_cannot_check_out() {
    let pool = pool().await;
    let store = CartStore::new(pool.clone());
    let cart_id = seeded_cart(&pool).await;

    // Summary priced version 2; the cart has mutated since.
    let mut tx = pool.begin().await.unwrap();
    assert!(!store.clear_for_checkout(&mut tx, cart_id, 2).await.unwrap());
    tx.rollback().await.unwrap();
    assert_eq!(cart_version(&pool, cart_id).await, 3);
}

#[tokio::test]
#[ignore = "needs a Postgres instance via DATABASE_URL"]
async fn an_approved_return_is_refunded_exactly_once() {
    let pool = pool().await;
    let returns = ReturnStore::new(pool.clone());
    let refunds = RefundStore::new(pool.clone());
    let (order_id, user_id) = seeded_order(&pool, "delivered").await;

    let items = vec![RequestItem { product_id: Uuid::new_v4(), variant_id: None, quantity: 1 }];
    let record = returns.insert(order_id, user_id, items, "damaged").await.unwrap();
    returns
        .set_status(record.id, ReturnStatus::Requested, ReturnStatus::Approved)
        .await
        .unwrap()
        .expect("requested -> approved");

    let mut tx = pool.begin().await.unwrap();
    let refunded = returns.mark_refunded(&mut tx, record.id, "upi", dec!(50)).await.unwrap();
    assert!(refunded.is_some());
    let refund = refunds
        .insert(&mut tx, record.id, order_id, user_id, "upi", dec!(50))
        .await
        .unwrap();
    assert!(refund.is_some());
    tx.commit().await.unwrap();

    // A second processor loses on both guards.
    let mut tx = pool.begin().await.unwrap();
    assert!(returns.mark_refunded(&mut tx, record.id, "upi", dec!(50)).await.unwrap().is_none());
    assert!(refunds
        .insert(&mut tx, record.id, order_id, user_id, "upi", dec!(50))
        .await
        .unwrap()
        .is_none());
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "needs a Postgres instance via DATABASE_URL"]
async fn order_status_update_is_conditional_on_the_read_status() {
    let pool = pool().await;
    let orders = OrderStore::new(pool.clone());
    let (order_id, _) = seeded_order(&pool, "placed").await;

    let updated = orders
        .update_status(order_id, OrderStatus::Placed, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    assert!(updated.is_some());

    // A second caller still holding the 'placed' read matches nothing.
    let lost = orders
        .update_status(order_id, OrderStatus::Placed, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    assert!(lost.is_none());
}
