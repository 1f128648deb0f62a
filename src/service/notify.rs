//! Best-effort customer notifications.
//!
//! Delivery goes out over the NATS bridge when one is configured; the actual
//! email/SMS transport lives behind it. Whatever happens, one row lands in
//! the notification log, and no failure here ever propagates to the caller.

use serde_json::json;
use uuid::Uuid;

use crate::state::AppState;
use crate::store::{DeliveryStatus, NotificationStore};

const SUBJECT: &str = "storefront.notifications";

#[derive(Clone)]
pub struct Notifier {
    log: NotificationStore,
    nats: Option<async_nats::Client>,
}

impl Notifier {
    pub fn new(state: &AppState) -> Self {
        Self { log: NotificationStore::new(state.db.clone()), nats: state.nats.clone() }
    }

    /// Fire-and-forget. Errors are logged and recorded, never returned.
    /// Every event writes a log row, even when there is nobody to deliver to.
    pub async fn order_event(
        &self,
        event: &str,
        order_id: Uuid,
        user_id: Option<Uuid>,
        detail: serde_json::Value,
    ) {
        let outcome = self.deliver(event, order_id, user_id, detail).await;
        let (status, error) = match &outcome {
            Ok(()) => (DeliveryStatus::Sent, None),
            Err(reason) => {
                tracing::warn!(%order_id, event, reason, "notification delivery failed");
                (DeliveryStatus::Failed, Some(reason.as_str()))
            }
        };

        if let Err(err) = self
            .log
            .record(Some(order_id), user_id, "email", event, status, error)
            .await
        {
            tracing::warn!(%order_id, event, error = %err, "failed to write notification log");
        }
    }

    async fn deliver(
        &self,
        event: &str,
        order_id: Uuid,
        user_id: Option<Uuid>,
        detail: serde_json::Value,
    ) -> Result<(), String> {
        // Guest orders have no recipient on file; the log row still records
        // the attempt.
        let Some(user_id) = user_id else {
            return Err("no recipient: guest order".to_string());
        };
        let Some(client) = &self.nats else {
            return Err("no notification transport configured".to_string());
        };
        let payload = json!({
            "event": event,
            "order_id": order_id,
            "user_id": user_id,
            "detail": detail,
        });
        let bytes = serde_json::to_vec(&payload).map_err(|e| e.to_string())?;
        client
            .publish(SUBJECT.to_string(), bytes.into())
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    // Lazy pool: never connects on the paths under test.
    fn notifier() -> Notifier {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/unused");
        Notifier { log: NotificationStore::new(pool.unwrap()), nats: None }
    }

    #[tokio::test]
    async fn guest_order_delivery_fails_but_is_reportable() {
        let n = notifier();
        let err = n
            .deliver("invoice", Uuid::from_u128(1), None, json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("no recipient"));
    }

    #[tokio::test]
    async fn missing_transport_is_a_delivery_failure_not_a_skip() {
        let n = notifier();
        let err = n
            .deliver("invoice", Uuid::from_u128(1), Some(Uuid::from_u128(2)), json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("transport"));
    }
}
