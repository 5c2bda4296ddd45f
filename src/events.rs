//! Best-effort order lifecycle events over NATS.
//!
//! Publishing is fire-and-forget: the service stays fully functional with
//! no broker configured, and a publish failure is logged, never surfaced.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::order::Order;

const SUBJECT_ORDER_PLACED: &str = "orders.placed";
const SUBJECT_ORDER_STATUS: &str = "orders.status_changed";

#[derive(Debug, Serialize)]
struct OrderPlaced {
    order_id: Uuid,
    user_id: Uuid,
    total_price: Decimal,
}

#[derive(Debug, Serialize)]
struct OrderStatusChanged {
    order_id: Uuid,
    status: String,
}

pub async fn publish_order_placed(nats: &Option<async_nats::Client>, order: &Order) {
    let payload = OrderPlaced {
        order_id: order.id,
        user_id: order.user_id,
        total_price: order.total_price,
    };
    publish(nats, SUBJECT_ORDER_PLACED, &payload).await;
}

pub async fn publish_order_status_changed(
    nats: &Option<async_nats::Client>,
    order_id: Uuid,
    status: &str,
) {
    let payload = OrderStatusChanged {
        order_id,
        status: status.to_string(),
    };
    publish(nats, SUBJECT_ORDER_STATUS, &payload).await;
}

async fn publish<T: Serialize>(nats: &Option<async_nats::Client>, subject: &str, payload: &T) {
    let Some(client) = nats else { return };
    let bytes = match serde_json::to_vec(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(subject, error = %e, "failed to serialize event");
            return;
        }
    };
    if let Err(e) = client.publish(subject.to_string(), bytes.into()).await {
        tracing::warn!(subject, error = %e, "failed to publish event");
    }
}
