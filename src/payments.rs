//! Payment-gateway plumbing: checkout sessions and webhook events.
//!
//! The gateway itself is an external collaborator. This module builds the
//! session payload a client forwards to the gateway and interprets the
//! events the gateway posts back; it never calls the gateway directly.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{status, OrderView};

/// A gateway checkout session for one order.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Order id, echoed back by the gateway in webhook events.
    pub client_reference_id: Uuid,
    pub success_url: String,
    pub cancel_url: String,
    pub line_items: Vec<SessionLineItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub quantity: i64,
    /// Unit price in minor units (cents).
    pub unit_amount: i64,
}

/// Convert a decimal price to minor units, half-up.
pub fn to_minor_units(price: Decimal) -> i64 {
    (price * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

pub fn build_checkout_session(order: &OrderView, server_url: &str) -> CheckoutSession {
    let line_items = order
        .items
        .iter()
        .map(|item| SessionLineItem {
            name: item.product_name.clone(),
            quantity: i64::from(item.quantity),
            unit_amount: to_minor_units(item.price),
        })
        .collect();

    CheckoutSession {
        id: format!("cs_{}", Uuid::new_v4().simple()),
        client_reference_id: order.order.id,
        success_url: format!("{server_url}/api/payments/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{server_url}/api/payments/cancel?session_id={{CHECKOUT_SESSION_ID}}"),
        line_items,
    }
}

/// Event envelope the gateway posts to the webhook endpoint.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: EventObject,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventObject {
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl WebhookEvent {
    /// Order id carried in `client_reference_id` (checkout sessions) or
    /// `metadata.order_id` (payment intents).
    pub fn order_id(&self) -> Option<Uuid> {
        self.data
            .object
            .client_reference_id
            .as_deref()
            .or_else(|| self.data.object.metadata.get("order_id").map(String::as_str))
            .and_then(|s| s.parse().ok())
    }

    /// Order status this event transitions to, if the type is one we handle.
    pub fn target_status(&self) -> Option<&'static str> {
        match self.event_type.as_str() {
            "checkout.session.completed" | "payment_intent.succeeded" => Some(status::PAID),
            "payment_intent.payment_failed" => Some(status::PAYMENT_FAILED),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Order, OrderItemView};
    use chrono::Utc;

    #[test]
    fn minor_units_round_half_up() {
        assert_eq!(to_minor_units(Decimal::new(1000, 2)), 1000);
        assert_eq!(to_minor_units(Decimal::new(9995, 3)), 1000); // 9.995 -> 10.00
        assert_eq!(to_minor_units(Decimal::new(9994, 3)), 999);
    }

    #[test]
    fn session_carries_order_reference_and_lines() {
        let order_id = Uuid::new_v4();
        let view = OrderView {
            order: Order {
                id: order_id,
                user_id: Uuid::new_v4(),
                status: status::PENDING.into(),
                total_price: Decimal::new(2500, 2),
                shipping_address: "somewhere".into(),
                order_date: Utc::now(),
            },
            items: vec![OrderItemView {
                product_id: Uuid::new_v4(),
                product_name: "Widget".into(),
                quantity: 2,
                price: Decimal::new(1250, 2),
            }],
        };
        let session = build_checkout_session(&view, "http://localhost:8080");
        assert_eq!(session.client_reference_id, order_id);
        assert!(session.id.starts_with("cs_"));
        assert_eq!(
            session.line_items,
            vec![SessionLineItem {
                name: "Widget".into(),
                quantity: 2,
                unit_amount: 1250,
            }]
        );
        assert!(session.success_url.contains("/api/payments/success"));
    }

    #[test]
    fn event_types_map_to_statuses() {
        let event = |t: &str| WebhookEvent {
            event_type: t.into(),
            data: EventData::default(),
        };
        assert_eq!(event("checkout.session.completed").target_status(), Some(status::PAID));
        assert_eq!(event("payment_intent.succeeded").target_status(), Some(status::PAID));
        assert_eq!(
            event("payment_intent.payment_failed").target_status(),
            Some(status::PAYMENT_FAILED)
        );
        assert_eq!(event("invoice.created").target_status(), None);
    }

    #[test]
    fn order_id_prefers_client_reference_then_metadata() {
        let id = Uuid::new_v4();
        let json = serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": { "metadata": { "order_id": id.to_string() } } }
        });
        let event: WebhookEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.order_id(), Some(id));

        let json = serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": { "client_reference_id": id.to_string() } }
        });
        let event: WebhookEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.order_id(), Some(id));

        let json = serde_json::json!({ "type": "x", "data": { "object": {} } });
        let event: WebhookEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.order_id(), None);
    }
}
