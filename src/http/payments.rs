//! Payment checkout sessions and the provider webhook.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::http::AppState;
use crate::payments::{self, CheckoutSession, WebhookEvent};
use crate::service::orders;

pub async fn create_checkout_session(
    State(s): State<AppState>,
    Path((user_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CheckoutSession>> {
    let order = orders::order_details(&s.db, user_id, order_id).await?;
    let session = payments::build_checkout_session(&order, &s.config.server_url);
    tracing::info!(order_id = %order_id, session_id = %session.id, "checkout session created");
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct SessionParams {
    pub session_id: String,
}

pub async fn success(Query(params): Query<SessionParams>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "success",
        "message": "Payment completed successfully",
        "session_id": params.session_id,
    }))
}

pub async fn cancel(Query(params): Query<SessionParams>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "cancelled",
        "message": "Payment was cancelled",
        "session_id": params.session_id,
    }))
}

/// Provider callback. Processing failures after authentication are logged
/// and acknowledged with 200 so the provider does not retry events that
/// can never resolve (stale order ids, unhandled types).
pub async fn webhook(
    State(s): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<&'static str> {
    if !s.config.webhook_secret.is_empty() {
        let signature = headers
            .get("x-webhook-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::InvalidArgument("webhook signature is required".into()))?;
        if signature != s.config.webhook_secret {
            return Err(Error::InvalidArgument("invalid webhook signature".into()));
        }
    }

    let event: WebhookEvent = serde_json::from_str(&body)
        .map_err(|e| Error::InvalidArgument(format!("malformed webhook payload: {e}")))?;

    match (event.target_status(), event.order_id()) {
        (Some(status), Some(order_id)) => {
            orders::update_status_from_webhook(&s.db, &s.nats, order_id, status).await?;
        }
        (Some(_), None) => {
            tracing::warn!(event_type = %event.event_type, "webhook event carried no order id");
        }
        (None, _) => {
            tracing::info!(event_type = %event.event_type, "unhandled webhook event type");
        }
    }

    Ok("Webhook processed successfully")
}
