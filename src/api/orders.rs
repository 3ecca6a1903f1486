//! `POST /orders`: demo handler logged through [`ActionLogger`].

use axum::{http::StatusCode, Json};
use correlog::{ActionError, ActionLogger, ActionResult, FailedAction, RequestInfo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Body of `POST /orders`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewOrder {
    pub sku: String,
    pub quantity: u32,
}

/// Accept an order and answer `201` with its new id.
///
/// A zero quantity fails the action; how that failure reaches the client
/// depends on the logger's error handler (see [`acknowledge`]).
pub async fn create_order(
    log: ActionLogger,
    info: RequestInfo,
    Json(order): Json<NewOrder>,
) -> Result<ActionResult, ActionError> {
    log.run(&info, &order, async {
        if order.quantity == 0 {
            return Err(ActionError::msg(format!(
                "order for `{}` has zero quantity",
                order.sku
            )));
        }
        Ok(ActionResult::payload(StatusCode::CREATED, Uuid::new_v4()))
    })
    .await
}

/// Error handler for callers that must always get a `200` receipt.
pub fn acknowledge(failed: &FailedAction<'_>) -> ActionResult {
    ActionResult::json(
        StatusCode::OK,
        &json!({
            "received": true,
            "error": failed.error.to_string(),
        }),
    )
}
