//! Demo HTTP surface wired with both interceptors.

pub mod health;
pub mod orders;

use axum::{
    routing::{get, post},
    Router,
};
use correlog::{config::Config, ActionLogger, RequestLogger, RouterExt};
use tower_http::catch_panic::CatchPanicLayer;

/// Build the demo router from `config`.
///
/// Layer order, outermost first: correlation id, panic catcher, request log.
/// A panic is logged, turned into a `500`, and still gets the id echoed.
pub fn router(config: &Config) -> Result<Router, correlog::Error> {
    let action_log = if config.action_log.acknowledge_errors {
        ActionLogger::tracing().on_error(orders::acknowledge)
    } else {
        ActionLogger::tracing()
    };

    let mut app = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/ping", get(health::ping))
        .route("/fail", get(health::fail))
        .route("/panic", get(health::panicking))
        .route("/orders", post(orders::create_order))
        .with_action_log(action_log);

    if config.request_log.enabled {
        app = app.with_request_log(RequestLogger::tracing());
    }

    app.layer(CatchPanicLayer::new())
        .with_correlation_id(config.correlation.to_config())
}
