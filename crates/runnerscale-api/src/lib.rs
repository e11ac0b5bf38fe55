//! runnerscale-api — HTTP surface for the autoscaler.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition of the fleet gauges |
//! | GET | `/healthz` | Liveness probe |

pub mod handlers;

use axum::Router;
use axum::routing::get;
use runnerscale_metrics::FleetGauges;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub gauges: FleetGauges,
}

/// Build the router served on the metrics listen address.
pub fn build_router(gauges: FleetGauges) -> Router {
    let api_state = ApiState { gauges };

    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/healthz", get(handlers::healthz))
        .with_state(api_state)
}
