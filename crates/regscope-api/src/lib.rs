//! # regscope-api
//!
//! Thin JSON surface over the query aggregator.
//!
//! | Route                | Handler                 |
//! |----------------------|-------------------------|
//! | `GET /search`        | [`routes::search`]      |
//! | `GET /diff`          | [`routes::diff`]        |
//! | `GET /health/*`      | liveness / readiness    |

pub mod diff;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/search", get(routes::search))
        .route("/diff", get(routes::diff))
        .route("/health/liveness", get(routes::liveness))
        .route("/health/readiness", get(routes::readiness))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
