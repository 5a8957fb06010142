pub mod analytics;
pub mod expenses;
pub mod insights;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::auth;
use crate::state::AppState;

/// All API routes. Everything except health, register and login requires a
/// bearer token.
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/expenses", get(expenses::list).post(expenses::create))
        .route(
            "/api/expenses/:id",
            put(expenses::update).delete(expenses::delete),
        )
        .route("/api/analytics", get(analytics::index))
        .route("/api/ai/insights", get(insights::index))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware));

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/health", get(health))
        .merge(protected)
}

async fn health() -> &'static str {
    "OK"
}
