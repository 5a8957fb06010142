use axum::extract::State;
use axum::response::Json;
use axum::Extension;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::SpendingAnalytics;
use crate::services::analytics;
use crate::state::AppState;

/// All six aggregate collections over the user's full history. Filtering
/// by month or year is left to the client.
pub async fn index(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<SpendingAnalytics>> {
    let spending = analytics::aggregate_from_pool(&state.db, user.id)?;
    Ok(Json(spending))
}
