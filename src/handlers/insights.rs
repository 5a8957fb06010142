use axum::extract::State;
use axum::response::Json;
use axum::Extension;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::Insight;
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Insight>> {
    let insight = state.insights.insights_for(&state.db, user.id).await?;
    Ok(Json(insight))
}
