use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use serde::Serialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::db::queries::expenses;
use crate::error::{AppError, AppResult};
use crate::models::{Expense, ExpenseInput};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Expense>>> {
    let conn = state.db.get()?;
    Ok(Json(expenses::list_expenses(&conn, user.id)?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ExpenseInput>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let new_expense = input.validate()?;

    let conn = state.db.get()?;
    let id = expenses::create_expense(&conn, user.id, &new_expense)?;
    let expense = expenses::get_expense(&conn, user.id, id)?
        .ok_or_else(|| AppError::Internal(format!("Expense {} vanished after insert", id)))?;

    info!(user_id = user.id, expense_id = id, "Expense created");
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(input): Json<ExpenseInput>,
) -> AppResult<Json<Expense>> {
    let new_expense = input.validate()?;

    let conn = state.db.get()?;
    if !expenses::update_expense(&conn, user.id, id, &new_expense)? {
        return Err(AppError::NotFound(format!("Expense {} not found", id)));
    }

    let expense = expenses::get_expense(&conn, user.id, id)?
        .ok_or_else(|| AppError::NotFound(format!("Expense {} not found", id)))?;
    Ok(Json(expense))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let conn = state.db.get()?;
    if !expenses::delete_expense(&conn, user.id, id)? {
        return Err(AppError::NotFound(format!("Expense {} not found", id)));
    }

    info!(user_id = user.id, expense_id = id, "Expense deleted");
    Ok(Json(MessageResponse {
        message: "Expense deleted".into(),
    }))
}
