use crate::error::AssignmentError;
use crate::models::{AssignmentRow, User};
use crate::services::assignment_service::{self, RunReport};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RunQuery {
    pub career_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub career_id: Option<i32>,
    #[serde(default)]
    pub unplaced: bool,
}

fn into_status(e: AssignmentError) -> StatusCode {
    match &e {
        AssignmentError::Database(inner) => {
            tracing::error!("Assignment run aborted: {}", inner);
        }
        other => tracing::warn!("Assignment request rejected: {}", other),
    }
    e.status_code()
}

/// Replaces the assignments of every group in the caller's scope for the
/// period. A run that places nothing still succeeds; the report says so.
pub async fn run_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(period_id): Path<i32>,
    Query(params): Query<RunQuery>,
) -> Result<Json<RunReport>, StatusCode> {
    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let report = assignment_service::run_assignment(&mut conn, &user, period_id, params.career_id)
        .map_err(into_status)?;

    Ok(Json(report))
}

pub async fn list_assignments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(period_id): Path<i32>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<AssignmentRow>>, StatusCode> {
    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let rows = assignment_service::list_assignments(
        &mut conn,
        &user,
        period_id,
        params.career_id,
        params.unplaced,
    )
    .map_err(into_status)?;

    Ok(Json(rows))
}
