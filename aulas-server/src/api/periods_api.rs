use crate::api::db_error_status;
use crate::auth::require_admin;
use crate::models::{NewPeriod, Period, User};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;
use serde::Deserialize;

#[derive(Deserialize, AsChangeset)]
#[diesel(table_name = crate::schema::periods)]
pub struct UpdatePeriod {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_periods(State(state): State<AppState>) -> Result<Json<Vec<Period>>, StatusCode> {
    use crate::schema::periods::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = periods
        .order(code.desc())
        .select(Period::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_period(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(new_period): Json<NewPeriod>,
) -> Result<Json<Period>, StatusCode> {
    require_admin(&user)?;
    if new_period.code.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    use crate::schema::periods;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let period = diesel::insert_into(periods::table)
        .values(&new_period)
        .returning(Period::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    tracing::info!("Period {} created", period.code);
    Ok(Json(period))
}

pub async fn update_period(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(period_id): Path<i32>,
    Json(updates): Json<UpdatePeriod>,
) -> Result<Json<Period>, StatusCode> {
    require_admin(&user)?;
    if updates.code.is_none() && updates.name.is_none() && updates.is_active.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }
    use crate::schema::periods::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let period = diesel::update(periods.filter(id.eq(period_id)))
        .set(&updates)
        .returning(Period::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(period))
}

/// Removes the period together with its subjects, groups and assignments.
pub async fn delete_period(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(period_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    require_admin(&user)?;
    use crate::schema::{assignments, course_groups, periods, subjects};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let deleted = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            let subject_ids: Vec<i32> = subjects::table
                .filter(subjects::period_id.eq(period_id))
                .select(subjects::id)
                .load(conn)?;

            diesel::delete(assignments::table.filter(assignments::period_id.eq(period_id)))
                .execute(conn)?;
            diesel::delete(course_groups::table.filter(course_groups::subject_id.eq_any(&subject_ids)))
                .execute(conn)?;
            diesel::delete(subjects::table.filter(subjects::period_id.eq(period_id)))
                .execute(conn)?;
            diesel::delete(periods::table.filter(periods::id.eq(period_id))).execute(conn)
        })
        .map_err(db_error_status)?;

    if deleted == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    tracing::info!("Period {} deleted", period_id);
    Ok(StatusCode::NO_CONTENT)
}
