use crate::api::db_error_status;
use crate::auth::require_admin;
use crate::models::{Career, NewCareer, User};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;

pub async fn list_careers(State(state): State<AppState>) -> Result<Json<Vec<Career>>, StatusCode> {
    use crate::schema::careers::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = careers
        .order(name.asc())
        .select(Career::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_career(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(new_career): Json<NewCareer>,
) -> Result<Json<Career>, StatusCode> {
    require_admin(&user)?;
    if new_career.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    use crate::schema::careers;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let career = diesel::insert_into(careers::table)
        .values(&new_career)
        .returning(Career::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(career))
}

pub async fn update_career(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(career_id): Path<i32>,
    Json(updates): Json<NewCareer>,
) -> Result<Json<Career>, StatusCode> {
    require_admin(&user)?;
    if updates.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    use crate::schema::careers::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let career = diesel::update(careers.filter(id.eq(career_id)))
        .set(name.eq(updates.name))
        .returning(Career::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(career))
}

/// Fails with 409 while subjects still belong to the career.
pub async fn delete_career(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(career_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    require_admin(&user)?;
    use crate::schema::careers::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let deleted = diesel::delete(careers.filter(id.eq(career_id)))
        .execute(&mut conn)
        .map_err(db_error_status)?;

    if deleted == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT)
}
