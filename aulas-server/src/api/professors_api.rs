use crate::api::db_error_status;
use crate::auth::require_admin;
use crate::models::{NewProfessor, Professor, User};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;

pub async fn list_professors(
    State(state): State<AppState>,
) -> Result<Json<Vec<Professor>>, StatusCode> {
    use crate::schema::professors::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = professors
        .order(name.asc())
        .select(Professor::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_professor(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(new_professor): Json<NewProfessor>,
) -> Result<Json<Professor>, StatusCode> {
    require_admin(&user)?;
    if new_professor.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    use crate::schema::professors;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let professor = diesel::insert_into(professors::table)
        .values(&new_professor)
        .returning(Professor::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(professor))
}

pub async fn update_professor(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(professor_id): Path<i32>,
    Json(updates): Json<NewProfessor>,
) -> Result<Json<Professor>, StatusCode> {
    require_admin(&user)?;
    use crate::schema::professors::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let professor = diesel::update(professors.filter(id.eq(professor_id)))
        .set((
            name.eq(updates.name),
            email.eq(updates.email),
            updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .returning(Professor::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(professor))
}

/// Subjects taught by the professor keep existing, unstaffed.
pub async fn delete_professor(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(professor_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    require_admin(&user)?;
    use crate::schema::{professors, subjects};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let deleted = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::update(subjects::table.filter(subjects::professor_id.eq(professor_id)))
                .set(subjects::professor_id.eq(None::<i32>))
                .execute(conn)?;
            diesel::delete(professors::table.filter(professors::id.eq(professor_id)))
                .execute(conn)
        })
        .map_err(db_error_status)?;

    if deleted == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT)
}
