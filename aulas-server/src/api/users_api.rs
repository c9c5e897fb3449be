use crate::api::db_error_status;
use crate::auth::{hash_password, require_admin};
use crate::models::{NewUser, User};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Deserialize;

const ROLES: &[&str] = &["admin", "user"];

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

fn check_role(requested: &str) -> Result<(), StatusCode> {
    if ROLES.contains(&requested) {
        Ok(())
    } else {
        Err(StatusCode::BAD_REQUEST)
    }
}

/// Refuses to let the last admin disappear, whether by demotion or deletion.
fn ensure_other_admin(conn: &mut SqliteConnection, user_id: i32) -> Result<(), StatusCode> {
    use crate::schema::users::dsl::*;

    let target = users
        .filter(id.eq(user_id))
        .select(User::as_select())
        .first::<User>(conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(target) = target {
        if target.is_admin() {
            let admin_count: i64 = users
                .filter(role.eq("admin"))
                .count()
                .get_result(conn)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            if admin_count <= 1 {
                return Err(StatusCode::BAD_REQUEST);
            }
        }
    }
    Ok(())
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<User>>, StatusCode> {
    require_admin(&user)?;
    use crate::schema::users::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = users
        .order(username.asc())
        .select(User::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, StatusCode> {
    require_admin(&user)?;
    check_role(&req.role)?;
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    use crate::schema::users;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let password_hash =
        hash_password(&req.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_user = NewUser {
        username: req.username,
        password_hash,
        role: req.role,
    };

    let user = diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<i32>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, StatusCode> {
    require_admin(&user)?;
    if let Some(new_role) = &req.role {
        check_role(new_role)?;
    }
    use crate::schema::users::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if matches!(&req.role, Some(new_role) if new_role != "admin") {
        ensure_other_admin(&mut conn, user_id)?;
    }

    let new_hash = req
        .password
        .as_deref()
        .map(hash_password)
        .transpose()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let user = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            if let Some(new_username) = &req.username {
                diesel::update(users.filter(id.eq(user_id)))
                    .set(username.eq(new_username))
                    .execute(conn)?;
            }
            if let Some(new_hash) = &new_hash {
                diesel::update(users.filter(id.eq(user_id)))
                    .set(password_hash.eq(new_hash))
                    .execute(conn)?;
            }
            if let Some(new_role) = &req.role {
                diesel::update(users.filter(id.eq(user_id)))
                    .set(role.eq(new_role))
                    .execute(conn)?;
            }

            diesel::update(users.filter(id.eq(user_id)))
                .set(updated_at.eq(chrono::Utc::now().naive_utc()))
                .returning(User::as_select())
                .get_result(conn)
        })
        .map_err(db_error_status)?;

    Ok(Json(user))
}

/// Subjects owned by the user keep their owner id; reassign them before
/// deleting, or the delete fails with 409.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    require_admin(&user)?;
    use crate::schema::users::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    ensure_other_admin(&mut conn, user_id)?;

    let deleted = diesel::delete(users.filter(id.eq(user_id)))
        .execute(&mut conn)
        .map_err(db_error_status)?;

    if deleted == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT)
}
