use crate::api::db_error_status;
use crate::auth::require_admin;
use crate::models::{AssignmentRow, NewRoom, Room, User};
use crate::services::assignment_service;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct TimetableQuery {
    pub period_id: i32,
}

fn validate_room(room: &NewRoom) -> Result<(), StatusCode> {
    if room.name.trim().is_empty() || room.capacity <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>, StatusCode> {
    use crate::schema::rooms::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = rooms
        .order(id.asc())
        .select(Room::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_room(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(new_room): Json<NewRoom>,
) -> Result<Json<Room>, StatusCode> {
    require_admin(&user)?;
    validate_room(&new_room)?;
    use crate::schema::rooms;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let room = diesel::insert_into(rooms::table)
        .values(&new_room)
        .returning(Room::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    tracing::info!("Room {} created (capacity {})", room.name, room.capacity);
    Ok(Json(room))
}

pub async fn update_room(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(room_id): Path<i32>,
    Json(updates): Json<NewRoom>,
) -> Result<Json<Room>, StatusCode> {
    require_admin(&user)?;
    validate_room(&updates)?;
    use crate::schema::rooms::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let room = diesel::update(rooms.filter(id.eq(room_id)))
        .set((
            name.eq(updates.name),
            capacity.eq(updates.capacity),
            equipment.eq(updates.equipment),
            updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .returning(Room::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(room))
}

/// Deleting a room never removes assignments; the ones pointing at it become unplaced.
pub async fn delete_room(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(room_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    require_admin(&user)?;
    use crate::schema::{assignments, rooms};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let deleted = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            let released = diesel::update(assignments::table.filter(assignments::room_id.eq(room_id)))
                .set(assignments::room_id.eq(None::<i32>))
                .execute(conn)?;
            if released > 0 {
                tracing::info!("Room {} deleted; {} assignments now unplaced", room_id, released);
            }

            diesel::delete(rooms::table.filter(rooms::id.eq(room_id))).execute(conn)
        })
        .map_err(db_error_status)?;

    if deleted == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_room_timetable(
    State(state): State<AppState>,
    Path(room_id): Path<i32>,
    Query(params): Query<TimetableQuery>,
) -> Result<Json<Vec<AssignmentRow>>, StatusCode> {
    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let rows = assignment_service::room_timetable(&mut conn, room_id, params.period_id)
        .map_err(|e| {
            tracing::warn!("Room timetable failed: {}", e);
            e.status_code()
        })?;

    Ok(Json(rows))
}
