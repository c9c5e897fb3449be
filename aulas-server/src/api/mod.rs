pub mod assignments_api;
pub mod auth_api;
pub mod careers_api;
pub mod periods_api;
pub mod professors_api;
pub mod rooms_api;
pub mod subjects_api;
pub mod users_api;

use crate::AppState;
use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        // Rooms
        .route("/rooms", get(rooms_api::list_rooms))
        .route("/rooms", post(rooms_api::create_room))
        .route("/rooms/:id", put(rooms_api::update_room))
        .route("/rooms/:id", delete(rooms_api::delete_room))
        .route("/rooms/:id/timetable", get(rooms_api::get_room_timetable))
        // Careers
        .route("/careers", get(careers_api::list_careers))
        .route("/careers", post(careers_api::create_career))
        .route(
            "/careers/:id",
            put(careers_api::update_career).delete(careers_api::delete_career),
        )
        // Professors
        .route("/professors", get(professors_api::list_professors))
        .route("/professors", post(professors_api::create_professor))
        .route(
            "/professors/:id",
            put(professors_api::update_professor).delete(professors_api::delete_professor),
        )
        // Periods
        .route("/periods", get(periods_api::list_periods))
        .route("/periods", post(periods_api::create_period))
        .route("/periods/:id", put(periods_api::update_period))
        .route("/periods/:id", delete(periods_api::delete_period))
        // Subjects and their groups
        .route("/periods/:id/subjects", get(subjects_api::list_subjects))
        .route("/periods/:id/subjects", post(subjects_api::create_subject))
        .route("/subjects/:id", put(subjects_api::update_subject))
        .route("/subjects/:id", delete(subjects_api::delete_subject))
        .route("/subjects/:id/groups", get(subjects_api::list_groups))
        .route("/subjects/:id/groups", post(subjects_api::create_group))
        .route("/groups/:id", put(subjects_api::update_group))
        .route("/groups/:id", delete(subjects_api::delete_group))
        // Assignments
        .route(
            "/periods/:id/assignments",
            get(assignments_api::list_assignments),
        )
        .route(
            "/periods/:id/assignments/run",
            post(assignments_api::run_assignment),
        )
        // Users
        .route("/users", get(users_api::list_users))
        .route("/users", post(users_api::create_user))
        .route("/users/:id", put(users_api::update_user))
        .route("/users/:id", delete(users_api::delete_user))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::auth::middleware::auth_middleware,
        ));

    Router::new()
        // Public auth endpoints
        .route("/auth/login", post(auth_api::login))
        .route("/auth/logout", post(auth_api::logout))
        .merge(protected_routes)
}

/// Maps a failed write to a client-facing status. Constraint violations are
/// the caller's fault; anything else is logged and reported as a 500.
pub fn db_error_status(e: DieselError) -> StatusCode {
    match e {
        DieselError::NotFound => StatusCode::NOT_FOUND,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => StatusCode::CONFLICT,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            StatusCode::CONFLICT
        }
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, _) => {
            StatusCode::BAD_REQUEST
        }
        other => {
            tracing::error!("Database error: {}", other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
