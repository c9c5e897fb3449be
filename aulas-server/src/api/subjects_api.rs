use crate::api::db_error_status;
use crate::models::{CourseGroup, NewCourseGroup, NewSubject, Subject, User};
use crate::services::assignment::{parse_slots, Shift, Slot};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct SubjectRequest {
    pub name: String,
    pub career_id: i32,
    pub professor_id: Option<i32>,
    /// Owner; only admins may set it, everyone else owns what they create.
    pub user_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct GroupRequest {
    pub section: String,
    pub enrolled: i32,
    pub shift: Shift,
    pub slots: Vec<Slot>,
}

#[derive(Serialize)]
pub struct GroupResponse {
    pub id: i32,
    pub subject_id: i32,
    pub section: String,
    pub enrolled: i32,
    pub shift: String,
    pub slots: Vec<Slot>,
    /// False when the stored slot data could not be read; such groups are skipped by assignment runs.
    pub slots_valid: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<CourseGroup> for GroupResponse {
    fn from(group: CourseGroup) -> Self {
        let parsed = parse_slots(&group.slots);
        Self {
            id: group.id,
            subject_id: group.subject_id,
            section: group.section,
            enrolled: group.enrolled,
            shift: group.shift,
            slots_valid: parsed.is_ok(),
            slots: parsed.unwrap_or_default(),
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

impl GroupRequest {
    fn validate(&self) -> Result<String, StatusCode> {
        if self.section.trim().is_empty() || self.enrolled <= 0 {
            return Err(StatusCode::BAD_REQUEST);
        }
        if self.slots.iter().any(|slot| !slot.is_valid()) {
            return Err(StatusCode::BAD_REQUEST);
        }
        serde_json::to_string(&self.slots).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Loads a subject the user is allowed to modify.
fn owned_subject(
    conn: &mut SqliteConnection,
    user: &User,
    subject_id: i32,
) -> Result<Subject, StatusCode> {
    use crate::schema::subjects::dsl::*;

    let subject = subjects
        .filter(id.eq(subject_id))
        .select(Subject::as_select())
        .first::<Subject>(conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if !user.is_admin() && subject.user_id != user.id {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(subject)
}

fn owned_group(
    conn: &mut SqliteConnection,
    user: &User,
    group_id: i32,
) -> Result<CourseGroup, StatusCode> {
    use crate::schema::course_groups::dsl::*;

    let group = course_groups
        .filter(id.eq(group_id))
        .select(CourseGroup::as_select())
        .first::<CourseGroup>(conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    owned_subject(conn, user, group.subject_id)?;
    Ok(group)
}

pub async fn list_subjects(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(period): Path<i32>,
) -> Result<Json<Vec<Subject>>, StatusCode> {
    use crate::schema::subjects::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut query = subjects.filter(period_id.eq(period)).into_boxed();
    if !user.is_admin() {
        query = query.filter(user_id.eq(user.id));
    }

    let results = query
        .order(name.asc())
        .select(Subject::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_subject(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(period): Path<i32>,
    Json(req): Json<SubjectRequest>,
) -> Result<Json<Subject>, StatusCode> {
    if req.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let owner = match req.user_id {
        Some(other) if other != user.id && !user.is_admin() => {
            return Err(StatusCode::FORBIDDEN);
        }
        Some(other) => other,
        None => user.id,
    };
    use crate::schema::subjects;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_subject = NewSubject {
        period_id: period,
        name: req.name,
        user_id: owner,
        career_id: req.career_id,
        professor_id: req.professor_id,
    };

    let subject = diesel::insert_into(subjects::table)
        .values(&new_subject)
        .returning(Subject::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(subject))
}

pub async fn update_subject(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(subject_id): Path<i32>,
    Json(req): Json<SubjectRequest>,
) -> Result<Json<Subject>, StatusCode> {
    if req.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    use crate::schema::subjects::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let current = owned_subject(&mut conn, &user, subject_id)?;

    // Ownership transfer is an admin operation.
    let owner = match req.user_id {
        Some(other) if other != current.user_id && !user.is_admin() => {
            return Err(StatusCode::FORBIDDEN);
        }
        Some(other) => other,
        None => current.user_id,
    };

    // Stored assignments carry the career; they change with the subject or not at all.
    let subject = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            let subject = diesel::update(subjects.filter(id.eq(subject_id)))
                .set((
                    name.eq(req.name),
                    career_id.eq(req.career_id),
                    professor_id.eq(req.professor_id),
                    user_id.eq(owner),
                    updated_at.eq(chrono::Utc::now().naive_utc()),
                ))
                .returning(Subject::as_select())
                .get_result(conn)?;

            if subject.career_id != current.career_id {
                use crate::schema::assignments;
                diesel::update(assignments::table.filter(assignments::subject_id.eq(subject_id)))
                    .set(assignments::career_id.eq(subject.career_id))
                    .execute(conn)?;
            }
            Ok(subject)
        })
        .map_err(db_error_status)?;

    Ok(Json(subject))
}

pub async fn delete_subject(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(subject_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::{assignments, course_groups, subjects};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    owned_subject(&mut conn, &user, subject_id)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(assignments::table.filter(assignments::subject_id.eq(subject_id)))
            .execute(conn)?;
        diesel::delete(course_groups::table.filter(course_groups::subject_id.eq(subject_id)))
            .execute(conn)?;
        diesel::delete(subjects::table.filter(subjects::id.eq(subject_id))).execute(conn)
    })
    .map_err(db_error_status)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(subject): Path<i32>,
) -> Result<Json<Vec<GroupResponse>>, StatusCode> {
    use crate::schema::course_groups::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    owned_subject(&mut conn, &user, subject)?;

    let results = course_groups
        .filter(subject_id.eq(subject))
        .order(section.asc())
        .select(CourseGroup::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results.into_iter().map(GroupResponse::from).collect()))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(subject): Path<i32>,
    Json(req): Json<GroupRequest>,
) -> Result<Json<GroupResponse>, StatusCode> {
    let encoded_slots = req.validate()?;
    use crate::schema::course_groups;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    owned_subject(&mut conn, &user, subject)?;

    let new_group = NewCourseGroup {
        subject_id: subject,
        section: req.section,
        enrolled: req.enrolled,
        shift: req.shift.to_string(),
        slots: encoded_slots,
    };

    let group = diesel::insert_into(course_groups::table)
        .values(&new_group)
        .returning(CourseGroup::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(group.into()))
}

/// Existing assignments of the group are kept until the next run replaces them.
pub async fn update_group(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(group_id): Path<i32>,
    Json(req): Json<GroupRequest>,
) -> Result<Json<GroupResponse>, StatusCode> {
    let encoded_slots = req.validate()?;
    use crate::schema::course_groups::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    owned_group(&mut conn, &user, group_id)?;

    let group = diesel::update(course_groups.filter(id.eq(group_id)))
        .set((
            section.eq(req.section),
            enrolled.eq(req.enrolled),
            shift.eq(req.shift.to_string()),
            slots.eq(encoded_slots),
            updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .returning(CourseGroup::as_select())
        .get_result(&mut conn)
        .map_err(db_error_status)?;

    Ok(Json(group.into()))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(group_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::{assignments, course_groups};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    owned_group(&mut conn, &user, group_id)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(assignments::table.filter(assignments::group_id.eq(group_id)))
            .execute(conn)?;
        diesel::delete(course_groups::table.filter(course_groups::id.eq(group_id))).execute(conn)
    })
    .map_err(db_error_status)?;

    Ok(StatusCode::NO_CONTENT)
}
