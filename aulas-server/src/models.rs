use chrono::{NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// User models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

// Career models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::careers)]
pub struct Career {
    pub id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::careers)]
pub struct NewCareer {
    pub name: String,
}

// Professor models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::professors)]
pub struct Professor {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::professors)]
pub struct NewProfessor {
    pub name: String,
    pub email: Option<String>,
}

// Period models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::periods)]
pub struct Period {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::periods)]
pub struct NewPeriod {
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

// Room models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::rooms)]
pub struct Room {
    pub id: i32,
    pub name: String,
    pub capacity: i32,
    pub equipment: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::rooms)]
pub struct NewRoom {
    pub name: String,
    pub capacity: i32,
    pub equipment: Option<String>,
}

// Subject models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::subjects)]
pub struct Subject {
    pub id: i32,
    pub period_id: i32,
    pub name: String,
    pub user_id: i32,
    pub career_id: i32,
    pub professor_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::subjects)]
pub struct NewSubject {
    pub period_id: i32,
    pub name: String,
    pub user_id: i32,
    pub career_id: i32,
    pub professor_id: Option<i32>,
}

// Group models. `slots` holds the JSON-encoded weekly meeting slots.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::course_groups)]
pub struct CourseGroup {
    pub id: i32,
    pub subject_id: i32,
    pub section: String,
    pub enrolled: i32,
    pub shift: String,
    pub slots: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::course_groups)]
pub struct NewCourseGroup {
    pub subject_id: i32,
    pub section: String,
    pub enrolled: i32,
    pub shift: String,
    pub slots: String,
}

// Assignment models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::assignments)]
pub struct AssignmentRow {
    pub id: i32,
    pub period_id: i32,
    pub group_id: i32,
    pub room_id: Option<i32>,
    pub subject_id: i32,
    pub weekday: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub shift: String,
    pub career_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::assignments)]
pub struct NewAssignmentRow {
    pub period_id: i32,
    pub group_id: i32,
    pub room_id: Option<i32>,
    pub subject_id: i32,
    pub weekday: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub shift: String,
    pub career_id: i32,
}
