use crate::error::AssignmentError;
use crate::models::{AssignmentRow, CourseGroup, NewAssignmentRow, User};
use crate::services::assignment::{
    engine, expander, Assignment, Booking, GroupRecord, RoomCapacity, Weekday,
};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

// Keeps each INSERT well under SQLite's bound-parameter limit.
const INSERT_CHUNK: usize = 500;

/// Everything one run reads, already narrowed to the caller's scope.
#[derive(Debug)]
pub struct RunInputs {
    pub rooms: Vec<RoomCapacity>,
    pub groups: Vec<GroupRecord>,
    /// subject id -> career id, for the scoped subjects only
    pub careers: HashMap<i32, i32>,
    /// Placed intervals of the period that belong to groups outside the run
    pub booked: Vec<Booking>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunReport {
    pub period_id: i32,
    pub groups: usize,
    pub requests: usize,
    pub placed: usize,
    pub unplaced: usize,
    pub unplaced_groups: Vec<i32>,
}

impl RunReport {
    fn new(period_id: i32, groups: usize, assignments: &[Assignment]) -> Self {
        let placed = assignments.iter().filter(|a| a.is_placed()).count();
        let unplaced_groups: BTreeSet<i32> = assignments
            .iter()
            .filter(|a| !a.is_placed())
            .map(|a| a.group_id)
            .collect();

        Self {
            period_id,
            groups,
            requests: assignments.len(),
            placed,
            unplaced: assignments.len() - placed,
            unplaced_groups: unplaced_groups.into_iter().collect(),
        }
    }
}

fn ensure_period(conn: &mut SqliteConnection, period_id: i32) -> Result<(), AssignmentError> {
    use crate::schema::periods;

    if period_id <= 0 {
        return Err(AssignmentError::InvalidPeriod(period_id));
    }

    let count: i64 = periods::table
        .filter(periods::id.eq(period_id))
        .count()
        .get_result(conn)?;

    if count == 0 {
        return Err(AssignmentError::PeriodNotFound(period_id));
    }
    Ok(())
}

fn ensure_career(conn: &mut SqliteConnection, career_id: i32) -> Result<(), AssignmentError> {
    use crate::schema::careers;

    let count: i64 = careers::table
        .filter(careers::id.eq(career_id))
        .count()
        .get_result(conn)?;

    if count == 0 {
        return Err(AssignmentError::UnknownCareer(career_id));
    }
    Ok(())
}

/// Subjects of the period the caller may touch, as (subject id, career id).
/// Admins see every subject, optionally narrowed to one career; everyone
/// else only sees subjects they own.
fn scoped_subjects(
    conn: &mut SqliteConnection,
    caller: &User,
    period_id: i32,
    career_id: Option<i32>,
) -> QueryResult<Vec<(i32, i32)>> {
    use crate::schema::subjects;

    let mut query = subjects::table
        .filter(subjects::period_id.eq(period_id))
        .into_boxed();

    if !caller.is_admin() {
        query = query.filter(subjects::user_id.eq(caller.id));
    }
    if let Some(cid) = career_id {
        query = query.filter(subjects::career_id.eq(cid));
    }

    query
        .select((subjects::id, subjects::career_id))
        .order(subjects::id.asc())
        .load(conn)
}

pub fn load_inputs(
    conn: &mut SqliteConnection,
    caller: &User,
    period_id: i32,
    career_id: Option<i32>,
) -> Result<RunInputs, AssignmentError> {
    use crate::schema::{course_groups, rooms};

    ensure_period(conn, period_id)?;
    if let Some(cid) = career_id {
        ensure_career(conn, cid)?;
    }

    let rooms: Vec<RoomCapacity> = rooms::table
        .select((rooms::id, rooms::capacity))
        .order(rooms::id.asc())
        .load::<(i32, i32)>(conn)?
        .into_iter()
        .map(|(id, capacity)| RoomCapacity { id, capacity })
        .collect();

    let careers: HashMap<i32, i32> = scoped_subjects(conn, caller, period_id, career_id)?
        .into_iter()
        .collect();
    let subject_ids: Vec<i32> = careers.keys().copied().collect();

    let groups: Vec<GroupRecord> = course_groups::table
        .filter(course_groups::subject_id.eq_any(&subject_ids))
        .order(course_groups::id.asc())
        .select(CourseGroup::as_select())
        .load(conn)?
        .iter()
        .map(GroupRecord::from)
        .collect();

    let group_ids: Vec<i32> = groups.iter().map(|g| g.id).collect();
    let booked = bookings_outside(conn, period_id, &group_ids)?;

    Ok(RunInputs {
        rooms,
        groups,
        careers,
        booked,
    })
}

/// Rooms already held in the period by groups the run will not replace.
/// A scoped run must work around them.
fn bookings_outside(
    conn: &mut SqliteConnection,
    period_id: i32,
    group_ids: &[i32],
) -> QueryResult<Vec<Booking>> {
    use crate::schema::assignments;

    let rows: Vec<(Option<i32>, String, chrono::NaiveTime, chrono::NaiveTime)> = assignments::table
        .filter(assignments::period_id.eq(period_id))
        .filter(assignments::room_id.is_not_null())
        .filter(assignments::group_id.ne_all(group_ids))
        .select((
            assignments::room_id,
            assignments::weekday,
            assignments::start_time,
            assignments::end_time,
        ))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .filter_map(|(room_id, weekday, start, end)| {
            let weekday = match weekday.parse::<Weekday>() {
                Ok(day) => day,
                Err(e) => {
                    tracing::warn!("Ignoring stored assignment: {}", e);
                    return None;
                }
            };
            room_id.map(|room_id| Booking {
                room_id,
                weekday,
                start,
                end,
            })
        })
        .collect())
}

/// Deletes every assignment of `group_ids` and inserts `results` in their place.
/// Callers are expected to hold a transaction.
pub fn replace_assignments(
    conn: &mut SqliteConnection,
    period_id: i32,
    group_ids: &[i32],
    results: &[Assignment],
) -> QueryResult<usize> {
    use crate::schema::assignments;

    let removed = diesel::delete(assignments::table.filter(assignments::group_id.eq_any(group_ids)))
        .execute(conn)?;
    tracing::debug!("Removed {} previous assignments", removed);

    let rows: Vec<NewAssignmentRow> = results
        .iter()
        .map(|a| NewAssignmentRow {
            period_id,
            group_id: a.group_id,
            room_id: a.room_id,
            subject_id: a.subject_id,
            weekday: a.weekday.to_string(),
            start_time: a.start,
            end_time: a.end,
            shift: a.shift.to_string(),
            career_id: a.career_id,
        })
        .collect();

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        inserted += diesel::insert_into(assignments::table)
            .values(chunk)
            .execute(conn)?;
    }
    Ok(inserted)
}

/// Regenerates the room assignments of every group in the caller's scope for
/// one period. Loading, placement and replacement share a single
/// `BEGIN IMMEDIATE` transaction, so concurrent runs serialize and a failed
/// run leaves the previous assignments untouched.
pub fn run_assignment(
    conn: &mut SqliteConnection,
    caller: &User,
    period_id: i32,
    career_id: Option<i32>,
) -> Result<RunReport, AssignmentError> {
    let report = conn.immediate_transaction(|conn| {
        let inputs = load_inputs(conn, caller, period_id, career_id)?;

        let requests = expander::expand(&inputs.groups, &inputs.careers);
        let results = engine::assign(&inputs.rooms, &inputs.booked, requests);

        let group_ids: Vec<i32> = inputs.groups.iter().map(|g| g.id).collect();
        replace_assignments(conn, period_id, &group_ids, &results)?;

        Ok::<_, AssignmentError>(RunReport::new(period_id, inputs.groups.len(), &results))
    })?;

    tracing::info!(
        "Assignment run for period {} by {}: {} groups, {} slots, {} placed, {} unplaced",
        report.period_id,
        caller.username,
        report.groups,
        report.requests,
        report.placed,
        report.unplaced
    );

    Ok(report)
}

/// Stored assignments of a period, restricted the same way a run would be.
pub fn list_assignments(
    conn: &mut SqliteConnection,
    caller: &User,
    period_id: i32,
    career_id: Option<i32>,
    unplaced_only: bool,
) -> Result<Vec<AssignmentRow>, AssignmentError> {
    use crate::schema::assignments;

    ensure_period(conn, period_id)?;

    let mut query = assignments::table
        .filter(assignments::period_id.eq(period_id))
        .into_boxed();

    if !caller.is_admin() {
        let owned: Vec<i32> = scoped_subjects(conn, caller, period_id, None)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        query = query.filter(assignments::subject_id.eq_any(owned));
    }
    if let Some(cid) = career_id {
        query = query.filter(assignments::career_id.eq(cid));
    }
    if unplaced_only {
        query = query.filter(assignments::room_id.is_null());
    }

    Ok(query
        .select(AssignmentRow::as_select())
        .order((assignments::group_id.asc(), assignments::id.asc()))
        .load(conn)?)
}

/// A room's placed assignments in a period, Monday first, then by start time.
pub fn room_timetable(
    conn: &mut SqliteConnection,
    room_id: i32,
    period_id: i32,
) -> Result<Vec<AssignmentRow>, AssignmentError> {
    use crate::schema::{assignments, rooms};

    ensure_period(conn, period_id)?;

    let exists: i64 = rooms::table
        .filter(rooms::id.eq(room_id))
        .count()
        .get_result(conn)?;
    if exists == 0 {
        return Err(AssignmentError::RoomNotFound(room_id));
    }

    let mut rows: Vec<AssignmentRow> = assignments::table
        .filter(assignments::room_id.eq(room_id))
        .filter(assignments::period_id.eq(period_id))
        .select(AssignmentRow::as_select())
        .load(conn)?;

    rows.sort_by_key(|row| {
        let day = row
            .weekday
            .parse::<Weekday>()
            .map_or(Weekday::ALL.len(), |d| d as usize);
        (day, row.start_time)
    });

    Ok(rows)
}

#[cfg(test)]
#[path = "assignment_service_test.rs"]
mod tests;
