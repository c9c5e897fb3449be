use super::*;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use crate::db::test_connection;
use crate::models::{NewCareer, NewCourseGroup, NewPeriod, NewRoom, NewSubject, NewUser};
use crate::schema::{assignments, careers, course_groups, periods, rooms, subjects, users};

struct Fixture {
    conn: SqliteConnection,
    admin: User,
    period: i32,
    career: i32,
}

fn add_user(conn: &mut SqliteConnection, name: &str, role: &str) -> User {
    diesel::insert_into(users::table)
        .values(&NewUser {
            username: name.to_string(),
            password_hash: "x".to_string(),
            role: role.to_string(),
        })
        .returning(User::as_returning())
        .get_result(conn)
        .unwrap()
}

fn add_career(conn: &mut SqliteConnection, name: &str) -> i32 {
    diesel::insert_into(careers::table)
        .values(&NewCareer {
            name: name.to_string(),
        })
        .returning(careers::id)
        .get_result(conn)
        .unwrap()
}

fn add_period(conn: &mut SqliteConnection, code: &str) -> i32 {
    diesel::insert_into(periods::table)
        .values(&NewPeriod {
            code: code.to_string(),
            name: code.to_string(),
            is_active: true,
        })
        .returning(periods::id)
        .get_result(conn)
        .unwrap()
}

fn add_room(conn: &mut SqliteConnection, name: &str, capacity: i32) -> i32 {
    diesel::insert_into(rooms::table)
        .values(&NewRoom {
            name: name.to_string(),
            capacity,
            equipment: None,
        })
        .returning(rooms::id)
        .get_result(conn)
        .unwrap()
}

fn add_subject(conn: &mut SqliteConnection, period: i32, owner: i32, career: i32) -> i32 {
    diesel::insert_into(subjects::table)
        .values(&NewSubject {
            period_id: period,
            name: "Subject".to_string(),
            user_id: owner,
            career_id: career,
            professor_id: None,
        })
        .returning(subjects::id)
        .get_result(conn)
        .unwrap()
}

fn add_group(conn: &mut SqliteConnection, subject: i32, enrolled: i32, slots: &str) -> i32 {
    diesel::insert_into(course_groups::table)
        .values(&NewCourseGroup {
            subject_id: subject,
            section: "A".to_string(),
            enrolled,
            shift: "MORNING".to_string(),
            slots: slots.to_string(),
        })
        .returning(course_groups::id)
        .get_result(conn)
        .unwrap()
}

fn monday(start: &str, end: &str) -> String {
    format!(r#"[{{"weekday":"monday","start":"{start}","end":"{end}"}}]"#)
}

fn fixture() -> Fixture {
    let mut conn = test_connection();
    let admin = add_user(&mut conn, "admin", "admin");
    let period = add_period(&mut conn, "2025-1");
    let career = add_career(&mut conn, "Computing");
    Fixture {
        conn,
        admin,
        period,
        career,
    }
}

fn stored(conn: &mut SqliteConnection) -> Vec<(i32, Option<i32>, String)> {
    assignments::table
        .select((assignments::group_id, assignments::room_id, assignments::weekday))
        .order((assignments::group_id.asc(), assignments::id.asc()))
        .load(conn)
        .unwrap()
}

#[test]
fn test_run_places_and_persists() {
    let mut f = fixture();
    let small = add_room(&mut f.conn, "A-101", 30);
    let large = add_room(&mut f.conn, "A-201", 50);
    let subject = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    let g_small = add_group(&mut f.conn, subject, 20, &monday("08:00:00", "10:00:00"));
    let g_large = add_group(&mut f.conn, subject, 45, &monday("08:00:00", "10:00:00"));

    let report = run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();

    assert_eq!(report.groups, 2);
    assert_eq!(report.requests, 2);
    assert_eq!(report.placed, 2);
    assert_eq!(report.unplaced, 0);
    assert!(report.unplaced_groups.is_empty());

    let rows = stored(&mut f.conn);
    assert_eq!(
        rows,
        vec![
            (g_small, Some(small), "monday".to_string()),
            (g_large, Some(large), "monday".to_string()),
        ]
    );

    let career: i32 = assignments::table
        .filter(assignments::group_id.eq(g_large))
        .select(assignments::career_id)
        .first(&mut f.conn)
        .unwrap();
    assert_eq!(career, f.career);
}

#[test]
fn test_unplaced_is_reported_not_failed() {
    let mut f = fixture();
    add_room(&mut f.conn, "Tiny", 10);
    let subject = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    let group = add_group(&mut f.conn, subject, 40, &monday("08:00:00", "10:00:00"));

    let report = run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();

    assert_eq!(report.placed, 0);
    assert_eq!(report.unplaced, 1);
    assert_eq!(report.unplaced_groups, vec![group]);
    assert_eq!(stored(&mut f.conn), vec![(group, None, "monday".to_string())]);

    let unplaced = list_assignments(&mut f.conn, &f.admin, f.period, None, true).unwrap();
    assert_eq!(unplaced.len(), 1);
}

#[test]
fn test_rerun_is_idempotent() {
    let mut f = fixture();
    add_room(&mut f.conn, "A", 30);
    add_room(&mut f.conn, "B", 60);
    let subject = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    for enrolled in [25, 55, 28, 70] {
        add_group(&mut f.conn, subject, enrolled, &monday("09:00:00", "11:00:00"));
    }

    let first_report = run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();
    let first = stored(&mut f.conn);
    let second_report = run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();
    let second = stored(&mut f.conn);

    assert_eq!(first_report, second_report);
    assert_eq!(first, second);
    assert_eq!(second.len(), 4);
}

#[test]
fn test_non_admin_only_touches_own_subjects() {
    let mut f = fixture();
    let coordinator = add_user(&mut f.conn, "prof", "user");
    let room = add_room(&mut f.conn, "Only", 100);

    let theirs = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    let mine = add_subject(&mut f.conn, f.period, coordinator.id, f.career);
    let other_group = add_group(&mut f.conn, theirs, 50, &monday("08:00:00", "10:00:00"));
    let my_group = add_group(&mut f.conn, mine, 30, &monday("08:00:00", "10:00:00"));

    // Admin run places the bigger group in the only room
    run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();

    // The scoped run only replaces its own group and has to work around the
    // admin's placement, which leaves no room at that time.
    let report = run_assignment(&mut f.conn, &coordinator, f.period, None).unwrap();
    assert_eq!(report.groups, 1);
    assert_eq!(report.placed, 0);
    assert_eq!(report.unplaced_groups, vec![my_group]);

    let rows = stored(&mut f.conn);
    assert_eq!(
        rows,
        vec![
            (other_group, Some(room), "monday".to_string()),
            (my_group, None, "monday".to_string()),
        ]
    );

    let visible = list_assignments(&mut f.conn, &coordinator, f.period, None, false).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].group_id, my_group);
}

#[test]
fn test_career_scope() {
    let mut f = fixture();
    let other_career = add_career(&mut f.conn, "Law");
    add_room(&mut f.conn, "R", 100);
    let computing = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    let law = add_subject(&mut f.conn, f.period, f.admin.id, other_career);
    add_group(&mut f.conn, computing, 30, &monday("08:00:00", "10:00:00"));
    let law_group = add_group(&mut f.conn, law, 30, &monday("12:00:00", "14:00:00"));

    let report = run_assignment(&mut f.conn, &f.admin, f.period, Some(other_career)).unwrap();

    assert_eq!(report.groups, 1);
    let rows = stored(&mut f.conn);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, law_group);
}

#[test]
fn test_career_runs_never_share_a_room_slot() {
    let mut f = fixture();
    let other_career = add_career(&mut f.conn, "Law");
    let room = add_room(&mut f.conn, "R", 100);
    let computing = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    let law = add_subject(&mut f.conn, f.period, f.admin.id, other_career);
    let first = add_group(&mut f.conn, computing, 30, &monday("08:00:00", "10:00:00"));
    let second = add_group(&mut f.conn, law, 30, &monday("09:00:00", "11:00:00"));

    run_assignment(&mut f.conn, &f.admin, f.period, Some(f.career)).unwrap();
    let report = run_assignment(&mut f.conn, &f.admin, f.period, Some(other_career)).unwrap();
    assert_eq!(report.placed, 0);

    assert_eq!(
        stored(&mut f.conn),
        vec![
            (first, Some(room), "monday".to_string()),
            (second, None, "monday".to_string()),
        ]
    );

    // Re-running the first career keeps its own slot: its previous rows are
    // replaced, not treated as bookings.
    let report = run_assignment(&mut f.conn, &f.admin, f.period, Some(f.career)).unwrap();
    assert_eq!(report.placed, 1);
}

#[test]
fn test_failed_run_keeps_previous_assignments() {
    let mut f = fixture();
    let room = add_room(&mut f.conn, "R", 100);
    let subject = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    let group = add_group(&mut f.conn, subject, 30, &monday("08:00:00", "10:00:00"));

    run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();
    let before = stored(&mut f.conn);
    assert_eq!(before, vec![(group, Some(room), "monday".to_string())]);

    // Writes fail after the old rows are already deleted
    diesel::sql_query(
        "CREATE TRIGGER block_inserts BEFORE INSERT ON assignments \
         BEGIN SELECT RAISE(ABORT, 'writes blocked'); END;",
    )
    .execute(&mut f.conn)
    .unwrap();

    let result = run_assignment(&mut f.conn, &f.admin, f.period, None);
    assert!(matches!(result, Err(AssignmentError::Database(_))));
    assert_eq!(stored(&mut f.conn), before);
}

#[test]
fn test_other_period_is_ignored() {
    let mut f = fixture();
    let next = add_period(&mut f.conn, "2025-2");
    add_room(&mut f.conn, "R", 100);
    let old = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    let new = add_subject(&mut f.conn, next, f.admin.id, f.career);
    add_group(&mut f.conn, old, 30, &monday("08:00:00", "10:00:00"));
    let new_group = add_group(&mut f.conn, new, 30, &monday("08:00:00", "10:00:00"));

    run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();
    let report = run_assignment(&mut f.conn, &f.admin, next, None).unwrap();

    // Same room, same time, different periods: both placed.
    assert_eq!(report.placed, 1);
    let rows = stored(&mut f.conn);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.1.is_some()));
    assert!(rows.iter().any(|r| r.0 == new_group));
}

#[test]
fn test_malformed_group_loses_stale_assignments() {
    let mut f = fixture();
    add_room(&mut f.conn, "R", 100);
    let subject = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    let group = add_group(&mut f.conn, subject, 30, &monday("08:00:00", "10:00:00"));

    run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();
    assert_eq!(stored(&mut f.conn).len(), 1);

    diesel::update(course_groups::table.filter(course_groups::id.eq(group)))
        .set(course_groups::slots.eq("not json"))
        .execute(&mut f.conn)
        .unwrap();

    let report = run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();
    assert_eq!(report.groups, 1);
    assert_eq!(report.requests, 0);
    assert!(stored(&mut f.conn).is_empty());
}

#[test]
fn test_input_errors() {
    let mut f = fixture();

    assert!(matches!(
        run_assignment(&mut f.conn, &f.admin, 0, None),
        Err(AssignmentError::InvalidPeriod(0))
    ));
    assert!(matches!(
        run_assignment(&mut f.conn, &f.admin, 999, None),
        Err(AssignmentError::PeriodNotFound(999))
    ));
    assert!(matches!(
        run_assignment(&mut f.conn, &f.admin, f.period, Some(999)),
        Err(AssignmentError::UnknownCareer(999))
    ));
}

#[test]
fn test_room_timetable_is_sorted() {
    let mut f = fixture();
    let room = add_room(&mut f.conn, "R", 100);
    let subject = add_subject(&mut f.conn, f.period, f.admin.id, f.career);
    add_group(
        &mut f.conn,
        subject,
        30,
        r#"[{"weekday":"friday","start":"08:00:00","end":"10:00:00"},
            {"weekday":"monday","start":"12:00:00","end":"14:00:00"}]"#,
    );
    add_group(&mut f.conn, subject, 20, &monday("08:00:00", "10:00:00"));

    run_assignment(&mut f.conn, &f.admin, f.period, None).unwrap();

    let slots: Vec<(String, String)> = room_timetable(&mut f.conn, room, f.period)
        .unwrap()
        .into_iter()
        .map(|r| (r.weekday, r.start_time.format("%H:%M").to_string()))
        .collect();

    assert_eq!(
        slots,
        vec![
            ("monday".to_string(), "08:00".to_string()),
            ("monday".to_string(), "12:00".to_string()),
            ("friday".to_string(), "08:00".to_string()),
        ]
    );

    assert!(matches!(
        room_timetable(&mut f.conn, 4242, f.period),
        Err(AssignmentError::RoomNotFound(4242))
    ));
}
