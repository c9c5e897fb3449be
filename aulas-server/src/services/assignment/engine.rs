use super::{overlaps, Assignment, Booking, OccupancyRequest, RoomCapacity, Weekday};
use chrono::NaiveTime;
use std::collections::HashMap;

/// Room intervals taken so far, keyed by (room, weekday). Seeded with the
/// bookings that stay in place and grown as the run places requests.
#[derive(Default)]
struct Occupancy {
    booked: HashMap<(i32, Weekday), Vec<(NaiveTime, NaiveTime)>>,
}

impl Occupancy {
    fn is_free(&self, room_id: i32, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> bool {
        self.booked
            .get(&(room_id, weekday))
            .map_or(true, |intervals| {
                !intervals
                    .iter()
                    .any(|&(s, e)| overlaps(start, end, s, e))
            })
    }

    fn book(&mut self, room_id: i32, weekday: Weekday, start: NaiveTime, end: NaiveTime) {
        self.booked
            .entry((room_id, weekday))
            .or_default()
            .push((start, end));
    }
}

/// Places every request into at most one room.
///
/// Requests are handled group by group, largest enrollment first; groups of
/// equal size keep the order they first appear in. Each request takes the
/// smallest room that is large enough and free for its interval on that
/// weekday, the earliest listed room winning among equal capacities. A
/// request nothing fits comes back with `room_id: None`.
///
/// `booked` intervals are treated as occupied from the start; they are never
/// moved and never appear in the output.
///
/// Always returns exactly one assignment per request, in processing order.
pub fn assign(
    rooms: &[RoomCapacity],
    booked: &[Booking],
    requests: Vec<OccupancyRequest>,
) -> Vec<Assignment> {
    let mut occupancy = Occupancy::default();
    for b in booked {
        occupancy.book(b.room_id, b.weekday, b.start, b.end);
    }
    let mut assignments = Vec::with_capacity(requests.len());

    for request in prioritize(requests) {
        let room_id = pick_room(rooms, &occupancy, &request);

        if let Some(id) = room_id {
            occupancy.book(id, request.weekday, request.start, request.end);
        }

        assignments.push(Assignment {
            group_id: request.group_id,
            room_id,
            subject_id: request.subject_id,
            weekday: request.weekday,
            start: request.start,
            end: request.end,
            shift: request.shift,
            career_id: request.career_id,
        });
    }

    assignments
}

fn pick_room(
    rooms: &[RoomCapacity],
    occupancy: &Occupancy,
    request: &OccupancyRequest,
) -> Option<i32> {
    rooms
        .iter()
        .filter(|room| room.capacity >= request.enrolled)
        .filter(|room| occupancy.is_free(room.id, request.weekday, request.start, request.end))
        // min_by_key keeps the first of several equal minimums
        .min_by_key(|room| room.capacity)
        .map(|room| room.id)
}

/// Buckets requests by group (first-appearance order), then stable-sorts the
/// buckets by enrollment, descending.
fn prioritize(requests: Vec<OccupancyRequest>) -> Vec<OccupancyRequest> {
    let mut order: Vec<(i32, i32)> = Vec::new();
    let mut buckets: HashMap<i32, Vec<OccupancyRequest>> = HashMap::new();

    for request in requests {
        let bucket = buckets.entry(request.group_id).or_insert_with(|| {
            order.push((request.group_id, request.enrolled));
            Vec::new()
        });
        bucket.push(request);
    }

    order.sort_by(|a, b| b.1.cmp(&a.1));

    order
        .into_iter()
        .flat_map(|(group_id, _)| buckets.remove(&group_id).unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::assignment::Shift;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn room(id: i32, capacity: i32) -> RoomCapacity {
        RoomCapacity { id, capacity }
    }

    fn req(group_id: i32, enrolled: i32, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> OccupancyRequest {
        OccupancyRequest {
            group_id,
            subject_id: group_id * 10,
            weekday,
            start,
            end,
            shift: Shift::Morning,
            enrolled,
            career_id: 1,
        }
    }

    fn room_of(assignments: &[Assignment], group_id: i32) -> Option<i32> {
        assignments
            .iter()
            .find(|a| a.group_id == group_id)
            .and_then(|a| a.room_id)
    }

    #[test]
    fn test_skips_room_that_is_too_small() {
        let rooms = [room(1, 30), room(2, 50)];
        let out = assign(&rooms, &[], vec![req(10, 40, Weekday::Monday, t(8, 0), t(10, 0))]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].room_id, Some(2));
        assert_eq!(out[0].group_id, 10);
        assert_eq!(out[0].subject_id, 100);
    }

    #[test]
    fn test_larger_group_picks_first() {
        let rooms = [room(1, 30), room(2, 50)];
        // Smaller group listed first; the larger one still goes first.
        let requests = vec![
            req(2, 20, Weekday::Monday, t(8, 0), t(10, 0)),
            req(1, 45, Weekday::Monday, t(8, 0), t(10, 0)),
        ];

        let out = assign(&rooms, &[], requests);

        assert_eq!(out[0].group_id, 1);
        assert_eq!(room_of(&out, 1), Some(2));
        assert_eq!(room_of(&out, 2), Some(1));
    }

    #[test]
    fn test_unplaced_when_no_room_is_large_enough() {
        let rooms = [room(1, 30), room(2, 50)];
        let out = assign(&rooms, &[], vec![req(1, 80, Weekday::Tuesday, t(8, 0), t(10, 0))]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].room_id, None);
        assert!(!out[0].is_placed());
    }

    #[test]
    fn test_adjacent_slots_share_a_room() {
        let rooms = [room(1, 40), room(2, 10)];
        let requests = vec![
            req(1, 35, Weekday::Monday, t(8, 0), t(10, 0)),
            req(2, 35, Weekday::Monday, t(10, 0), t(12, 0)),
        ];

        let out = assign(&rooms, &[], requests);

        assert_eq!(room_of(&out, 1), Some(1));
        assert_eq!(room_of(&out, 2), Some(1));
    }

    #[test]
    fn test_no_rooms_yields_unplaced() {
        let out = assign(&[], &[], vec![req(1, 5, Weekday::Friday, t(8, 0), t(9, 0))]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].room_id, None);
    }

    #[test]
    fn test_empty_requests() {
        assert!(assign(&[room(1, 10)], &[], Vec::new()).is_empty());
    }

    #[test]
    fn test_partial_overlap_conflicts_in_both_directions() {
        let rooms = [room(1, 50)];

        // Later request starts inside the earlier one
        let out = assign(
            &rooms,
            &[],
            vec![
                req(1, 40, Weekday::Monday, t(8, 0), t(10, 0)),
                req(2, 30, Weekday::Monday, t(9, 0), t(11, 0)),
            ],
        );
        assert_eq!(room_of(&out, 1), Some(1));
        assert_eq!(room_of(&out, 2), None);

        // Later request ends inside the earlier one
        let out = assign(
            &rooms,
            &[],
            vec![
                req(1, 40, Weekday::Monday, t(9, 0), t(11, 0)),
                req(2, 30, Weekday::Monday, t(8, 0), t(10, 0)),
            ],
        );
        assert_eq!(room_of(&out, 2), None);

        // Later request contains the earlier one
        let out = assign(
            &rooms,
            &[],
            vec![
                req(1, 40, Weekday::Monday, t(9, 0), t(10, 0)),
                req(2, 30, Weekday::Monday, t(8, 0), t(12, 0)),
            ],
        );
        assert_eq!(room_of(&out, 2), None);
    }

    #[test]
    fn test_same_time_on_other_weekday_is_free() {
        let rooms = [room(1, 50)];
        let out = assign(
            &rooms,
            &[],
            vec![
                req(1, 40, Weekday::Monday, t(8, 0), t(10, 0)),
                req(2, 30, Weekday::Tuesday, t(8, 0), t(10, 0)),
            ],
        );
        assert_eq!(room_of(&out, 1), Some(1));
        assert_eq!(room_of(&out, 2), Some(1));
    }

    #[test]
    fn test_equal_capacity_prefers_first_listed_room() {
        let rooms = [room(7, 40), room(3, 40), room(9, 100)];
        let out = assign(&rooms, &[], vec![req(1, 20, Weekday::Monday, t(8, 0), t(10, 0))]);
        assert_eq!(out[0].room_id, Some(7));
    }

    #[test]
    fn test_equal_enrollment_keeps_input_order() {
        let rooms = [room(1, 30)];
        let requests = vec![
            req(5, 25, Weekday::Monday, t(8, 0), t(10, 0)),
            req(4, 25, Weekday::Monday, t(8, 0), t(10, 0)),
        ];

        let out = assign(&rooms, &[], requests);

        assert_eq!(out[0].group_id, 5);
        assert_eq!(room_of(&out, 5), Some(1));
        assert_eq!(room_of(&out, 4), None);
    }

    #[test]
    fn test_group_requests_stay_together() {
        let rooms = [room(1, 100)];
        // Group 1's slots are split around group 2 in the input
        let requests = vec![
            req(1, 30, Weekday::Monday, t(8, 0), t(10, 0)),
            req(2, 30, Weekday::Tuesday, t(8, 0), t(10, 0)),
            req(1, 30, Weekday::Wednesday, t(8, 0), t(10, 0)),
        ];

        let order: Vec<(i32, Weekday)> = assign(&rooms, &[], requests)
            .into_iter()
            .map(|a| (a.group_id, a.weekday))
            .collect();

        assert_eq!(
            order,
            vec![
                (1, Weekday::Monday),
                (1, Weekday::Wednesday),
                (2, Weekday::Tuesday),
            ]
        );
    }

    #[test]
    fn test_larger_group_wins_last_room() {
        let rooms = [room(1, 60)];
        let requests = vec![
            req(1, 20, Weekday::Thursday, t(8, 0), t(10, 0)),
            req(2, 55, Weekday::Thursday, t(9, 0), t(11, 0)),
        ];

        let out = assign(&rooms, &[], requests);

        assert_eq!(room_of(&out, 2), Some(1));
        assert_eq!(room_of(&out, 1), None);
    }

    /// A larger, mixed workload used to check the global invariants.
    fn workload() -> (Vec<RoomCapacity>, Vec<OccupancyRequest>) {
        let rooms = vec![room(1, 20), room(2, 35), room(3, 35), room(4, 60), room(5, 100)];

        let mut requests = Vec::new();
        for g in 0..40 {
            let enrolled = 10 + (g * 17) % 110;
            let day = Weekday::ALL[(g % 5) as usize];
            let start_hour = 7 + (g % 6) as u32 * 2;
            requests.push(req(g, enrolled, day, t(start_hour, 0), t(start_hour + 2, 0)));
            // second weekly meeting, offset by an hour to create partial overlaps
            let day2 = Weekday::ALL[((g + 2) % 5) as usize];
            requests.push(req(g, enrolled, day2, t(start_hour + 1, 0), t(start_hour + 3, 0)));
        }

        (rooms, requests)
    }

    #[test]
    fn test_invariants_hold_on_mixed_workload() {
        let (rooms, requests) = workload();
        let total = requests.len();
        let enrolled: HashMap<i32, i32> = requests.iter().map(|r| (r.group_id, r.enrolled)).collect();
        let capacity: HashMap<i32, i32> = rooms.iter().map(|r| (r.id, r.capacity)).collect();

        let out = assign(&rooms, &[], requests);

        // Completeness
        assert_eq!(out.len(), total);

        // Capacity
        for a in out.iter().filter(|a| a.is_placed()) {
            let room_id = a.room_id.unwrap();
            assert!(capacity[&room_id] >= enrolled[&a.group_id]);
        }

        // No double booking
        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                if a.room_id.is_some() && a.room_id == b.room_id && a.weekday == b.weekday {
                    assert!(
                        !overlaps(a.start, a.end, b.start, b.end),
                        "room {:?} double booked on {}",
                        a.room_id,
                        a.weekday
                    );
                }
            }
        }

        // Something placed, something too large for every room
        assert!(out.iter().any(|a| a.is_placed()));
        assert!(out.iter().any(|a| !a.is_placed()));
    }

    #[test]
    fn test_deterministic() {
        let (rooms, requests) = workload();
        let first = assign(&rooms, &[], requests.clone());
        let second = assign(&rooms, &[], requests);
        assert_eq!(first, second);
    }

    #[test]
    fn test_booked_intervals_are_respected() {
        let rooms = [room(1, 50), room(2, 80)];
        let booked = [Booking {
            room_id: 1,
            weekday: Weekday::Monday,
            start: t(8, 0),
            end: t(10, 0),
        }];

        let out = assign(
            &rooms,
            &booked,
            vec![
                req(1, 40, Weekday::Monday, t(9, 0), t(11, 0)),
                req(2, 30, Weekday::Monday, t(10, 0), t(12, 0)),
            ],
        );

        // Group 1 clashes with the booking and falls back to the larger room;
        // group 2 starts as the booking ends.
        assert_eq!(room_of(&out, 1), Some(2));
        assert_eq!(room_of(&out, 2), Some(1));
        assert_eq!(out.len(), 2);

        let out = assign(
            &[room(1, 50)],
            &booked,
            vec![req(3, 10, Weekday::Monday, t(7, 0), t(8, 30))],
        );
        assert_eq!(room_of(&out, 3), None);
    }
}
