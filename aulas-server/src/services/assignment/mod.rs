//! Room assignment for one academic period.
//!
//! Groups are flattened into occupancy requests by [`expander`], then
//! [`engine`] places each request into a room. Both halves are pure; loading
//! and persisting live in `assignment_service`.

pub mod engine;
pub mod expander;

use crate::error::ParseTokenError;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|day| day.as_str() == s)
            .ok_or_else(|| ParseTokenError::new("weekday", s))
    }
}

/// Coarse time-of-day bucket. Carried through to assignments, never used for placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shift {
    Morning,
    Afternoon,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "MORNING",
            Shift::Afternoon => "AFTERNOON",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shift {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MORNING" => Ok(Shift::Morning),
            "AFTERNOON" => Ok(Shift::Afternoon),
            other => Err(ParseTokenError::new("shift", other)),
        }
    }
}

/// One weekly meeting of a group, occupying `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

/// Half-open interval intersection: `[a1, a2)` and `[b1, b2)` share at least one instant.
pub fn overlaps(a1: NaiveTime, a2: NaiveTime, b1: NaiveTime, b2: NaiveTime) -> bool {
    a1 < b2 && b1 < a2
}

/// Parses a stored slot list, rejecting empty-interval slots.
pub fn parse_slots(raw: &str) -> Result<Vec<Slot>, serde_json::Error> {
    let slots: Vec<Slot> = serde_json::from_str(raw)?;
    if let Some(bad) = slots.iter().find(|slot| !slot.is_valid()) {
        return Err(serde::de::Error::custom(format!(
            "slot on {} starts at {} but ends at {}",
            bad.weekday, bad.start, bad.end
        )));
    }
    Ok(slots)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomCapacity {
    pub id: i32,
    pub capacity: i32,
}

/// A group as the loader hands it over, slot data still in stored form.
#[derive(Debug, Clone)]
pub struct GroupRecord {
    pub id: i32,
    pub subject_id: i32,
    pub enrolled: i32,
    pub shift: String,
    pub slots: String,
}

impl From<&crate::models::CourseGroup> for GroupRecord {
    fn from(group: &crate::models::CourseGroup) -> Self {
        Self {
            id: group.id,
            subject_id: group.subject_id,
            enrolled: group.enrolled,
            shift: group.shift.clone(),
            slots: group.slots.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyRequest {
    pub group_id: i32,
    pub subject_id: i32,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub shift: Shift,
    pub enrolled: i32,
    pub career_id: i32,
}

/// Placement outcome for one request. `room_id == None` means no room fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub group_id: i32,
    pub room_id: Option<i32>,
    pub subject_id: i32,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub shift: Shift,
    pub career_id: i32,
}

impl Assignment {
    pub fn is_placed(&self) -> bool {
        self.room_id.is_some()
    }
}

/// A room interval already taken in the period by a group outside the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Booking {
    pub room_id: i32,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}
