use super::{parse_slots, GroupRecord, OccupancyRequest, Shift};
use std::collections::HashMap;

/// Flattens groups into one occupancy request per weekly slot.
///
/// `careers` maps subject id to career id. Groups whose subject is unknown,
/// whose shift is unrecognized, or whose slot data is malformed or empty
/// contribute nothing; these are logged and skipped.
pub fn expand(groups: &[GroupRecord], careers: &HashMap<i32, i32>) -> Vec<OccupancyRequest> {
    let mut requests = Vec::new();

    for group in groups {
        let Some(&career_id) = careers.get(&group.subject_id) else {
            tracing::warn!(
                "Group {} references unknown subject {}, skipping",
                group.id,
                group.subject_id
            );
            continue;
        };

        let shift: Shift = match group.shift.parse() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Group {} has invalid shift: {}, skipping", group.id, e);
                continue;
            }
        };

        let slots = match parse_slots(&group.slots) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Group {} has malformed slots: {}, skipping", group.id, e);
                continue;
            }
        };

        if slots.is_empty() {
            tracing::debug!("Group {} has no meeting slots", group.id);
            continue;
        }

        requests.extend(slots.into_iter().map(|slot| OccupancyRequest {
            group_id: group.id,
            subject_id: group.subject_id,
            weekday: slot.weekday,
            start: slot.start,
            end: slot.end,
            shift,
            enrolled: group.enrolled,
            career_id,
        }));
    }

    requests
}
