/// "My buttons": a user's reactions grouped by the local day they were added
use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, TimeZone};

use crate::schedule::WindowCalculator;
use crate::state::data::{ImageId, ReactionRecord};

/// Reactions added on one local calendar day, newest first
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub reactions: Vec<ReactionRecord>,
}

/// Group `reactions` by local day.
///
/// Keeps the latest reaction per image and drops reactions whose image is
/// not in `existing`. Days come newest first, as do reactions within a day.
pub fn group_by_day<Tz: TimeZone>(
    reactions: &[ReactionRecord],
    existing: &HashSet<ImageId>,
    calendar: &WindowCalculator<Tz>,
) -> Vec<DayGroup> {
    let mut latest: HashMap<ImageId, &ReactionRecord> = HashMap::new();
    for reaction in reactions.iter().filter(|r| existing.contains(&r.image_id)) {
        latest
            .entry(reaction.image_id)
            .and_modify(|kept| {
                if reaction.added_at > kept.added_at {
                    *kept = reaction;
                }
            })
            .or_insert(reaction);
    }

    let mut newest_first: Vec<&ReactionRecord> = latest.into_values().collect();
    newest_first.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(b.id.cmp(&a.id)));

    let mut groups: Vec<DayGroup> = Vec::new();
    for reaction in newest_first {
        let date = calendar.local_date(reaction.added_at);
        match groups.last_mut() {
            Some(group) if group.date == date => group.reactions.push(reaction.clone()),
            _ => groups.push(DayGroup {
                date,
                reactions: vec![reaction.clone()],
            }),
        }
    }
    groups
}
