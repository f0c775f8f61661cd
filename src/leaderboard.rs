//! Project leaderboard ranked by update activity.
//!
//! Projects are ordered by their longest run of consecutive days with at
//! least one update, then by tag count, update count, most recent update and
//! finally by updates per day since creation.
use std::cmp::Ordering;

use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::{Project, ProjectId, UserId};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Longest run of consecutive UTC calendar days that each carry an update.
///
/// Several updates on the same day count once; a gap of more than one day
/// starts a new run. No updates means a streak of zero.
///
/// # Examples
///
/// ```
/// use mutuals::leaderboard::longest_streak;
/// use time::{Duration, OffsetDateTime};
///
/// let day = |n| OffsetDateTime::UNIX_EPOCH + Duration::days(n);
/// assert_eq!(longest_streak(&[day(0), day(1), day(3)]), 2);
/// assert_eq!(longest_streak(&[]), 0);
/// ```
pub fn longest_streak(timestamps: &[OffsetDateTime]) -> u32 {
    let mut days: Vec<Date> = timestamps
        .iter()
        .map(|t| t.to_offset(UtcOffset::UTC).date())
        .collect();
    if days.is_empty() {
        return 0;
    }
    days.sort_unstable();

    let mut longest = 1;
    let mut current = 1;
    for pair in days.windows(2) {
        match (pair[1] - pair[0]).whole_days() {
            0 => continue,
            1 => {
                current += 1;
                longest = longest.max(current);
            }
            _ => current = 1,
        }
    }
    longest
}

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub project_id: ProjectId,
    pub title: String,
    pub owner: UserId,
    pub username: String,
    pub tag_count: usize,
    pub update_count: usize,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_update: Option<OffsetDateTime>,
    pub longest_streak: u32,
    /// Updates divided by the project's age in days, measured at ranking time.
    pub updates_per_day: f64,
}

impl LeaderboardEntry {
    /// Summarizes `project`'s activity as of `now`.
    ///
    /// Projects younger than a day are treated as one day old, so a fresh
    /// project's rate stays finite.
    pub fn new(
        project: &Project,
        username: impl Into<String>,
        updates: &[OffsetDateTime],
        now: OffsetDateTime,
    ) -> Self {
        let age = now - project.created_at;
        let age_days = (age.as_seconds_f64() / SECONDS_PER_DAY).max(1.0);

        Self {
            project_id: project.id,
            title: project.title.clone(),
            owner: project.owner.clone(),
            username: username.into(),
            tag_count: project.tags.len(),
            update_count: updates.len(),
            last_update: updates.iter().max().copied(),
            longest_streak: longest_streak(updates),
            updates_per_day: updates.len() as f64 / age_days,
        }
    }
}

/// Sorts `entries` best first. Entries that tie on every key keep their
/// input order.
pub fn rank(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(compare);
}

fn compare(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.longest_streak
        .cmp(&a.longest_streak)
        .then_with(|| b.tag_count.cmp(&a.tag_count))
        .then_with(|| b.update_count.cmp(&a.update_count))
        // None sorts below any timestamp
        .then_with(|| b.last_update.cmp(&a.last_update))
        .then_with(|| b.updates_per_day.total_cmp(&a.updates_per_day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tag, TagId};
    use time::Duration;

    fn day(n: i64) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::days(n)
    }

    fn project(id: i64, tags: usize, created_at: OffsetDateTime) -> Project {
        Project {
            id: ProjectId::new(id),
            owner: UserId::new("u1"),
            title: format!("p{id}"),
            created_at,
            tags: (0..tags)
                .map(|t| Tag::new(TagId::new(t as i64), format!("t{t}")))
                .collect(),
        }
    }

    fn entry(id: i64, tags: usize, updates: &[OffsetDateTime]) -> LeaderboardEntry {
        LeaderboardEntry::new(&project(id, tags, day(0)), "ada", updates, day(30))
    }

    fn order(entries: &[LeaderboardEntry]) -> Vec<i64> {
        entries.iter().map(|e| e.project_id.get()).collect()
    }

    #[test]
    fn no_updates_is_zero_streak() {
        assert_eq!(longest_streak(&[]), 0);
    }

    #[test]
    fn single_update_is_streak_of_one() {
        assert_eq!(longest_streak(&[day(4)]), 1);
    }

    #[test]
    fn same_day_updates_count_once() {
        let updates = [
            day(1),
            day(1) + Duration::hours(3),
            day(1) + Duration::hours(20),
            day(2),
        ];

        assert_eq!(longest_streak(&updates), 2);
    }

    #[test]
    fn gap_resets_the_run() {
        let updates = [day(0), day(1), day(2), day(5), day(6)];

        assert_eq!(longest_streak(&updates), 3);
    }

    #[test]
    fn longest_run_wins_even_when_it_comes_last() {
        let updates = [day(0), day(3), day(4), day(5), day(6)];

        assert_eq!(longest_streak(&updates), 4);
    }

    #[test]
    fn input_order_does_not_matter() {
        let updates = [day(6), day(4), day(5), day(0)];

        assert_eq!(longest_streak(&updates), 3);
    }

    #[test]
    fn days_are_utc_calendar_days() {
        // 23:30 and 00:30 the next day are under an hour apart but on two days
        let late = day(0) + Duration::minutes(23 * 60 + 30);
        let early = day(1) + Duration::minutes(30);

        assert_eq!(longest_streak(&[late, early]), 2);
    }

    #[test]
    fn entry_summarizes_activity() {
        let e = entry(1, 2, &[day(10), day(11), day(3)]);

        assert_eq!(e.tag_count, 2);
        assert_eq!(e.update_count, 3);
        assert_eq!(e.last_update, Some(day(11)));
        assert_eq!(e.longest_streak, 2);
        assert!((e.updates_per_day - 0.1).abs() < 1e-9);
    }

    #[test]
    fn fresh_project_rate_is_finite() {
        let p = project(1, 0, day(5));
        let e = LeaderboardEntry::new(&p, "ada", &[day(5), day(5)], day(5));

        assert_eq!(e.updates_per_day, 2.0);
        assert_eq!(e.last_update, Some(day(5)));
    }

    #[test]
    fn streak_outranks_tags_and_volume() {
        let mut entries = vec![
            entry(1, 5, &[day(1), day(3), day(5), day(7)]),
            entry(2, 0, &[day(1), day(2)]),
        ];

        rank(&mut entries);

        assert_eq!(order(&entries), vec![2, 1]);
    }

    #[test]
    fn tag_count_breaks_streak_ties() {
        let mut entries = vec![entry(1, 1, &[day(1)]), entry(2, 3, &[day(1)])];

        rank(&mut entries);

        assert_eq!(order(&entries), vec![2, 1]);
    }

    #[test]
    fn update_count_then_recency_break_remaining_ties() {
        let mut entries = vec![
            entry(1, 0, &[day(1)]),
            entry(2, 0, &[day(1), day(4)]),
            entry(3, 0, &[day(9)]),
        ];

        rank(&mut entries);

        assert_eq!(order(&entries), vec![2, 3, 1]);
    }

    #[test]
    fn projects_without_updates_rank_last() {
        let mut entries = vec![entry(1, 0, &[]), entry(2, 0, &[day(2)])];

        rank(&mut entries);

        assert_eq!(order(&entries), vec![2, 1]);
        assert_eq!(entries[1].last_update, None);
    }

    #[test]
    fn frequency_breaks_ties_on_every_other_key() {
        let now = day(30);
        let old = LeaderboardEntry::new(&project(1, 0, day(0)), "a", &[day(20)], now);
        let young = LeaderboardEntry::new(&project(2, 0, day(19)), "b", &[day(20)], now);
        let mut entries = vec![old, young];

        rank(&mut entries);

        assert_eq!(order(&entries), vec![2, 1]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let mut entries = vec![entry(3, 0, &[]), entry(1, 0, &[]), entry(2, 0, &[])];

        rank(&mut entries);

        assert_eq!(order(&entries), vec![3, 1, 2]);
    }
}
