//! User lifetime statistics and the extraction streak.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::run::Extraction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub total_xp: u64,
    pub total_extractions: u32,
    pub total_tasks_completed: u32,
    /// Sole input to tier unlocking
    pub total_focus_minutes: u32,
    pub current_streak: u32,
    pub best_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub stats: LifetimeStats,
    /// Run date of the most recent extraction
    pub last_extraction_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            stats: LifetimeStats::default(),
            last_extraction_date: None,
            created_at: now,
        }
    }

    /// Credit a settled run to the lifetime totals and advance the streak.
    pub fn apply_extraction(&mut self, extraction: &Extraction) {
        let stats = &mut self.stats;
        stats.total_xp = stats.total_xp.saturating_add(u64::from(extraction.final_xp));
        stats.total_extractions = stats.total_extractions.saturating_add(1);
        stats.total_tasks_completed = stats
            .total_tasks_completed
            .saturating_add(extraction.tasks_completed);
        stats.total_focus_minutes = stats
            .total_focus_minutes
            .saturating_add(extraction.total_focus_minutes);
        self.stats.current_streak =
            next_streak(self.stats.current_streak, self.last_extraction_date, extraction.run_date);
        self.stats.best_streak = self.stats.best_streak.max(self.stats.current_streak);
        self.last_extraction_date = Some(extraction.run_date);
    }
}

/// Streak after extracting a run dated `run_date`.
///
/// Consecutive days extend the streak, the same day leaves it alone, and
/// anything else (a gap, or no previous extraction) restarts it at 1.
pub fn next_streak(current: u32, last: Option<NaiveDate>, run_date: NaiveDate) -> u32 {
    match last {
        Some(last) if last == run_date => current,
        Some(last) if last.succ_opt() == Some(run_date) => current + 1,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn first_extraction_starts_streak() {
        assert_eq!(next_streak(0, None, day(1)), 1);
    }

    #[test]
    fn consecutive_day_extends_streak() {
        assert_eq!(next_streak(4, Some(day(1)), day(2)), 5);
    }

    #[test]
    fn same_day_keeps_streak() {
        assert_eq!(next_streak(4, Some(day(2)), day(2)), 4);
    }

    #[test]
    fn gap_resets_streak() {
        assert_eq!(next_streak(4, Some(day(1)), day(3)), 1);
        assert_eq!(next_streak(4, Some(day(1)), day(4)), 1);
    }

    #[test]
    fn month_boundary_counts_as_consecutive() {
        let last = NaiveDate::from_ymd_opt(2026, 4, 30).unwrap();
        assert_eq!(next_streak(2, Some(last), day(1)), 3);
    }

    #[test]
    fn best_streak_never_drops() {
        let mut user = User::new("u", Utc::now());
        user.stats.current_streak = 7;
        user.stats.best_streak = 7;
        user.last_extraction_date = Some(day(1));

        let extraction = crate::run::Extraction {
            id: "e".into(),
            user_id: "u".into(),
            run_id: "r".into(),
            run_date: day(10),
            final_xp: 50,
            xp_before_penalties: 50,
            penalty_xp: 0,
            tasks_completed: 2,
            tasks_failed: 0,
            tasks_total: 2,
            total_focus_minutes: 30,
            completed_by_tier: Default::default(),
            failed_by_tier: Default::default(),
            completed_with_timer: 0,
            completed_without_timer: 2,
            created_at: Utc::now(),
        };
        user.apply_extraction(&extraction);
        assert_eq!(user.stats.current_streak, 1);
        assert_eq!(user.stats.best_streak, 7);
        assert_eq!(user.stats.total_xp, 50);
        assert_eq!(user.stats.total_extractions, 1);
        assert_eq!(user.stats.total_tasks_completed, 2);
        assert_eq!(user.stats.total_focus_minutes, 30);
        assert_eq!(user.last_extraction_date, Some(day(10)));
    }
}
