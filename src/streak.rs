use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock;

/// Persisted streak record: consecutive practice days and the date of
/// the last counted submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    pub count: u32,
    pub last_practice_date: Option<NaiveDate>,
}

/// Consecutive-day practice counter. A streak is alive while the last
/// practice was today or yesterday; any other gap (including a clock
/// running backwards) breaks it. The same day-boundary policy applies
/// at load time and on every practice event.
#[derive(Debug, Default)]
pub struct StreakTracker {
    state: StreakState,
}

impl StreakTracker {
    /// Validates a stored record against today's date. A stale record
    /// is zeroed here rather than in real time, so a broken streak
    /// only disappears the next time the app is opened.
    pub fn load_and_validate(stored: StreakState, today: NaiveDate) -> Self {
        let state = match stored.last_practice_date {
            Some(last) => {
                let diff = clock::day_difference(today, last);
                if (0..=1).contains(&diff) && stored.count > 0 {
                    stored
                } else {
                    StreakState::default()
                }
            }
            None => StreakState::default(),
        };
        Self { state }
    }

    /// Records a practice event for today. Same-day repeats are a
    /// no-op; a one-day gap extends the streak; anything else starts
    /// over at 1.
    pub fn record_practice(&mut self, today: NaiveDate) -> u32 {
        match self.state.last_practice_date {
            Some(last) => match clock::day_difference(today, last) {
                0 => {}
                1 => {
                    self.state.count += 1;
                    self.state.last_practice_date = Some(today);
                }
                _ => {
                    self.state.count = 1;
                    self.state.last_practice_date = Some(today);
                }
            },
            None => {
                self.state.count = 1;
                self.state.last_practice_date = Some(today);
            }
        }
        self.state.count
    }

    pub fn count(&self) -> u32 {
        self.state.count
    }

    pub fn state(&self) -> &StreakState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stored(count: u32, last: NaiveDate) -> StreakState {
        StreakState {
            count,
            last_practice_date: Some(last),
        }
    }

    #[test]
    fn test_first_practice_starts_at_one() {
        let mut tracker = StreakTracker::default();
        assert_eq!(tracker.record_practice(date(2024, 1, 10)), 1);
        assert_eq!(
            tracker.state().last_practice_date,
            Some(date(2024, 1, 10))
        );
    }

    #[test]
    fn test_same_day_practice_does_not_double_count() {
        let mut tracker = StreakTracker::default();
        tracker.record_practice(date(2024, 1, 10));
        assert_eq!(tracker.record_practice(date(2024, 1, 10)), 1);
    }

    #[test]
    fn test_consecutive_day_increments() {
        let today = date(2024, 1, 10);
        let mut tracker =
            StreakTracker::load_and_validate(stored(4, date(2024, 1, 9)), today);
        assert_eq!(tracker.record_practice(today), 5);
    }

    #[test]
    fn test_gap_resets_to_one() {
        let today = date(2024, 1, 10);
        let mut tracker = StreakTracker {
            state: stored(4, date(2024, 1, 5)),
        };
        assert_eq!(tracker.record_practice(today), 1);
    }

    #[test]
    fn test_negative_gap_resets_to_one() {
        // Clock moved backwards; treat like a broken streak, not a crash.
        let mut tracker = StreakTracker {
            state: stored(4, date(2024, 1, 15)),
        };
        assert_eq!(tracker.record_practice(date(2024, 1, 10)), 1);
    }

    #[test]
    fn test_load_keeps_streak_from_today_or_yesterday() {
        let today = date(2024, 1, 10);
        let kept = StreakTracker::load_and_validate(stored(3, today), today);
        assert_eq!(kept.count(), 3);

        let kept = StreakTracker::load_and_validate(stored(3, date(2024, 1, 9)), today);
        assert_eq!(kept.count(), 3);
    }

    #[test]
    fn test_load_zeroes_stale_streak() {
        let today = date(2024, 1, 10);
        let reset = StreakTracker::load_and_validate(stored(7, date(2024, 1, 5)), today);
        assert_eq!(reset.count(), 0);
        assert_eq!(reset.state().last_practice_date, None);
    }

    #[test]
    fn test_load_zeroes_future_dated_streak() {
        let today = date(2024, 1, 10);
        let reset = StreakTracker::load_and_validate(stored(7, date(2024, 2, 1)), today);
        assert_eq!(reset.count(), 0);
    }
}
