use chrono::{DateTime, Duration, Utc};

use crate::vocabulary::SavedWord;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

/// Days until the next review for each level. Fixed table, strictly
/// increasing in level.
pub fn interval_days(level: u8) -> i64 {
    match level {
        1 => 1,
        2 => 3,
        3 => 7,
        4 => 15,
        5 => 30,
        _ => panic!("SRS level out of range: {}", level),
    }
}

/// Applies one review outcome to a word. Pure: returns an updated copy,
/// the caller persists it. Level moves one step up or down, clamped to
/// [1,5], and the next review is rescheduled from the current instant.
pub fn grade(word: &SavedWord, is_correct: bool, now: DateTime<Utc>) -> SavedWord {
    let new_level = if is_correct {
        (word.level + 1).min(MAX_LEVEL)
    } else {
        word.level.saturating_sub(1).max(MIN_LEVEL)
    };

    let mut updated = word.clone();
    updated.level = new_level;
    updated.next_review_at = now + Duration::days(interval_days(new_level));
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{SavedWord, WordInfo};

    fn word_at_level(level: u8) -> SavedWord {
        SavedWord::new(
            "ledger".to_string(),
            WordInfo {
                translation: "sổ cái".to_string(),
                example: "The accountant updated the ledger.".to_string(),
                phonetic: "/ˈledʒər/".to_string(),
                visual_description: "accountant writing in a large book".to_string(),
                image_url: "https://example.com/ledger.jpg".to_string(),
            },
            Utc::now(),
        )
        .with_level(level)
    }

    #[test]
    fn test_intervals_strictly_increase() {
        for level in MIN_LEVEL..MAX_LEVEL {
            assert!(interval_days(level) < interval_days(level + 1));
        }
    }

    #[test]
    #[should_panic]
    fn test_interval_rejects_out_of_range_level() {
        interval_days(6);
    }

    #[test]
    fn test_grade_moves_level_one_step() {
        let now = Utc::now();
        assert_eq!(grade(&word_at_level(2), true, now).level, 3);
        assert_eq!(grade(&word_at_level(2), false, now).level, 1);
    }

    #[test]
    fn test_grade_clamps_at_bounds() {
        let now = Utc::now();
        assert_eq!(grade(&word_at_level(5), true, now).level, 5);
        assert_eq!(grade(&word_at_level(1), false, now).level, 1);
    }

    #[test]
    fn test_grade_never_leaves_range() {
        let now = Utc::now();
        for level in MIN_LEVEL..=MAX_LEVEL {
            for outcome in [true, false] {
                let graded = grade(&word_at_level(level), outcome, now);
                assert!((MIN_LEVEL..=MAX_LEVEL).contains(&graded.level));
            }
        }
    }

    #[test]
    fn test_grade_reschedules_from_now() {
        let now = Utc::now();
        let graded = grade(&word_at_level(1), true, now);
        assert_eq!(graded.next_review_at, now + Duration::days(interval_days(2)));
    }

    #[test]
    fn test_grade_keeps_other_fields() {
        let original = word_at_level(3);
        let graded = grade(&original, false, Utc::now());
        assert_eq!(graded.word, original.word);
        assert_eq!(graded.translation, original.translation);
        assert_eq!(graded.phonetic, original.phonetic);
        assert_eq!(graded.image_url, original.image_url);
    }
}
