use serde::{Deserialize, Serialize};

/// One-per-day boolean objectives. Flags only ever move false→true
/// within a day; the daily rollover replaces the whole set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuestStatus {
    pub logged_in: bool,
    pub saved_word: bool,
    pub reviewed_vocab: bool,
    pub completed_part5: bool,
    pub completed_part6: bool,
    pub completed_part7: bool,
}

impl DailyQuestStatus {
    /// The set a fresh day starts with: opening the app is itself the
    /// login quest.
    fn fresh() -> Self {
        Self {
            logged_in: true,
            ..Self::default()
        }
    }
}

/// The quest categories that user actions can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestKey {
    SavedWord,
    ReviewedVocab,
    CompletedPart5,
    CompletedPart6,
    CompletedPart7,
}

impl QuestKey {
    /// Quest completed by scoring well on a given reading part, if any.
    pub fn for_part(part: u8) -> Option<Self> {
        match part {
            5 => Some(Self::CompletedPart5),
            6 => Some(Self::CompletedPart6),
            7 => Some(Self::CompletedPart7),
            _ => None,
        }
    }
}

/// Persisted day-stamped quest record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuestRecord {
    pub date: String,
    pub quests: DailyQuestStatus,
}

/// Per-day quest state machine. Stale records are discarded on access
/// and replaced with a fresh set for today.
#[derive(Debug, Default)]
pub struct DailyQuestTracker {
    record: DailyQuestRecord,
}

impl DailyQuestTracker {
    /// Loads a stored record, rolling over to a fresh set when the
    /// stored date key is not today's.
    pub fn load(stored: Option<DailyQuestRecord>, today_key: &str) -> Self {
        let record = match stored {
            Some(record) if record.date == today_key => record,
            _ => DailyQuestRecord {
                date: today_key.to_string(),
                quests: DailyQuestStatus::fresh(),
            },
        };
        Self { record }
    }

    /// Marks a quest complete. Returns true only on the false→true
    /// transition; repeat completions are a no-op.
    pub fn complete(&mut self, key: QuestKey) -> bool {
        let flag = match key {
            QuestKey::SavedWord => &mut self.record.quests.saved_word,
            QuestKey::ReviewedVocab => &mut self.record.quests.reviewed_vocab,
            QuestKey::CompletedPart5 => &mut self.record.quests.completed_part5,
            QuestKey::CompletedPart6 => &mut self.record.quests.completed_part6,
            QuestKey::CompletedPart7 => &mut self.record.quests.completed_part7,
        };
        if *flag {
            false
        } else {
            *flag = true;
            true
        }
    }

    /// Re-checks the day boundary; on a new day the old flags are
    /// dropped and a fresh set is started. Returns true when a
    /// rollover happened (the caller persists the new record).
    pub fn rollover_if_needed(&mut self, today_key: &str) -> bool {
        if self.record.date == today_key {
            return false;
        }
        self.record = DailyQuestRecord {
            date: today_key.to_string(),
            quests: DailyQuestStatus::fresh(),
        };
        true
    }

    pub fn status(&self) -> &DailyQuestStatus {
        &self.record.quests
    }

    pub fn record(&self) -> &DailyQuestRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_day_has_only_logged_in() {
        let tracker = DailyQuestTracker::load(None, "2024-01-01");
        let status = tracker.status();
        assert!(status.logged_in);
        assert!(!status.saved_word);
        assert!(!status.reviewed_vocab);
        assert!(!status.completed_part5);
        assert!(!status.completed_part6);
        assert!(!status.completed_part7);
    }

    #[test]
    fn test_load_keeps_todays_record() {
        let stored = DailyQuestRecord {
            date: "2024-01-01".to_string(),
            quests: DailyQuestStatus {
                logged_in: true,
                saved_word: true,
                ..DailyQuestStatus::default()
            },
        };
        let tracker = DailyQuestTracker::load(Some(stored), "2024-01-01");
        assert!(tracker.status().saved_word);
    }

    #[test]
    fn test_load_rolls_over_stale_record() {
        let stored = DailyQuestRecord {
            date: "2024-01-01".to_string(),
            quests: DailyQuestStatus {
                logged_in: true,
                saved_word: true,
                reviewed_vocab: true,
                completed_part5: true,
                ..DailyQuestStatus::default()
            },
        };
        let tracker = DailyQuestTracker::load(Some(stored), "2024-01-02");
        assert_eq!(tracker.record().date, "2024-01-02");
        assert_eq!(tracker.status(), &DailyQuestStatus::fresh());
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut tracker = DailyQuestTracker::load(None, "2024-01-01");
        assert!(tracker.complete(QuestKey::SavedWord));
        assert!(!tracker.complete(QuestKey::SavedWord));
        assert!(tracker.status().saved_word);
    }

    #[test]
    fn test_rollover_if_needed() {
        let mut tracker = DailyQuestTracker::load(None, "2024-01-01");
        tracker.complete(QuestKey::ReviewedVocab);

        assert!(!tracker.rollover_if_needed("2024-01-01"));
        assert!(tracker.status().reviewed_vocab);

        assert!(tracker.rollover_if_needed("2024-01-02"));
        assert!(!tracker.status().reviewed_vocab);
        assert!(tracker.status().logged_in);
    }

    #[test]
    fn test_part_quest_mapping() {
        assert_eq!(QuestKey::for_part(5), Some(QuestKey::CompletedPart5));
        assert_eq!(QuestKey::for_part(6), Some(QuestKey::CompletedPart6));
        assert_eq!(QuestKey::for_part(7), Some(QuestKey::CompletedPart7));
        assert_eq!(QuestKey::for_part(4), None);
    }
}
