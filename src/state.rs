use rand::Rng;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::clock;
use crate::quests::{DailyQuestRecord, DailyQuestStatus, DailyQuestTracker, QuestKey};
use crate::review::{AnswerResponse, ReviewError, ReviewSession, ReviewSummary};
use crate::services::PracticeSet;
use crate::storage::{self, KeyValueStore};
use crate::streak::{StreakState, StreakTracker};
use crate::vocabulary::{SavedWord, VocabError, VocabularyStore, WordInfo};

pub type SharedState = Arc<Mutex<AppState>>;

/// Streak and quest snapshot returned alongside command results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub streak: u32,
    pub quests: DailyQuestStatus,
}

/// All mutable application state plus the store it persists through.
/// Commands mutate in memory first, then write the touched entity;
/// writes are best-effort and independent per entity.
pub struct AppState {
    pub vocabulary: VocabularyStore,
    pub streak: StreakTracker,
    pub quests: DailyQuestTracker,
    pub review: Option<ReviewSession>,
    practice: Option<PracticeSet>,
    store: Box<dyn KeyValueStore>,
}

impl AppState {
    /// Loads every entity from the store, degrading each one
    /// independently to its initial state on missing or corrupt data.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let today = clock::today();

        let stored_streak: StreakState = storage::load_or_default(&*store, storage::STREAK_KEY);
        let had_streak = stored_streak.count > 0;
        let streak = StreakTracker::load_and_validate(stored_streak, today);

        let stored_quests: DailyQuestRecord =
            storage::load_or_default(&*store, storage::QUESTS_KEY);
        let stored_quests = (!stored_quests.date.is_empty()).then_some(stored_quests);
        let quests = DailyQuestTracker::load(stored_quests, &clock::today_key());

        let words: Vec<SavedWord> = storage::load_or_default(&*store, storage::WORDS_KEY);
        let vocabulary = VocabularyStore::from_words(words);

        let mut state = Self {
            vocabulary,
            streak,
            quests,
            review: None,
            practice: None,
            store,
        };

        // A streak invalidated at startup is cleared on disk too.
        if had_streak && state.streak.count() == 0 {
            state.persist_streak();
        }
        // Today's quest set is persisted as soon as it exists.
        state.persist_quests();
        state
    }

    fn persist_words(&mut self) {
        let words = self.vocabulary.words().to_vec();
        storage::save_entity(&mut *self.store, storage::WORDS_KEY, &words);
    }

    fn persist_streak(&mut self) {
        let state = self.streak.state().clone();
        storage::save_entity(&mut *self.store, storage::STREAK_KEY, &state);
    }

    fn persist_quests(&mut self) {
        let record = self.quests.record().clone();
        storage::save_entity(&mut *self.store, storage::QUESTS_KEY, &record);
    }

    /// Re-checks the local-midnight boundary before any quest-touching
    /// command, discarding yesterday's flags.
    fn ensure_today(&mut self) {
        if self.quests.rollover_if_needed(&clock::today_key()) {
            self.persist_quests();
        }
    }

    fn complete_quest(&mut self, key: QuestKey) {
        self.ensure_today();
        if self.quests.complete(key) {
            self.persist_quests();
        }
    }

    pub fn progress(&mut self) -> Progress {
        self.ensure_today();
        Progress {
            streak: self.streak.count(),
            quests: self.quests.status().clone(),
        }
    }

    /// A freshly generated set becomes the one submissions are scored
    /// against. Only called on successful generation.
    pub fn set_practice(&mut self, set: PracticeSet) {
        self.practice = Some(set);
    }

    pub fn take_practice(&mut self) -> Option<PracticeSet> {
        self.practice.take()
    }

    /// Every answer submission counts toward the streak; a score of
    /// 80% or better also completes the matching part quest.
    pub fn record_submission(&mut self, part: u8, score: usize, total: usize) -> Progress {
        self.streak.record_practice(clock::today());
        self.persist_streak();

        if total > 0 && score * 100 >= total * 80 {
            if let Some(key) = QuestKey::for_part(part) {
                self.complete_quest(key);
            }
        }
        self.progress()
    }

    pub fn save_word(&mut self, word: &str, info: WordInfo) -> Result<SavedWord, VocabError> {
        let entry = self.vocabulary.add(word, info, clock::now())?;
        self.persist_words();
        self.complete_quest(QuestKey::SavedWord);
        Ok(entry)
    }

    pub fn remove_word(&mut self, word: &str) {
        self.vocabulary.remove(word);
        self.persist_words();
    }

    /// Builds a fresh session from the currently due words. Replaces
    /// any session left open.
    pub fn start_review(&mut self, rng: &mut impl Rng) -> Result<usize, ReviewError> {
        let due = self.vocabulary.due_for_review(clock::now());
        if due.is_empty() {
            self.review = None;
            return Err(ReviewError::NothingDue);
        }
        let session = ReviewSession::new(due, rng);
        let total = session.len();
        self.review = Some(session);
        Ok(total)
    }

    /// Grades the open question, updates the word's level and persists
    /// the vocabulary. A word deleted mid-session is skipped.
    pub fn answer_review(&mut self, answer: &str) -> Result<AnswerResponse, ReviewError> {
        let session = self.review.as_mut().ok_or(ReviewError::NoSession)?;
        let correct_answer = session
            .current_question()
            .ok_or(ReviewError::NoOpenQuestion)?
            .correct_answer
            .clone();
        let (word, correct) = session
            .answer(answer)
            .ok_or(ReviewError::NoOpenQuestion)?;

        let level = crate::review::grade_outcome(self, &word, correct);
        self.persist_words();

        let finished = self
            .review
            .as_ref()
            .map(|s| s.is_finished())
            .unwrap_or(true);
        Ok(AnswerResponse {
            correct,
            correct_answer,
            level,
            finished,
        })
    }

    /// Ends the session (finished or not), completing the review quest
    /// regardless of score.
    pub fn finish_review(&mut self) -> Result<ReviewSummary, ReviewError> {
        let session = self.review.take().ok_or(ReviewError::NoSession)?;
        let summary = session.summary();
        self.complete_quest(QuestKey::ReviewedVocab);
        Ok(summary)
    }
}
