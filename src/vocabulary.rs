use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::services::GeminiClient;
use crate::srs;
use crate::state::SharedState;

lazy_static! {
    static ref WORD_CLEAN_RE: Regex = Regex::new(r"[^a-z-]").unwrap();
}

/// Metadata for a looked-up word, supplied by the external lookup
/// collaborator. Opaque to the core: content is never interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordInfo {
    pub translation: String,
    pub example: String,
    pub phonetic: String,
    pub visual_description: String,
    #[serde(default)]
    pub image_url: String,
}

/// A word saved for spaced-repetition review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedWord {
    pub word: String,
    pub translation: String,
    pub example: String,
    pub phonetic: String,
    pub visual_description: String,
    pub image_url: String,
    pub level: u8,
    pub next_review_at: DateTime<Utc>,
}

impl SavedWord {
    /// New entry at level 1, due immediately.
    pub fn new(word: String, info: WordInfo, now: DateTime<Utc>) -> Self {
        Self {
            word,
            translation: info.translation,
            example: info.example,
            phonetic: info.phonetic,
            visual_description: info.visual_description,
            image_url: info.image_url,
            level: srs::MIN_LEVEL,
            next_review_at: now,
        }
    }

    #[cfg(test)]
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }
}

#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Word \"{0}\" is already saved")]
    AlreadyExists(String),
    #[error("Word \"{0}\" not found")]
    NotFound(String),
    #[error("Not a valid word")]
    InvalidWord,
}

impl IntoResponse for VocabError {
    fn into_response(self) -> Response {
        let status = match self {
            VocabError::AlreadyExists(_) => StatusCode::CONFLICT,
            VocabError::NotFound(_) => StatusCode::NOT_FOUND,
            VocabError::InvalidWord => StatusCode::BAD_REQUEST,
        };

        let body = json!({
            "error": self.to_string(),
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Trims, lowercases and strips anything that is not a letter or a
/// hyphen. The result is the unique key of a saved word.
pub fn normalize_word(word: &str) -> String {
    let lowered = word.trim().to_lowercase();
    WORD_CLEAN_RE.replace_all(&lowered, "").into_owned()
}

/// The set of saved words, keyed by normalized word text. Ordered
/// most-recently-added first; that is the display order, not an
/// invariant anything else relies on.
#[derive(Debug, Default)]
pub struct VocabularyStore {
    words: Vec<SavedWord>,
}

impl VocabularyStore {
    pub fn from_words(words: Vec<SavedWord>) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[SavedWord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<&SavedWord> {
        let key = normalize_word(word);
        self.words.iter().find(|w| w.word == key)
    }

    /// Inserts a new level-1, immediately-due entry at the front.
    /// Rejects duplicates without mutating anything.
    pub fn add(
        &mut self,
        word: &str,
        info: WordInfo,
        now: DateTime<Utc>,
    ) -> Result<SavedWord, VocabError> {
        let key = normalize_word(word);
        if key.is_empty() {
            return Err(VocabError::InvalidWord);
        }
        if self.words.iter().any(|w| w.word == key) {
            return Err(VocabError::AlreadyExists(key));
        }

        let entry = SavedWord::new(key, info, now);
        self.words.insert(0, entry.clone());
        Ok(entry)
    }

    /// Deletes the entry if present. Missing words are a no-op, not an
    /// error.
    pub fn remove(&mut self, word: &str) {
        let key = normalize_word(word);
        self.words.retain(|w| w.word != key);
    }

    /// All entries whose next review is at or before `at`. No ordering
    /// guarantee; callers wanting variety shuffle explicitly.
    pub fn due_for_review(&self, at: DateTime<Utc>) -> Vec<SavedWord> {
        self.words
            .iter()
            .filter(|w| w.next_review_at <= at)
            .cloned()
            .collect()
    }

    /// Grades a single word in place. `NotFound` means the word was
    /// deleted mid-session; callers skip it rather than fail.
    pub fn apply_grade(
        &mut self,
        word: &str,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<SavedWord, VocabError> {
        let key = normalize_word(word);
        let entry = self
            .words
            .iter_mut()
            .find(|w| w.word == key)
            .ok_or(VocabError::NotFound(key))?;

        *entry = srs::grade(entry, is_correct, now);
        Ok(entry.clone())
    }
}

// ===== HTTP handlers =====

#[derive(Deserialize)]
pub struct LookupRequest {
    pub word: String,
}

#[derive(Serialize)]
pub struct LookupResponse {
    /// Echo of the normalized word so the client can discard responses
    /// for a lookup it has already replaced.
    pub word: String,
    #[serde(flatten)]
    pub info: WordInfo,
    pub saved: bool,
}

#[derive(Deserialize)]
pub struct SaveWordRequest {
    pub word: String,
    #[serde(flatten)]
    pub info: WordInfo,
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

pub async fn list_words(
    State((state, _gemini)): State<(SharedState, Arc<GeminiClient>)>,
) -> Json<Vec<SavedWord>> {
    let state = state.lock().unwrap();
    Json(state.vocabulary.words().to_vec())
}

pub async fn lookup_word(
    State((state, gemini)): State<(SharedState, Arc<GeminiClient>)>,
    Json(payload): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, Response> {
    let word = normalize_word(&payload.word);
    if word.len() < 2 || word.len() > 20 {
        return Err(VocabError::InvalidWord.into_response());
    }

    let mut info = gemini.word_info(&word).await.map_err(|e| {
        log::warn!("Word lookup failed for \"{}\": {}", word, e);
        let body = json!({
            "error": "Failed to get info for this word.",
            "status": StatusCode::BAD_GATEWAY.as_u16()
        });
        (StatusCode::BAD_GATEWAY, axum::Json(body)).into_response()
    })?;

    // Never fails: falls back to a placeholder URL.
    info.image_url = gemini
        .image_for(&info.visual_description, Some(&word))
        .await;

    let saved = state.lock().unwrap().vocabulary.get(&word).is_some();
    Ok(Json(LookupResponse { word, info, saved }))
}

pub async fn save_word(
    State((state, _gemini)): State<(SharedState, Arc<GeminiClient>)>,
    Json(payload): Json<SaveWordRequest>,
) -> Result<Json<SavedWord>, VocabError> {
    let mut state = state.lock().unwrap();
    let entry = state.save_word(&payload.word, payload.info)?;
    Ok(Json(entry))
}

pub async fn remove_word(
    State((state, _gemini)): State<(SharedState, Arc<GeminiClient>)>,
    Path(word): Path<String>,
) -> Json<ApiResponse> {
    let mut state = state.lock().unwrap();
    state.remove_word(&word);
    Json(ApiResponse {
        success: true,
        message: "Word removed".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(translation: &str) -> WordInfo {
        WordInfo {
            translation: translation.to_string(),
            example: "Example sentence.".to_string(),
            phonetic: "/tɛst/".to_string(),
            visual_description: "a desk with papers".to_string(),
            image_url: "https://example.com/img.jpg".to_string(),
        }
    }

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("  Invoice  "), "invoice");
        assert_eq!(normalize_word("Well-Known,"), "well-known");
        assert_eq!(normalize_word("1234!"), "");
    }

    #[test]
    fn test_add_then_immediately_due() {
        let mut store = VocabularyStore::default();
        let now = Utc::now();
        store.add("invoice", info("hóa đơn"), now).unwrap();

        let due = store.due_for_review(now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].word, "invoice");
        assert_eq!(due[0].level, 1);
    }

    #[test]
    fn test_duplicate_add_is_rejected_without_mutation() {
        let mut store = VocabularyStore::default();
        let now = Utc::now();
        store.add("Invoice", info("hóa đơn"), now).unwrap();

        let result = store.add("  invoice ", info("something else"), now);
        assert!(matches!(result, Err(VocabError::AlreadyExists(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("invoice").unwrap().translation, "hóa đơn");
    }

    #[test]
    fn test_empty_word_is_rejected() {
        let mut store = VocabularyStore::default();
        let result = store.add("  42 ", info("x"), Utc::now());
        assert!(matches!(result, Err(VocabError::InvalidWord)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_most_recent_first() {
        let mut store = VocabularyStore::default();
        let now = Utc::now();
        store.add("first", info("a"), now).unwrap();
        store.add("second", info("b"), now).unwrap();
        assert_eq!(store.words()[0].word, "second");
        assert_eq!(store.words()[1].word, "first");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = VocabularyStore::default();
        store.add("invoice", info("a"), Utc::now()).unwrap();
        store.remove("receipt");
        assert_eq!(store.len(), 1);
        store.remove("INVOICE");
        assert!(store.is_empty());
    }

    #[test]
    fn test_due_excludes_future_reviews() {
        let mut store = VocabularyStore::default();
        let now = Utc::now();
        store.add("invoice", info("a"), now).unwrap();
        store.apply_grade("invoice", true, now).unwrap();

        // Level 2 pushes the review 3 days out
        assert!(store.due_for_review(now).is_empty());
        let later = now + chrono::Duration::days(3);
        assert_eq!(store.due_for_review(later).len(), 1);
    }

    #[test]
    fn test_apply_grade_missing_word() {
        let mut store = VocabularyStore::default();
        let result = store.apply_grade("ghost", true, Utc::now());
        assert!(matches!(result, Err(VocabError::NotFound(_))));
    }

    #[test]
    fn test_apply_grade_updates_in_place() {
        let mut store = VocabularyStore::default();
        let now = Utc::now();
        store.add("invoice", info("a"), now).unwrap();

        let graded = store.apply_grade("invoice", true, now).unwrap();
        assert_eq!(graded.level, 2);
        assert_eq!(store.get("invoice").unwrap().level, 2);
        assert_eq!(store.len(), 1);
    }
}
