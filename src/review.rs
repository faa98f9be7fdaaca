use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::clock;
use crate::services::GeminiClient;
use crate::state::SharedState;
use crate::vocabulary::{SavedWord, VocabError};

const DISTRACTOR_COUNT: usize = 3;

/// The fixed set of quiz formats a review question can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizKind {
    ImageToWord,
    PronunciationToWord,
    WordToTranslation,
    TranslationToWord,
    FillInBlank,
}

impl QuizKind {
    const ALL: [QuizKind; 5] = [
        QuizKind::ImageToWord,
        QuizKind::PronunciationToWord,
        QuizKind::WordToTranslation,
        QuizKind::TranslationToWord,
        QuizKind::FillInBlank,
    ];

    /// Whether the correct answer (and the distractors) come from the
    /// word field or the translation field.
    fn answer_field(self) -> AnswerField {
        match self {
            QuizKind::WordToTranslation => AnswerField::Translation,
            _ => AnswerField::Word,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerField {
    Word,
    Translation,
}

impl AnswerField {
    fn of(self, word: &SavedWord) -> String {
        match self {
            AnswerField::Word => word.word.clone(),
            AnswerField::Translation => word.translation.clone(),
        }
    }
}

/// One quiz question, built for exactly one due word.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(rename = "type")]
    pub kind: QuizKind,
    pub word: SavedWord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub word: String,
    pub translation: String,
    pub correct: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub total: usize,
    pub correct: Vec<ReviewOutcome>,
    pub incorrect: Vec<ReviewOutcome>,
}

/// A finite, non-resumable review session: every due word is asked
/// exactly once, in shuffled order, and graded the moment it is
/// answered. Answered questions are never revisited.
#[derive(Debug)]
pub struct ReviewSession {
    queue: Vec<SavedWord>,
    index: usize,
    current: Option<QuizQuestion>,
    results: Vec<ReviewOutcome>,
}

impl ReviewSession {
    /// Builds the session from the due set. The shuffle is cosmetic
    /// variety; the result is a uniform permutation of the input.
    pub fn new(mut due: Vec<SavedWord>, rng: &mut impl Rng) -> Self {
        due.shuffle(rng);
        Self {
            queue: due,
            index: 0,
            current: None,
            results: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.queue.len()
    }

    pub fn current_word(&self) -> Option<&SavedWord> {
        self.queue.get(self.index)
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.current.as_ref()
    }

    /// Picks a random format for the current word. Callers fetch a
    /// cloze sentence first when `FillInBlank` comes up.
    pub fn pick_kind(&self, rng: &mut impl Rng) -> Option<QuizKind> {
        self.current_word()?;
        QuizKind::ALL.choose(rng).copied()
    }

    /// Builds the question for the current word. A missing cloze
    /// sentence downgrades `FillInBlank` to a locally-constructible
    /// format instead of failing the session.
    pub fn build_question(
        &mut self,
        kind: QuizKind,
        cloze: Option<String>,
        all_words: &[SavedWord],
        rng: &mut impl Rng,
    ) -> Option<&QuizQuestion> {
        let word = self.current_word()?.clone();

        let (kind, sentence) = match (kind, cloze) {
            (QuizKind::FillInBlank, Some(sentence)) => (QuizKind::FillInBlank, Some(sentence)),
            (QuizKind::FillInBlank, None) => (QuizKind::TranslationToWord, None),
            (other, _) => (other, None),
        };

        let field = kind.answer_field();
        let correct_answer = field.of(&word);
        let mut options = distractors(&word, all_words, DISTRACTOR_COUNT, field, rng);
        options.push(correct_answer.clone());
        options.shuffle(rng);

        self.current = Some(QuizQuestion {
            kind,
            word,
            sentence,
            options,
            correct_answer,
        });
        self.current.as_ref()
    }

    /// Consumes the current question, records the outcome and moves to
    /// the next word. Returns the answered word and whether the answer
    /// was correct; `None` when there is no open question.
    pub fn answer(&mut self, answer: &str) -> Option<(SavedWord, bool)> {
        let question = self.current.take()?;
        let correct = answer == question.correct_answer;
        let word = question.word;
        self.results.push(ReviewOutcome {
            word: word.word.clone(),
            translation: word.translation.clone(),
            correct,
        });
        self.index += 1;
        Some((word, correct))
    }

    pub fn summary(&self) -> ReviewSummary {
        let (correct, incorrect) = self
            .results
            .iter()
            .cloned()
            .partition(|outcome| outcome.correct);
        ReviewSummary {
            total: self.results.len(),
            correct,
            incorrect,
        }
    }
}

/// Samples distinct wrong options from the rest of the vocabulary,
/// using the same field as the correct answer. A small vocabulary
/// yields fewer distractors, never an error.
fn distractors(
    correct: &SavedWord,
    all_words: &[SavedWord],
    count: usize,
    field: AnswerField,
    rng: &mut impl Rng,
) -> Vec<String> {
    let correct_value = field.of(correct);
    let mut pool: Vec<String> = all_words
        .iter()
        .filter(|w| w.word != correct.word)
        .map(|w| field.of(w))
        .filter(|v| *v != correct_value)
        .collect();
    pool.sort();
    pool.dedup();
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}

// ===== HTTP handlers =====

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("No words are due for review")]
    NothingDue,
    #[error("No review session in progress")]
    NoSession,
    #[error("No open question to answer")]
    NoOpenQuestion,
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let status = match self {
            ReviewError::NothingDue => StatusCode::NO_CONTENT,
            ReviewError::NoSession | ReviewError::NoOpenQuestion => StatusCode::CONFLICT,
        };

        let body = json!({
            "error": self.to_string(),
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

#[derive(Serialize)]
pub struct StartReviewResponse {
    pub total: usize,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub correct: bool,
    pub correct_answer: String,
    pub level: Option<u8>,
    pub finished: bool,
}

pub async fn start_review(
    State((state, _gemini)): State<(SharedState, Arc<GeminiClient>)>,
) -> Result<Json<StartReviewResponse>, ReviewError> {
    let mut state = state.lock().unwrap();
    let total = state.start_review(&mut rand::rng())?;
    Ok(Json(StartReviewResponse { total }))
}

pub async fn review_question(
    State((state, gemini)): State<(SharedState, Arc<GeminiClient>)>,
) -> Result<Json<QuizQuestion>, ReviewError> {
    // Pick the format first and release the lock before any network
    // call; the cloze fetch must not block other handlers.
    let pending = {
        let state = state.lock().unwrap();
        let session = state.review.as_ref().ok_or(ReviewError::NoSession)?;
        if let Some(question) = session.current_question() {
            return Ok(Json(question.clone()));
        }
        let kind = session
            .pick_kind(&mut rand::rng())
            .ok_or(ReviewError::NoOpenQuestion)?;
        let word = session
            .current_word()
            .ok_or(ReviewError::NoOpenQuestion)?
            .word
            .clone();
        (kind, word)
    };

    let (kind, word) = pending;
    let cloze = if kind == QuizKind::FillInBlank {
        match gemini.cloze_sentence(&word).await {
            Ok(sentence) => Some(sentence),
            Err(e) => {
                log::warn!("Cloze generation failed for \"{}\": {}", word, e);
                None
            }
        }
    } else {
        None
    };

    let mut state = state.lock().unwrap();
    let all_words = state.vocabulary.words().to_vec();
    let session = state.review.as_mut().ok_or(ReviewError::NoSession)?;

    // The session may have moved on while the cloze was in flight; a
    // stale sentence must not be attached to a different word.
    let cloze = match session.current_word() {
        Some(current) if current.word == word => cloze,
        _ => None,
    };

    let question = session
        .build_question(kind, cloze, &all_words, &mut rand::rng())
        .ok_or(ReviewError::NoOpenQuestion)?;
    Ok(Json(question.clone()))
}

pub async fn review_answer(
    State((state, _gemini)): State<(SharedState, Arc<GeminiClient>)>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ReviewError> {
    let mut state = state.lock().unwrap();
    let response = state.answer_review(&payload.answer)?;
    Ok(Json(response))
}

pub async fn finish_review(
    State((state, _gemini)): State<(SharedState, Arc<GeminiClient>)>,
) -> Result<Json<ReviewSummary>, ReviewError> {
    let mut state = state.lock().unwrap();
    let summary = state.finish_review()?;
    Ok(Json(summary))
}

// Used by the state module when grading answers.
pub(crate) fn grade_outcome(
    state: &mut crate::state::AppState,
    word: &SavedWord,
    correct: bool,
) -> Option<u8> {
    match state
        .vocabulary
        .apply_grade(&word.word, correct, clock::now())
    {
        Ok(updated) => Some(updated.level),
        // Deleted mid-session: skip, never crash.
        Err(VocabError::NotFound(_)) => {
            log::info!("Word \"{}\" removed mid-review, skipping grade", word.word);
            None
        }
        Err(e) => {
            log::warn!("Unexpected grading error for \"{}\": {}", word.word, e);
            None
        }
    }
}
