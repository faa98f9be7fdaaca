use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::services::{GeminiClient, PracticeSet, Question};
use crate::state::{Progress, SharedState};

#[derive(Error, Debug)]
pub enum PracticeError {
    #[error("Invalid reading part: {0}")]
    InvalidPart(u8),
    #[error("No practice set in progress")]
    NoActiveSet,
    #[error("Failed to generate questions. The model may be overloaded. Please try again in a moment.")]
    GenerationFailed,
}

impl IntoResponse for PracticeError {
    fn into_response(self) -> Response {
        let status = match self {
            PracticeError::InvalidPart(_) => StatusCode::BAD_REQUEST,
            PracticeError::NoActiveSet => StatusCode::CONFLICT,
            PracticeError::GenerationFailed => StatusCode::BAD_GATEWAY,
        };

        let body = json!({
            "error": self.to_string(),
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Counts answered questions matching their correct option.
pub fn score(set: &PracticeSet, answers: &HashMap<String, String>) -> (usize, usize) {
    let correct = set
        .questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer))
        .count();
    (correct, set.questions.len())
}

// ===== HTTP handlers =====

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub part: u8,
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub answers: HashMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    #[serde(flatten)]
    pub progress: Progress,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(flatten)]
    pub question: Question,
    pub user_answer: String,
    pub passage: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

/// Requests a fresh question set from the generator. On failure no
/// quiz state is touched; the client gets a retry affordance.
pub async fn generate(
    State((state, gemini)): State<(SharedState, Arc<GeminiClient>)>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<PracticeSet>, PracticeError> {
    if !(5..=7).contains(&payload.part) {
        return Err(PracticeError::InvalidPart(payload.part));
    }

    let set = gemini
        .generate_practice_set(payload.part)
        .await
        .map_err(|e| {
            log::warn!("Question generation failed for part {}: {}", payload.part, e);
            PracticeError::GenerationFailed
        })?;

    let mut state = state.lock().unwrap();
    state.set_practice(set.clone());
    Ok(Json(set))
}

/// Scores the submitted answers against the active set, records the
/// practice event and reports the updated streak and quest flags.
pub async fn submit(
    State((state, _gemini)): State<(SharedState, Arc<GeminiClient>)>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, PracticeError> {
    let mut state = state.lock().unwrap();
    let set = state.take_practice().ok_or(PracticeError::NoActiveSet)?;

    let (correct, total) = score(&set, &payload.answers);
    let progress = state.record_submission(set.part, correct, total);
    let percentage = if total > 0 {
        (correct * 100 / total) as u32
    } else {
        0
    };

    Ok(Json(SubmitResponse {
        score: correct,
        total,
        percentage,
        progress,
    }))
}

pub async fn analyze(
    State((_state, gemini)): State<(SharedState, Arc<GeminiClient>)>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, Response> {
    let analysis = gemini
        .analyze_mistake(
            &payload.question,
            &payload.user_answer,
            payload.passage.as_deref(),
        )
        .await
        .map_err(|e| {
            log::warn!("Mistake analysis failed: {}", e);
            let body = json!({
                "error": "Failed to analyze this answer. Please try again.",
                "status": StatusCode::BAD_GATEWAY.as_u16()
            });
            (StatusCode::BAD_GATEWAY, axum::Json(body)).into_response()
        })?;

    Ok(Json(AnalyzeResponse { analysis }))
}

pub async fn progress(
    State((state, _gemini)): State<(SharedState, Arc<GeminiClient>)>,
) -> Json<Progress> {
    let mut state = state.lock().unwrap();
    Json(state.progress())
}
