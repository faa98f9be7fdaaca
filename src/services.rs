use anyhow::{Context, anyhow};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::vocabulary::WordInfo;

const GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const UNSPLASH_ENDPOINT: &str = "https://api.unsplash.com/search/photos";

/// One multiple-choice question inside a generated practice set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

/// A generated question set for one TOEIC reading part. Parts 6 and 7
/// carry a passage; part 5 does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSet {
    pub part: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    pub questions: Vec<Question>,
}

/// Client for the external text-generation and image-search services.
/// Strictly value-in/value-out: nothing here touches application state.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    unsplash_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String, unsplash_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            unsplash_key,
        }
    }

    async fn generate_json(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_ENDPOINT, GEMINI_MODEL, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        let response: Value = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Generation request failed")?
            .error_for_status()
            .context("Generation request rejected")?
            .json()
            .await
            .context("Generation response was not JSON")?;

        let text = response["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow!("Generation response missing text"))?;

        // Models occasionally wrap the JSON in a code fence anyway.
        Ok(text
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string())
    }

    /// Generates a fresh question set for one reading part. On failure
    /// the caller must leave quiz state untouched and surface a retry.
    pub async fn generate_practice_set(&self, part: u8) -> anyhow::Result<PracticeSet> {
        let prompt = practice_prompt(part)?;
        let raw = self.generate_json(&prompt).await?;
        let set: PracticeSet =
            serde_json::from_str(&raw).context("Received malformed practice set")?;
        if set.questions.is_empty() {
            return Err(anyhow!("Received an empty practice set"));
        }
        Ok(set)
    }

    /// Looks up translation, example, phonetics and a visual
    /// description for a word. The image URL is filled in separately.
    pub async fn word_info(&self, word: &str) -> anyhow::Result<WordInfo> {
        let prompt = format!(
            "Provide information for the English word \"{}\" as a JSON object with \
             keys \"translation\" (Vietnamese translation, most common meaning), \
             \"example\" (a simple English sentence using the word in context), \
             \"phonetic\" (IPA transcription with stress marks, e.g. /həˈloʊ/) and \
             \"visualDescription\" (a short, concrete scene for an image search: \
             objects, people, actions or settings, no abstract concepts or text).",
            word
        );
        let raw = self.generate_json(&prompt).await?;
        let info: WordInfo =
            serde_json::from_str(&raw).context("Received malformed word info")?;
        Ok(info)
    }

    /// Finds an illustration URL for a visual description. Never fails:
    /// falls back to a generic query and finally to a placeholder URL.
    pub async fn image_for(&self, visual_description: &str, word: Option<&str>) -> String {
        let mut query = keywords_from(visual_description);
        if let Some(word) = word {
            query = format!("{} {}", word, query);
            query.truncate(50);
        }

        match self.search_unsplash(&query).await {
            Ok(Some(url)) => return url,
            Ok(None) => log::info!("No image results for \"{}\"", query),
            Err(e) => log::warn!("Image search failed for \"{}\": {}", query, e),
        }

        // Generic retry before giving up on the search service.
        let fallback_query = word.unwrap_or("education");
        if let Ok(Some(url)) = self.search_unsplash(fallback_query).await {
            return url;
        }

        let placeholder = word.unwrap_or("Vocabulary");
        format!(
            "https://via.placeholder.com/400x300/667eea/FFFFFF?text={}",
            placeholder
        )
    }

    async fn search_unsplash(&self, query: &str) -> anyhow::Result<Option<String>> {
        let response: Value = self
            .http
            .get(UNSPLASH_ENDPOINT)
            .query(&[
                ("query", query),
                ("page", "1"),
                ("per_page", "20"),
                ("orientation", "landscape"),
                ("content_filter", "high"),
            ])
            .header(
                "Authorization",
                format!("Client-ID {}", self.unsplash_key),
            )
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let results = match response["results"].as_array() {
            Some(results) if !results.is_empty() => results.clone(),
            _ => return Ok(None),
        };

        // Prefer well-liked photos, then pick one of the top few so
        // repeated lookups do not always show the same image.
        let mut sorted = results;
        sorted.sort_by_key(|r| std::cmp::Reverse(r["likes"].as_i64().unwrap_or(0)));
        let pick = rand::rng().random_range(0..sorted.len().min(5));
        Ok(sorted[pick]["urls"]["regular"]
            .as_str()
            .map(str::to_string))
    }

    /// A fill-in-the-blank sentence for a review question. The sentence
    /// contains exactly one `[BLANK]` placeholder.
    pub async fn cloze_sentence(&self, word: &str) -> anyhow::Result<String> {
        let prompt = format!(
            "Create a simple, new fill-in-the-blank sentence for the English word \
             \"{}\". The sentence should provide clear context. Replace the word \
             itself with the placeholder \"[BLANK]\". Respond as a JSON object with \
             a single key \"sentence\".",
            word
        );
        let raw = self.generate_json(&prompt).await?;
        let value: Value = serde_json::from_str(&raw).context("Malformed cloze response")?;
        let sentence = value["sentence"]
            .as_str()
            .ok_or_else(|| anyhow!("Cloze response missing sentence"))?;
        if !sentence.contains("[BLANK]") {
            return Err(anyhow!("Cloze sentence has no blank placeholder"));
        }
        Ok(sentence.to_string())
    }

    /// Explains why a submitted answer was wrong. Recoverable like all
    /// collaborator calls: the caller surfaces a retry.
    pub async fn analyze_mistake(
        &self,
        question: &Question,
        user_answer: &str,
        passage: Option<&str>,
    ) -> anyhow::Result<String> {
        let context = passage
            .map(|p| format!("Given the passage:\n\"\"\"{}\"\"\"\n\n", p))
            .unwrap_or_default();
        let prompt = format!(
            "You are an expert TOEIC tutor. A student made a mistake.\n\n{}\
             Question: \"{}\"\nOptions: {}\nThe student chose: \"{}\"\n\
             The correct answer is: \"{}\"\n\n\
             Explain in Vietnamese, in three short sections, why the student's \
             answer is wrong, why the correct answer is right, and what lesson to \
             take away. Keep it concise and encouraging; use **bold** for key \
             terms and no other markdown. Respond as a JSON object with a single \
             key \"analysis\".",
            context,
            question.question_text,
            question.options.join(", "),
            user_answer,
            question.correct_answer
        );
        let raw = self.generate_json(&prompt).await?;
        let value: Value =
            serde_json::from_str(&raw).context("Malformed analysis response")?;
        value["analysis"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Analysis response missing text"))
    }
}

fn practice_prompt(part: u8) -> anyhow::Result<String> {
    let prompt = match part {
        5 => "Generate 5 unique multiple-choice questions for TOEIC Reading Part 5. \
              Each question must be a single sentence with a blank, testing English \
              grammar and vocabulary in a business context (office communication, \
              marketing, or personnel). Respond as a JSON object with keys \"part\" \
              (5) and \"questions\": an array of objects with keys \"id\", \
              \"questionText\", \"options\" (four strings labelled (A)-(D)), \
              \"correctAnswer\" (the exact option string) and \"explanation\"."
            .to_string(),
        6 => "Generate a text for TOEIC Reading Part 6 with 4 blanks. The text \
              should be a business document such as an email, notice, or letter, \
              about 100-150 words, on the topic of a company event. Mark the blanks \
              with placeholders like '[1]'. One of the questions must be a full \
              sentence choice. Respond as a JSON object with keys \"part\" (6), \
              \"passage\" and \"questions\": an array of 4 objects with keys \
              \"id\", \"questionText\", \"options\" (four strings labelled \
              (A)-(D)), \"correctAnswer\" and \"explanation\"."
            .to_string(),
        7 => "Generate a single reading passage for TOEIC Reading Part 7: a \
              business advertisement for a new service, about 150-200 words, \
              followed by 3 multiple-choice comprehension questions covering main \
              purpose, specific details, and inference. Respond as a JSON object \
              with keys \"part\" (7), \"passage\" and \"questions\": an array of 3 \
              objects with keys \"id\", \"questionText\", \"options\" (four \
              strings labelled (A)-(D)), \"correctAnswer\" and \"explanation\"."
            .to_string(),
        _ => return Err(anyhow!("Invalid reading part: {}", part)),
    };
    Ok(prompt)
}

/// Basic keyword extraction for the image search query.
fn keywords_from(visual_description: &str) -> String {
    let keywords: Vec<&str> = visual_description
        .split_whitespace()
        .filter(|w| w.len() > 2 && w.chars().all(|c| c.is_ascii_alphabetic()))
        .take(3)
        .collect();
    if keywords.is_empty() {
        "education learning".to_string()
    } else {
        keywords.join(" ").to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_practice_prompt_rejects_unknown_part() {
        assert!(practice_prompt(5).is_ok());
        assert!(practice_prompt(6).is_ok());
        assert!(practice_prompt(7).is_ok());
        assert!(practice_prompt(4).is_err());
    }

    #[test]
    fn test_keywords_from_description() {
        assert_eq!(
            keywords_from("business people sitting around a conference table"),
            "business people sitting"
        );
        assert_eq!(keywords_from("a 12 !!"), "education learning");
    }

    #[test]
    fn test_practice_set_parses_camel_case() {
        let raw = r#"{
            "part": 7,
            "passage": "Announcing our new delivery service...",
            "questions": [{
                "id": "q1",
                "questionText": "What is the main purpose of the advertisement?",
                "options": ["(A) one", "(B) two", "(C) three", "(D) four"],
                "correctAnswer": "(A) one",
                "explanation": "The first line states the purpose."
            }]
        }"#;
        let set: PracticeSet = serde_json::from_str(raw).unwrap();
        assert_eq!(set.part, 7);
        assert!(set.passage.is_some());
        assert_eq!(set.questions[0].correct_answer, "(A) one");
    }
}
