//! LLM skill extractor: asks the configured chat model for a `{"skills": [..]}` list.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::extraction::prompts::{SKILL_EXTRACTION_PROMPT, SKILL_EXTRACTION_SYSTEM};
use crate::extraction::ExtractionError;
use crate::llm_client::{parse_json_content, LlmClient};
use crate::settings::repository::SettingsRepository;

/// Input is capped to stay inside the model's context window.
pub const MAX_INPUT_CHARS: usize = 3000;

#[async_trait]
pub trait LlmSkillExtractor: Send + Sync {
    /// Returns free-text skill names found in `cv_text`; an empty list is a
    /// valid result. Remote failures surface as `RemoteExtractionFailed`.
    async fn extract_skills(
        &self,
        cv_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExtractionError>;
}

#[derive(Debug, Deserialize)]
struct SkillsResponse {
    #[serde(default)]
    skills: Vec<String>,
}

/// Groq-backed extractor. The model name is re-read from settings on every call.
pub struct GroqSkillExtractor {
    llm: LlmClient,
    settings: Arc<dyn SettingsRepository>,
}

impl GroqSkillExtractor {
    pub fn new(llm: LlmClient, settings: Arc<dyn SettingsRepository>) -> Self {
        Self { llm, settings }
    }
}

#[async_trait]
impl LlmSkillExtractor for GroqSkillExtractor {
    async fn extract_skills(
        &self,
        cv_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExtractionError> {
        if cv_text.trim().is_empty() {
            warn!("Empty CV text provided to LLM extractor");
            return Ok(Vec::new());
        }

        let model = self
            .settings
            .llm_settings()
            .await
            .map_err(ExtractionError::SettingsUnavailable)?
            .model;

        let input = truncate_chars(cv_text, MAX_INPUT_CHARS);
        if input.len() < cv_text.len() {
            warn!(
                original_chars = cv_text.chars().count(),
                truncated_chars = MAX_INPUT_CHARS,
                "CV text truncated for LLM processing"
            );
        }

        info!(model = %model, "Requesting LLM skill extraction");
        let prompt = SKILL_EXTRACTION_PROMPT.replace("{cv_text}", input);
        let response = self
            .llm
            .call(&model, SKILL_EXTRACTION_SYSTEM, &prompt, cancel)
            .await?;

        let Some(content) = response.text() else {
            warn!("LLM returned no usable content");
            return Ok(Vec::new());
        };

        let parsed: SkillsResponse = parse_json_content(content)?;
        let skills = clean_llm_skills(parsed.skills);
        info!(count = skills.len(), "LLM extracted skills");
        Ok(skills)
    }
}

/// Returns the longest prefix of `text` holding at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Drops blank entries and exact duplicates, keeping first-seen order.
fn clean_llm_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroqConfig, DEFAULT_GROQ_MODEL};
    use crate::extraction::policy::ExtractionPolicy;
    use crate::settings::models::LlmSettings;
    use crate::settings::repository::InMemorySettingsRepository;

    fn extractor(api_key: Option<&str>) -> GroqSkillExtractor {
        let llm = LlmClient::new(&GroqConfig {
            api_key: api_key.map(String::from),
            base_url: "http://127.0.0.1:9/v1".to_string(),
            model: DEFAULT_GROQ_MODEL.to_string(),
            timeout_secs: 5,
            max_tokens: 1000,
        })
        .unwrap();
        let settings = Arc::new(InMemorySettingsRepository::new(
            ExtractionPolicy::default(),
            LlmSettings {
                model: DEFAULT_GROQ_MODEL.to_string(),
            },
        ));
        GroqSkillExtractor::new(llm, settings)
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_clean_llm_skills_drops_blank_and_exact_duplicates() {
        let cleaned = clean_llm_skills(vec![
            "Rust".into(),
            "  ".into(),
            "Rust".into(),
            "rust".into(),
            "".into(),
            "Go".into(),
        ]);
        assert_eq!(cleaned, vec!["Rust", "rust", "Go"]);
    }

    #[test]
    fn test_skills_response_parses_fenced_json() {
        let parsed: SkillsResponse =
            parse_json_content("```json\n{\"skills\": [\"Kafka\", \"gRPC\"]}\n```").unwrap();
        assert_eq!(parsed.skills, vec!["Kafka", "gRPC"]);
    }

    #[test]
    fn test_skills_response_missing_key_is_empty() {
        let parsed: SkillsResponse = parse_json_content("{}").unwrap();
        assert!(parsed.skills.is_empty());
    }

    #[tokio::test]
    async fn test_blank_text_skips_remote_call() {
        // No API key: any remote attempt would fail, so success proves no call was made.
        let skills = extractor(None)
            .extract_skills(" \n\t ", &CancellationToken::new())
            .await
            .unwrap();
        assert!(skills.is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_remote_failure() {
        let err = extractor(None)
            .extract_skills("Rust developer", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::RemoteExtractionFailed(_)));
    }
}
