//! Hybrid CV skill extractor: taxonomy match first, LLM per policy, then merge.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::extraction::llm::LlmSkillExtractor;
use crate::extraction::text::TextExtractorRegistry;
use crate::extraction::{CvSkillExtractor, ExtractionError};
use crate::settings::repository::SettingsRepository;
use crate::taxonomy::matcher::normalize_text;
use crate::taxonomy::Taxonomy;

pub struct HybridSkillExtractor {
    text_extractors: Arc<TextExtractorRegistry>,
    taxonomy: Arc<Taxonomy>,
    llm: Arc<dyn LlmSkillExtractor>,
    settings: Arc<dyn SettingsRepository>,
}

impl HybridSkillExtractor {
    pub fn new(
        text_extractors: Arc<TextExtractorRegistry>,
        taxonomy: Arc<Taxonomy>,
        llm: Arc<dyn LlmSkillExtractor>,
        settings: Arc<dyn SettingsRepository>,
    ) -> Self {
        Self {
            text_extractors,
            taxonomy,
            llm,
            settings,
        }
    }
}

#[async_trait]
impl CvSkillExtractor for HybridSkillExtractor {
    /// Pipeline: resolve extractor -> extract text -> normalize -> taxonomy
    /// match -> read policy -> optional LLM call -> merge.
    ///
    /// An LLM failure fails the whole call even when taxonomy matches exist.
    async fn extract_skills(
        &self,
        file: Bytes,
        file_name: &str,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExtractionError> {
        info!(file_name, content_type, "Starting skill extraction");

        let extractor = self
            .text_extractors
            .get_extractor(content_type)
            .ok_or_else(|| ExtractionError::UnsupportedContentType(content_type.to_string()))?;

        let cv_text = extractor.extract_text(file, content_type).await?;
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        if cv_text.trim().is_empty() {
            warn!(file_name, "Extracted text is empty");
            return Ok(Vec::new());
        }

        let normalized = normalize_text(&cv_text);
        let taxonomy_matches = self.taxonomy.matcher().find_matches(&normalized);
        info!(count = taxonomy_matches.len(), "Taxonomy matched skills");

        let policy = self
            .settings
            .extraction_policy()
            .await
            .map_err(ExtractionError::SettingsUnavailable)?;

        let llm_skills = if policy.should_call_llm(taxonomy_matches.len()) {
            let skills = self.llm.extract_skills(&cv_text, cancel).await?;
            info!(count = skills.len(), "LLM extracted skills");
            skills
        } else {
            info!("Skipping LLM extraction: fallback-only policy and taxonomy found skills");
            Vec::new()
        };

        let skills = merge_skills(taxonomy_matches, llm_skills);
        info!(count = skills.len(), file_name, "Total unique skills extracted");
        Ok(skills)
    }
}

/// Trims, drops blanks, removes case-insensitive duplicates (first casing wins,
/// taxonomy names come first) and sorts case-insensitively.
///
/// Only spelling-level duplicates collapse: "C#" from the taxonomy and
/// "CSharp" from the LLM both survive.
pub fn merge_skills(
    taxonomy_matches: impl IntoIterator<Item = String>,
    llm_skills: impl IntoIterator<Item = String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged: Vec<String> = taxonomy_matches
        .into_iter()
        .chain(llm_skills)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect();

    merged.sort_by_cached_key(|s| s.to_lowercase());
    merged
}
