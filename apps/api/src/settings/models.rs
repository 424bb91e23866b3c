use serde::{Deserialize, Serialize};

use crate::extraction::policy::ExtractionPolicy;
use crate::taxonomy::TaxonomySkill;

/// Models an operator may select for LLM skill extraction.
pub const AVAILABLE_MODELS: &[&str] = &["llama-3.3-70b-versatile", "llama-3.1-8b-instant"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSettings {
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct LlmSettingsView {
    pub model: String,
    pub available_models: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub skill_extraction: ExtractionPolicy,
    pub llm: LlmSettingsView,
}

impl SettingsResponse {
    pub fn new(policy: ExtractionPolicy, llm: LlmSettings) -> Self {
        Self {
            skill_extraction: policy,
            llm: LlmSettingsView {
                model: llm.model,
                available_models: AVAILABLE_MODELS.iter().map(|m| m.to_string()).collect(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub skill_extraction: ExtractionPolicy,
    pub llm: LlmSettings,
}

#[derive(Debug, Serialize)]
pub struct TaxonomyResponse {
    pub skills: Vec<TaxonomySkill>,
}
