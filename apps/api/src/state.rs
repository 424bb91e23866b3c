use std::sync::Arc;

use crate::config::Config;
use crate::extraction::text::TextExtractorRegistry;
use crate::extraction::CvSkillExtractor;
use crate::profiles::repository::ProfileRepository;
use crate::settings::repository::SettingsRepository;
use crate::taxonomy::Taxonomy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<dyn ProfileRepository>,
    /// Runtime settings. The extractor holds the same store and re-reads it per call.
    pub settings: Arc<dyn SettingsRepository>,
    pub taxonomy: Arc<Taxonomy>,
    /// Same registry the extractor dispatches on; upload validation accepts
    /// only the formats it can extract.
    pub text_extractors: Arc<TextExtractorRegistry>,
    /// Pluggable CV skill extractor. Default: HybridSkillExtractor.
    pub extractor: Arc<dyn CvSkillExtractor>,
    pub config: Config,
}

#[cfg(test)]
impl AppState {
    /// In-memory state around the bundled taxonomy and the given extractor.
    pub fn for_tests(extractor: Arc<dyn CvSkillExtractor>) -> Self {
        Self::for_tests_with_registry(extractor, TextExtractorRegistry::with_defaults())
    }

    pub fn for_tests_with_registry(
        extractor: Arc<dyn CvSkillExtractor>,
        text_extractors: TextExtractorRegistry,
    ) -> Self {
        use crate::config::DEFAULT_GROQ_MODEL;
        use crate::extraction::policy::ExtractionPolicy;
        use crate::profiles::repository::{seed_profiles, InMemoryProfileRepository};
        use crate::settings::models::LlmSettings;
        use crate::settings::repository::InMemorySettingsRepository;

        let taxonomy = Taxonomy::from_json(include_str!("../data/skills-taxonomy.json"))
            .expect("bundled taxonomy is valid");
        AppState {
            profiles: Arc::new(InMemoryProfileRepository::new(seed_profiles().unwrap())),
            settings: Arc::new(InMemorySettingsRepository::new(
                ExtractionPolicy::default(),
                LlmSettings {
                    model: DEFAULT_GROQ_MODEL.to_string(),
                },
            )),
            taxonomy: Arc::new(taxonomy),
            text_extractors: Arc::new(text_extractors),
            extractor,
            config: Config::for_tests(),
        }
    }
}
