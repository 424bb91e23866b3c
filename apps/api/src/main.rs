mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod profiles;
mod routes;
mod settings;
mod state;
mod taxonomy;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::hybrid::HybridSkillExtractor;
use crate::extraction::llm::GroqSkillExtractor;
use crate::extraction::policy::ExtractionPolicy;
use crate::extraction::text::TextExtractorRegistry;
use crate::llm_client::LlmClient;
use crate::profiles::repository::{
    seed_profiles, InMemoryProfileRepository, PgProfileRepository, ProfileRepository,
};
use crate::routes::build_router;
use crate::settings::models::LlmSettings;
use crate::settings::repository::{
    snapshot, InMemorySettingsRepository, PgSettingsRepository, SettingsRepository,
};
use crate::state::AppState;
use crate::taxonomy::Taxonomy;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Skills API v{}", env!("CARGO_PKG_VERSION"));

    // Load the skills taxonomy; an invalid file is fatal
    let taxonomy = Arc::new(Taxonomy::load(&config.taxonomy_path)?);

    // Initialize profile and settings stores
    let default_policy = ExtractionPolicy {
        llm_fallback_only: config.llm_fallback_only,
    };
    let default_llm = LlmSettings {
        model: config.groq.model.clone(),
    };
    let (profiles, settings): (Arc<dyn ProfileRepository>, Arc<dyn SettingsRepository>) =
        match &config.database_url {
            Some(url) => {
                let db = create_pool(url).await?;
                (
                    Arc::new(PgProfileRepository::new(db.clone())),
                    Arc::new(PgSettingsRepository::new(db, default_policy, default_llm)),
                )
            }
            None => {
                info!("DATABASE_URL not set, using in-memory stores");
                (
                    Arc::new(InMemoryProfileRepository::new(seed_profiles()?)),
                    Arc::new(InMemorySettingsRepository::new(default_policy, default_llm)),
                )
            }
        };
    info!(settings = ?snapshot(settings.as_ref()).await?, "Runtime settings loaded");

    // Initialize LLM client
    let llm = LlmClient::new(&config.groq)?;
    if config.groq.api_key.is_none() {
        info!("GROQ_API_KEY not set, LLM skill extraction calls will fail");
    }

    // Wire the hybrid extractor: text extraction -> taxonomy -> optional LLM
    let text_extractors = Arc::new(TextExtractorRegistry::with_defaults());
    info!(content_types = ?text_extractors.supported_types(), "Text extractors registered");
    let extractor = Arc::new(HybridSkillExtractor::new(
        text_extractors.clone(),
        taxonomy.clone(),
        Arc::new(GroqSkillExtractor::new(llm, settings.clone())),
        settings.clone(),
    ));

    // Build app state
    let state = AppState {
        profiles,
        settings,
        taxonomy,
        text_extractors,
        extractor,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
