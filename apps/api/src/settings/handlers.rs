use axum::{extract::State, Json};
use tracing::info;

use crate::errors::AppError;
use crate::settings::models::{
    LlmSettings, SettingsResponse, TaxonomyResponse, UpdateSettingsRequest, AVAILABLE_MODELS,
};
use crate::state::AppState;

/// GET /api/v1/settings
pub async fn handle_get_settings(
    State(state): State<AppState>,
) -> Result<Json<SettingsResponse>, AppError> {
    let policy = state.settings.extraction_policy().await?;
    let llm = state.settings.llm_settings().await?;
    Ok(Json(SettingsResponse::new(policy, llm)))
}

/// PUT /api/v1/settings
/// Takes effect on the next extraction; nothing is cached.
pub async fn handle_update_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, AppError> {
    let model = req.llm.model.trim().to_string();
    if !AVAILABLE_MODELS.contains(&model.as_str()) {
        return Err(AppError::Validation(format!(
            "Model must be one of: {}",
            AVAILABLE_MODELS.join(", ")
        )));
    }
    let llm = LlmSettings { model };

    state
        .settings
        .update_settings(req.skill_extraction, llm.clone())
        .await?;

    info!(
        llm_fallback_only = req.skill_extraction.llm_fallback_only,
        model = %llm.model,
        "Settings updated"
    );
    Ok(Json(SettingsResponse::new(req.skill_extraction, llm)))
}

/// GET /api/v1/settings/taxonomy
pub async fn handle_get_taxonomy(State(state): State<AppState>) -> Json<TaxonomyResponse> {
    Json(TaxonomyResponse {
        skills: state.taxonomy.skills().to_vec(),
    })
}
