use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::profiles::models::{CvPreviewResponse, EmployeeProfile, UpdateSkillsRequest};
use crate::profiles::validation::{normalize_skills, validate_skills, validate_upload};
use crate::state::AppState;

/// Multipart field carrying the CV.
const CV_FILE_FIELD: &str = "cv_file";

struct Upload {
    file_name: String,
    content_type: String,
    data: Bytes,
}

/// GET /api/v1/profiles
pub async fn handle_list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<EmployeeProfile>>, AppError> {
    Ok(Json(state.profiles.list().await?))
}

/// GET /api/v1/profiles/:id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmployeeProfile>, AppError> {
    let profile = state
        .profiles
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))?;
    Ok(Json(profile))
}

/// POST /api/v1/profiles/:id/cv/preview
/// Extracts skills from the uploaded CV without saving anything.
pub async fn handle_cv_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<CvPreviewResponse>, AppError> {
    let upload = read_cv_upload(multipart).await?;

    if state.profiles.get(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Profile {id} not found")));
    }

    let upload = upload.ok_or_else(|| AppError::Validation("A CV file is required.".into()))?;
    let content_type = validate_upload(
        &upload.file_name,
        &upload.content_type,
        upload.data.len(),
        state.config.max_upload_bytes,
        &state.text_extractors,
    )
    .map_err(AppError::Validation)?;

    info!(
        profile_id = %id,
        file_name = %upload.file_name,
        content_type,
        bytes = upload.data.len(),
        "CV preview requested"
    );

    // Dropping the request future (client went away) cancels the extraction.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let extracted_skills = state
        .extractor
        .extract_skills(upload.data, &upload.file_name, content_type, &cancel)
        .await?;

    Ok(Json(CvPreviewResponse {
        file_name: upload.file_name,
        extracted_skills,
    }))
}

/// PUT /api/v1/profiles/:id/skills
pub async fn handle_update_skills(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSkillsRequest>,
) -> Result<Json<EmployeeProfile>, AppError> {
    validate_skills(&req.skills).map_err(AppError::Validation)?;

    let skills = normalize_skills(req.skills);
    let updated = state
        .profiles
        .update_skills(id, skills)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))?;

    info!(profile_id = %id, count = updated.skills.len(), "Profile skills updated");
    Ok(Json(updated))
}

async fn read_cv_upload(mut multipart: Multipart) -> Result<Option<Upload>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some(CV_FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        upload = Some(Upload {
            file_name,
            content_type,
            data,
        });
    }
    Ok(upload)
}
