// Hybrid skill extraction: uploaded CV bytes -> canonical, deduplicated skill list.
// Taxonomy matching always runs; the LLM is consulted according to the
// runtime extraction policy. All LLM calls go through llm_client.

pub mod hybrid;
pub mod llm;
pub mod policy;
pub mod prompts;
pub mod text;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::extraction::text::TextExtractionError;
use crate::llm_client::LlmError;

/// Failure of one extraction call, identifying the stage that failed.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Content type '{0}' is not supported")]
    UnsupportedContentType(String),

    #[error("Text extraction failed: {0}")]
    TextExtractionFailed(#[source] TextExtractionError),

    #[error("Remote skill extraction failed: {0}")]
    RemoteExtractionFailed(#[source] LlmError),

    #[error("Runtime settings could not be read: {0}")]
    SettingsUnavailable(#[source] anyhow::Error),

    #[error("Extraction was cancelled")]
    Cancelled,
}

impl From<LlmError> for ExtractionError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Cancelled => ExtractionError::Cancelled,
            other => ExtractionError::RemoteExtractionFailed(other),
        }
    }
}

impl From<TextExtractionError> for ExtractionError {
    fn from(err: TextExtractionError) -> Self {
        match err {
            TextExtractionError::Unsupported(content_type) => {
                ExtractionError::UnsupportedContentType(content_type)
            }
            other => ExtractionError::TextExtractionFailed(other),
        }
    }
}

/// Entry point consumed by the HTTP layer. Carried in `AppState` as
/// `Arc<dyn CvSkillExtractor>` so handlers can be exercised with a stub.
#[async_trait]
pub trait CvSkillExtractor: Send + Sync {
    async fn extract_skills(
        &self,
        file: Bytes,
        file_name: &str,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExtractionError>;
}
