use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::extraction::policy::ExtractionPolicy;
use crate::settings::models::LlmSettings;

const LLM_FALLBACK_ONLY_KEY: &str = "SkillExtraction:LlmFallbackOnly";
const LLM_MODEL_KEY: &str = "Llm:Model";

/// Source of runtime settings. Every read returns the current stored value;
/// callers must not cache it.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn extraction_policy(&self) -> Result<ExtractionPolicy>;
    async fn llm_settings(&self) -> Result<LlmSettings>;
    /// Stores the policy and the LLM settings together: either both are
    /// visible to the next read or neither is.
    async fn update_settings(&self, policy: ExtractionPolicy, llm: LlmSettings) -> Result<()>;
}

struct StoredSettings {
    policy: ExtractionPolicy,
    llm: LlmSettings,
}

/// Process-local settings, initialised from configuration.
pub struct InMemorySettingsRepository {
    inner: RwLock<StoredSettings>,
}

impl InMemorySettingsRepository {
    pub fn new(policy: ExtractionPolicy, llm: LlmSettings) -> Self {
        Self {
            inner: RwLock::new(StoredSettings { policy, llm }),
        }
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn extraction_policy(&self) -> Result<ExtractionPolicy> {
        Ok(self.inner.read().await.policy)
    }

    async fn llm_settings(&self) -> Result<LlmSettings> {
        Ok(self.inner.read().await.llm.clone())
    }

    async fn update_settings(&self, policy: ExtractionPolicy, llm: LlmSettings) -> Result<()> {
        *self.inner.write().await = StoredSettings { policy, llm };
        Ok(())
    }
}

/// Key/value settings persisted in the `application_settings` table.
/// Missing keys fall back to the defaults supplied at construction.
pub struct PgSettingsRepository {
    pool: PgPool,
    default_policy: ExtractionPolicy,
    default_llm: LlmSettings,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool, default_policy: ExtractionPolicy, default_llm: LlmSettings) -> Self {
        Self {
            pool,
            default_policy,
            default_llm,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM application_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn upsert(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        key: &str,
        value: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO application_settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn extraction_policy(&self) -> Result<ExtractionPolicy> {
        let stored = self.get(LLM_FALLBACK_ONLY_KEY).await?;
        Ok(ExtractionPolicy {
            llm_fallback_only: parse_bool(stored.as_deref(), self.default_policy.llm_fallback_only),
        })
    }

    async fn llm_settings(&self) -> Result<LlmSettings> {
        let model = self
            .get(LLM_MODEL_KEY)
            .await?
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_llm.model.clone());
        Ok(LlmSettings { model })
    }

    async fn update_settings(&self, policy: ExtractionPolicy, llm: LlmSettings) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::upsert(&mut tx, LLM_FALLBACK_ONLY_KEY, &policy.llm_fallback_only.to_string()).await?;
        Self::upsert(&mut tx, LLM_MODEL_KEY, &llm.model).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Lenient boolean parse for stored values; anything unrecognised yields `default`.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if v == "true" => true,
        Some(v) if v == "false" => false,
        _ => default,
    }
}

/// Builds a key/value view of the current settings, for diagnostics.
pub async fn snapshot(repo: &dyn SettingsRepository) -> Result<HashMap<&'static str, String>> {
    let policy = repo.extraction_policy().await?;
    let llm = repo.llm_settings().await?;
    Ok(HashMap::from([
        (LLM_FALLBACK_ONLY_KEY, policy.llm_fallback_only.to_string()),
        (LLM_MODEL_KEY, llm.model),
    ]))
}
