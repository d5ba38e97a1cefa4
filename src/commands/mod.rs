pub mod platforms;
pub mod settings;
pub mod studio;

use crate::attachments::AttachmentError;
use crate::config::Config;
use crate::db::Database;
use crate::llm::client::ModelSet;
use crate::llm::gemini::{GeminiConfig, GeminiProvider, DEFAULT_BASE_URL};
use crate::llm::GenerationClient;
use crate::pipeline::{Pipeline, PipelineError, FAILURE_MESSAGE};
use crate::share::ShareError;
use crate::store::StoreError;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("no Gemini API key: set GEMINI_API_KEY or the gemini_api_key setting")]
    MissingApiKey,
    #[error("unknown setting key: {0}")]
    UnknownSetting(String),
    #[error("no result with id {0}")]
    ResultNotFound(String),
    #[error("{}", FAILURE_MESSAGE)]
    GenerationFailed,
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Pipeline(PipelineError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Share(#[from] ShareError),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl From<PipelineError> for CommandError {
    /// Stage failures reach the user only as the generic message; the cause is in the log.
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Stage { .. } => CommandError::GenerationFailed,
            other => CommandError::Pipeline(other),
        }
    }
}

impl Serialize for CommandError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

fn env_or_setting(
    value: &Option<String>,
    db: &Database,
    key: &str,
) -> Result<Option<String>, CommandError> {
    match value {
        Some(v) => Ok(Some(v.clone())),
        None => Ok(db.get_setting(key)?.filter(|v| !v.trim().is_empty())),
    }
}

/// Provider credentials and model names: environment first, then the settings table,
/// then built-in defaults. Only the API key has no default.
pub fn resolve_gemini(
    config: &Config,
    db: &Database,
) -> Result<(GeminiConfig, ModelSet), CommandError> {
    let api_key =
        env_or_setting(&config.api_key, db, "gemini_api_key")?.ok_or(CommandError::MissingApiKey)?;
    let base_url = env_or_setting(&config.base_url, db, "gemini_base_url")?
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let defaults = ModelSet::default();
    let models = ModelSet {
        text: env_or_setting(&config.text_model, db, "text_model")?.unwrap_or(defaults.text),
        image: env_or_setting(&config.image_model, db, "image_model")?.unwrap_or(defaults.image),
    };
    Ok((GeminiConfig { api_key, base_url }, models))
}

pub fn open_pipeline(config: &Config, db: &Database) -> Result<Pipeline, CommandError> {
    let (gemini, models) = resolve_gemini(config, db)?;
    tracing::debug!(base_url = %gemini.base_url, text = %models.text, image = %models.image, "using Gemini");
    let provider = GeminiProvider::new(gemini, config.http_timeout);
    let client = GenerationClient::new(Arc::new(provider), models);
    Ok(Pipeline::new(client, config.stage_timeout))
}
