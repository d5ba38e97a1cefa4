//! Four-stage generation run: correct → research (+ template suggestions) → caption → render.
//!
//! Stages run strictly in order because each one feeds the next. Every stage appends one
//! pending [`StageEvent`] before it starts and resolves it when it ends. A failing stage
//! moves the run to [`PipelineState::Failed`] and leaves the caller's
//! [`GenerationRequest`] untouched so the same input can be retried.

pub mod activity;

use crate::attachments::{Attachment, AttachmentKind};
use crate::db::models::{DesignStyle, GenerationResult, TargetSize};
use crate::llm::{GenerationClient, ProviderError};
use crate::store::ResultStore;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;

pub use activity::{ActivityLog, StageEvent, StageStatus};

/// The only failure text shown to the user; details go to the log.
pub const FAILURE_MESSAGE: &str = "Asset generation failed.";
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Correcting,
    Researching,
    Captioning,
    Rendering,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn is_running(self) -> bool {
        matches!(
            self,
            PipelineState::Correcting
                | PipelineState::Researching
                | PipelineState::Captioning
                | PipelineState::Rendering
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Correcting => "correcting",
            PipelineState::Researching => "researching",
            PipelineState::Captioning => "captioning",
            PipelineState::Rendering => "rendering",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("no response within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("a generation run is already in progress")]
    AlreadyRunning,
    #[error("topic must not be blank")]
    BlankTopic,
    #[error("at least one design style must be selected")]
    NoStyles,
    #[error("reference attachment {0} is not an image")]
    ReferenceNotImage(String),
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: PipelineState,
        #[source]
        source: StageError,
    },
}

/// The user's working input for the next run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub freeform_instructions: String,
    pub reference_attachment: Option<Attachment>,
    pub context_attachments: Vec<Attachment>,
    pub target_size: TargetSize,
    pub target_styles: Vec<DesignStyle>,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            topic: String::new(),
            freeform_instructions: String::new(),
            reference_attachment: None,
            context_attachments: Vec::new(),
            target_size: TargetSize::default(),
            target_styles: vec![DesignStyle::default()],
        }
    }
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn set_reference(&mut self, attachment: Attachment) -> Result<(), PipelineError> {
        if attachment.kind != AttachmentKind::Image {
            return Err(PipelineError::ReferenceNotImage(attachment.display_name));
        }
        self.reference_attachment = Some(attachment);
        Ok(())
    }

    pub fn remove_context(&mut self, id: &str) -> bool {
        let before = self.context_attachments.len();
        self.context_attachments.retain(|a| a.id != id);
        self.context_attachments.len() != before
    }

    /// Styles deduplicated, selection order kept.
    pub fn set_styles(&mut self, styles: impl IntoIterator<Item = DesignStyle>) {
        self.target_styles.clear();
        for style in styles {
            if !self.target_styles.contains(&style) {
                self.target_styles.push(style);
            }
        }
    }

    fn instructions(&self) -> Option<&str> {
        let trimmed = self.freeform_instructions.trim();
        (!trimmed.is_empty()).then_some(self.freeform_instructions.as_str())
    }

    /// Reference first, then context files in their current order.
    fn all_attachments(&self) -> Vec<Attachment> {
        self.reference_attachment
            .iter()
            .chain(self.context_attachments.iter())
            .cloned()
            .collect()
    }

    /// Topic, instructions and attachments are reset; size and styles stay selected.
    pub fn clear(&mut self) {
        self.topic.clear();
        self.freeform_instructions.clear();
        self.reference_attachment = None;
        self.context_attachments.clear();
    }
}

pub struct Pipeline {
    client: GenerationClient,
    stage_timeout: Duration,
    state: PipelineState,
    activity: ActivityLog,
    error: Option<String>,
}

impl Pipeline {
    pub fn new(client: GenerationClient, stage_timeout: Duration) -> Self {
        Self {
            client,
            stage_timeout,
            state: PipelineState::Idle,
            activity: ActivityLog::default(),
            error: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn activity(&self) -> &[StageEvent] {
        self.activity.events()
    }

    /// User-facing message of the last failed run.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Return to `Idle` after a run future was dropped mid-stage.
    pub fn reset(&mut self) {
        self.state = PipelineState::Idle;
        self.activity.clear();
        self.error = None;
    }

    /// Execute one full run. On success the new result has been prepended to `store`
    /// and `request` is cleared; on failure neither is changed beyond the text
    /// correction of the first stage.
    pub async fn run<F>(
        &mut self,
        request: &mut GenerationRequest,
        store: &mut ResultStore,
        on_progress: F,
    ) -> Result<GenerationResult, PipelineError>
    where
        F: Fn(PipelineState, &StageEvent),
    {
        if self.state.is_running() {
            return Err(PipelineError::AlreadyRunning);
        }
        if request.topic.trim().is_empty() {
            return Err(PipelineError::BlankTopic);
        }
        if request.target_styles.is_empty() {
            return Err(PipelineError::NoStyles);
        }

        self.state = PipelineState::Idle;
        self.activity.clear();
        self.error = None;

        match self.execute(request, store, &on_progress).await {
            Ok(result) => {
                request.clear();
                self.activity.clear();
                self.state = PipelineState::Completed;
                tracing::info!(id = %result.id, "generation run completed");
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, "generation run failed");
                if let Some(event) = self.activity.resolve_last(StageStatus::Error) {
                    on_progress(PipelineState::Failed, event);
                }
                self.state = PipelineState::Failed;
                self.error = Some(FAILURE_MESSAGE.to_string());
                Err(e)
            }
        }
    }

    async fn execute<F>(
        &mut self,
        request: &mut GenerationRequest,
        store: &mut ResultStore,
        on_progress: &F,
    ) -> Result<GenerationResult, PipelineError>
    where
        F: Fn(PipelineState, &StageEvent),
    {
        let client = self.client.clone();
        let limit = self.stage_timeout;
        let attachments = request.all_attachments();
        let styles = request.target_styles.clone();
        let size = request.target_size;

        let raw_topic = request.topic.clone();
        let raw_instructions = request.instructions().map(str::to_string);
        let (topic, instructions) = self
            .stage(
                PipelineState::Correcting,
                "Initializing studio tools...".to_string(),
                on_progress,
                bounded(limit, async {
                    let topic = client.correct_text(&raw_topic).await?;
                    let instructions = match &raw_instructions {
                        Some(text) => Some(client.correct_text(text).await?),
                        None => None,
                    };
                    Ok::<_, ProviderError>((topic, instructions))
                }),
            )
            .await?;
        request.topic = topic.clone();
        request.freeform_instructions = instructions.clone().unwrap_or_default();
        let instructions = instructions.filter(|text| !text.trim().is_empty());

        let (research, templates) = self
            .stage(
                PipelineState::Researching,
                format!(
                    "Researching trends with {} source files...",
                    request.context_attachments.len()
                ),
                on_progress,
                async {
                    // A stalled suggestion call degrades to an empty list.
                    let templates = async {
                        tokio::time::timeout(limit, client.suggest_templates(&topic, &styles))
                            .await
                            .unwrap_or_else(|_| {
                                tracing::warn!(?limit, "template suggestions timed out");
                                Vec::new()
                            })
                    };
                    let (research, templates) = futures::join!(
                        bounded(
                            limit,
                            client.research_topic(&topic, instructions.as_deref(), &attachments)
                        ),
                        templates,
                    );
                    Ok::<_, StageError>((research?, templates))
                },
            )
            .await?;

        let captions = self
            .stage(
                PipelineState::Captioning,
                "Crafting high-engagement copy...".to_string(),
                on_progress,
                bounded(limit, async {
                    Ok::<_, ProviderError>(
                        client
                            .generate_captions(&topic, &research.summary, instructions.as_deref())
                            .await,
                    )
                }),
            )
            .await?;

        let has_visual_guide = attachments.iter().any(|a| a.kind == AttachmentKind::Image);
        let image_uri = self
            .stage(
                PipelineState::Rendering,
                if has_visual_guide {
                    "Rendering with vision guide..."
                } else {
                    "Rendering AI visual..."
                }
                .to_string(),
                on_progress,
                bounded(
                    limit,
                    client.generate_image(
                        &topic,
                        &styles,
                        size,
                        instructions.as_deref(),
                        &attachments,
                    ),
                ),
            )
            .await?;

        let mut id = uuid::Uuid::new_v4().to_string();
        while store.contains(&id) {
            id = uuid::Uuid::new_v4().to_string();
        }
        let result = GenerationResult {
            id,
            topic,
            freeform_instructions: instructions,
            caption: captions.caption,
            hashtags: captions.hashtags,
            image_uri,
            target_size: size,
            target_styles: styles,
            grounding_sources: research.sources,
            template_suggestions: templates,
            created_at_epoch_millis: chrono::Utc::now().timestamp_millis(),
        };

        if let Err(e) = store.append(result.clone()) {
            tracing::warn!(error = %e, "result kept in memory but could not be persisted");
        }
        Ok(result)
    }

    async fn stage<T, F, Fut>(
        &mut self,
        state: PipelineState,
        message: String,
        on_progress: &F,
        work: Fut,
    ) -> Result<T, PipelineError>
    where
        F: Fn(PipelineState, &StageEvent),
        Fut: Future<Output = Result<T, StageError>>,
    {
        self.state = state;
        on_progress(state, self.activity.begin(message));
        tracing::info!(stage = %state, "stage started");

        match work.await {
            Ok(output) => {
                if let Some(event) = self.activity.resolve_last(StageStatus::Success) {
                    on_progress(state, event);
                }
                tracing::info!(stage = %state, "stage finished");
                Ok(output)
            }
            Err(source) => Err(PipelineError::Stage {
                stage: state,
                source,
            }),
        }
    }
}

/// Run one provider call under `limit`.
async fn bounded<T>(
    limit: Duration,
    work: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, StageError> {
    match tokio::time::timeout(limit, work).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(StageError::TimedOut(limit)),
    }
}
