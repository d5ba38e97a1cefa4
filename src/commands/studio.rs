use super::CommandError;
use crate::attachments;
use crate::db::models::{DesignStyle, GenerationResult, TargetSize};
use crate::pipeline::{GenerationRequest, Pipeline, PipelineState, StageEvent};
use crate::store::ResultStore;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct StudioInput {
    pub topic: String,
    pub instructions: Option<String>,
    pub reference: Option<PathBuf>,
    pub context: Vec<PathBuf>,
    pub target_size: TargetSize,
    pub styles: Vec<DesignStyle>,
}

/// Turn raw user input into a pipeline request. Unreadable files are skipped with a
/// warning; a readable reference that is not an image is refused.
pub async fn prepare_request(input: StudioInput) -> Result<GenerationRequest, CommandError> {
    let mut request = GenerationRequest::new(input.topic);
    request.freeform_instructions = input.instructions.unwrap_or_default();
    request.target_size = input.target_size;
    if !input.styles.is_empty() {
        request.set_styles(input.styles);
    }

    if let Some(path) = input.reference {
        match attachments::read_attachment(&path).await {
            Ok(attachment) => request.set_reference(attachment)?,
            Err(e) => tracing::warn!(error = %e, "skipping reference image"),
        }
    }

    request.context_attachments = attachments::read_attachments(&input.context).await;
    Ok(request)
}

/// Run the pipeline. `request` is cleared on success and kept for retry on failure.
pub async fn generate(
    pipeline: &mut Pipeline,
    store: &mut ResultStore,
    request: &mut GenerationRequest,
    on_progress: impl Fn(PipelineState, &StageEvent),
) -> Result<GenerationResult, CommandError> {
    Ok(pipeline.run(request, store, on_progress).await?)
}

pub fn list_results(store: &ResultStore) -> Vec<GenerationResult> {
    store.list().to_vec()
}

pub fn get_result(store: &ResultStore, id: &str) -> Result<GenerationResult, CommandError> {
    store
        .get(id)
        .cloned()
        .ok_or_else(|| CommandError::ResultNotFound(id.to_string()))
}

pub fn delete_result(store: &mut ResultStore, id: &str) -> Result<GenerationResult, CommandError> {
    Ok(store.remove(id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::AttachmentKind;
    use crate::db::Database;
    use crate::llm::client::ModelSet;
    use crate::llm::fake::{happy_response, Call, FakeProvider};
    use crate::llm::{GenerateResponse, GenerationClient};
    use crate::pipeline::{PipelineError, DEFAULT_STAGE_TIMEOUT};
    use crate::store::StoreError;
    use std::sync::Arc;

    fn write(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_prepare_reads_reference_and_context() {
        let dir = tempfile::tempdir().unwrap();
        let input = StudioInput {
            topic: "Launch".into(),
            instructions: Some("mention the date".into()),
            reference: Some(write(&dir, "look.png", b"png")),
            context: vec![
                write(&dir, "brief.pdf", b"%PDF"),
                dir.path().join("missing.docx"),
            ],
            target_size: TargetSize::PortraitTall,
            styles: vec![DesignStyle::Retro, DesignStyle::Retro, DesignStyle::Vibrant],
        };

        let request = prepare_request(input).await.unwrap();
        assert_eq!(request.topic, "Launch");
        assert_eq!(request.freeform_instructions, "mention the date");
        assert_eq!(request.reference_attachment.unwrap().kind, AttachmentKind::Image);
        assert_eq!(request.context_attachments.len(), 1);
        assert_eq!(request.context_attachments[0].kind, AttachmentKind::Pdf);
        assert_eq!(request.target_styles, vec![DesignStyle::Retro, DesignStyle::Vibrant]);
    }

    #[tokio::test]
    async fn test_prepare_keeps_default_style() {
        let request = prepare_request(StudioInput {
            topic: "x".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(request.target_styles, vec![DesignStyle::Realistic]);
        assert_eq!(request.target_size, TargetSize::Square);
    }

    #[tokio::test]
    async fn test_prepare_refuses_document_as_reference() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare_request(StudioInput {
            topic: "x".into(),
            reference: Some(write(&dir, "notes.txt", b"hi")),
            ..Default::default()
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Pipeline(PipelineError::ReferenceNotImage(name)) if name == "notes.txt"
        ));
    }

    #[tokio::test]
    async fn test_generate_failure_reports_generic_message() {
        let fake = Arc::new(FakeProvider::new(|call, request| match call {
            Call::Image => Ok(GenerateResponse::from_text("sorry")),
            other => happy_response(other, request),
        }));
        let mut pipeline = Pipeline::new(
            GenerationClient::new(fake, ModelSet::default()),
            DEFAULT_STAGE_TIMEOUT,
        );
        let mut store = ResultStore::open(Database::open_in_memory().unwrap());
        let mut request = GenerationRequest::new("Launch day");

        let err = generate(&mut pipeline, &mut store, &mut request, |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::GenerationFailed));
        assert_eq!(request.topic, "Launch day");
        assert!(list_results(&store).is_empty());
    }

    #[tokio::test]
    async fn test_generate_then_get_and_delete() {
        let fake = Arc::new(FakeProvider::happy());
        let mut pipeline = Pipeline::new(
            GenerationClient::new(fake, ModelSet::default()),
            DEFAULT_STAGE_TIMEOUT,
        );
        let mut store = ResultStore::open(Database::open_in_memory().unwrap());
        let mut request = GenerationRequest::new("Launch day");

        let result = generate(&mut pipeline, &mut store, &mut request, |_, _| {})
            .await
            .unwrap();
        assert_eq!(get_result(&store, &result.id).unwrap(), result);
        assert_eq!(delete_result(&mut store, &result.id).unwrap().id, result.id);
        assert!(matches!(
            get_result(&store, &result.id),
            Err(CommandError::ResultNotFound(_))
        ));
        assert!(matches!(
            delete_result(&mut store, &result.id),
            Err(CommandError::Store(StoreError::ResultNotFound(_)))
        ));
    }
}
