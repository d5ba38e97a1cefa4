use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};

/// How the provider may consume an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Document,
    Other,
}

impl AttachmentKind {
    /// Images and PDFs can travel as inline binary parts; everything else is referenced by name.
    pub fn is_inline(self) -> bool {
        matches!(self, AttachmentKind::Image | AttachmentKind::Pdf)
    }
}

/// A user file, read and base64-encoded once, consumed by one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub display_name: String,
    pub mime_type: String,
    pub encoded_payload: String,
    pub kind: AttachmentKind,
}

impl Attachment {
    pub fn from_bytes(display_name: &str, mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            mime_type: mime_type.to_string(),
            encoded_payload: BASE64.encode(bytes),
            kind: classify(mime_type, display_name),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a regular file")]
    NotAFile(PathBuf),
}

/// Classify from the declared MIME type, falling back to the office-document extensions.
pub fn classify(mime_type: &str, file_name: &str) -> AttachmentKind {
    let mime = mime_type.trim().to_ascii_lowercase();
    if mime.starts_with("image/") {
        return AttachmentKind::Image;
    }
    if mime == "application/pdf" {
        return AttachmentKind::Pdf;
    }
    match extension(Path::new(file_name)).as_str() {
        "doc" | "docx" | "ppt" | "pptx" | "xls" | "xlsx" => AttachmentKind::Document,
        _ => AttachmentKind::Other,
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Declared MIME type for a local file, the way a browser file picker would report it.
pub fn mime_for_path(path: &Path) -> &'static str {
    match extension(path).as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Read one file into an [`Attachment`].
pub async fn read_attachment(path: &Path) -> Result<Attachment, AttachmentError> {
    let io_err = |source| AttachmentError::Io {
        path: path.to_path_buf(),
        source,
    };
    let meta = tokio::fs::metadata(path).await.map_err(io_err)?;
    if !meta.is_file() {
        return Err(AttachmentError::NotAFile(path.to_path_buf()));
    }
    let bytes = tokio::fs::read(path).await.map_err(io_err)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    let attachment = Attachment::from_bytes(name, mime_for_path(path), &bytes);
    tracing::debug!(
        name = %attachment.display_name,
        kind = ?attachment.kind,
        size = bytes.len(),
        "attachment normalized"
    );
    Ok(attachment)
}

/// Read several files concurrently. Results arrive in completion order, not input order;
/// unreadable files are logged and skipped.
pub async fn read_attachments(paths: &[PathBuf]) -> Vec<Attachment> {
    let mut pending: FuturesUnordered<_> = paths.iter().map(|p| read_attachment(p)).collect();
    let mut out = Vec::with_capacity(paths.len());
    while let Some(result) = pending.next().await {
        match result {
            Ok(attachment) => out.push(attachment),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable attachment"),
        }
    }
    out
}
