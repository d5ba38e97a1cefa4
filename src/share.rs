use crate::db::models::{GenerationResult, PlatformConnection};
use crate::llm::client::IMAGE_URI_PREFIX;
use base64::Engine;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const WHATSAPP_SEND_URL: &str = "https://api.whatsapp.com/send?text=";
pub const LINKEDIN_FEED_URL: &str = "https://www.linkedin.com/feed/";
pub const FACEBOOK_URL: &str = "https://www.facebook.com/";

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
    #[error("{0} is not connected")]
    NotConnected(String),
    #[error("result image is not a base64 PNG data URI")]
    InvalidImageUri,
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What the front-end has to do to hand a post over to a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SharePlan {
    /// Open this URL; the text is already embedded.
    ComposeUrl { url: String },
    /// Put `text` on the clipboard, then optionally open `follow_up_url`.
    #[serde(rename_all = "camelCase")]
    Clipboard {
        text: String,
        follow_up_url: Option<String>,
        notice: String,
    },
}

pub fn share_text(result: &GenerationResult) -> String {
    format!("{}\n\n{}", result.caption, result.hashtags.join(" "))
}

pub fn plan(
    result: &GenerationResult,
    platform: &PlatformConnection,
) -> Result<SharePlan, ShareError> {
    if !platform.connected {
        return Err(ShareError::NotConnected(platform.display_name.clone()));
    }
    let text = share_text(result);
    let plan = match platform.id.as_str() {
        "whatsapp" => SharePlan::ComposeUrl {
            url: format!("{WHATSAPP_SEND_URL}{}", urlencoding::encode(&text)),
        },
        "linkedin" => SharePlan::Clipboard {
            text,
            follow_up_url: Some(LINKEDIN_FEED_URL.to_string()),
            notice: "Caption copied. Paste it into a new LinkedIn post.".to_string(),
        },
        "facebook" => SharePlan::Clipboard {
            text,
            follow_up_url: Some(FACEBOOK_URL.to_string()),
            notice: "Caption copied. Paste it into a new Facebook post.".to_string(),
        },
        "insta" => SharePlan::Clipboard {
            text,
            follow_up_url: None,
            notice: "Caption copied. Download the image and upload it from the Instagram app."
                .to_string(),
        },
        other => return Err(ShareError::UnknownPlatform(other.to_string())),
    };
    tracing::info!(platform = %platform.id, result = %result.id, "share plan ready");
    Ok(plan)
}

/// Raw PNG bytes behind the result's data URI.
pub fn image_bytes(result: &GenerationResult) -> Result<Vec<u8>, ShareError> {
    let encoded = result
        .image_uri
        .strip_prefix(IMAGE_URI_PREFIX)
        .ok_or(ShareError::InvalidImageUri)?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| ShareError::InvalidImageUri)
}

/// Write the result's image to `path` and return the byte count.
pub async fn export_image(result: &GenerationResult, path: &Path) -> Result<usize, ShareError> {
    let bytes = image_bytes(result)?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| ShareError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "image exported");
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{DesignStyle, TargetSize};

    fn result() -> GenerationResult {
        GenerationResult {
            id: "r1".into(),
            topic: "Coffee".into(),
            freeform_instructions: None,
            caption: "Fresh beans & more".into(),
            hashtags: vec!["#coffee".into(), "#morning".into()],
            image_uri: format!("{IMAGE_URI_PREFIX}iVBORw0KGgo="),
            target_size: TargetSize::Square,
            target_styles: vec![DesignStyle::Realistic],
            grounding_sources: vec![],
            template_suggestions: vec![],
            created_at_epoch_millis: 0,
        }
    }

    fn platform(id: &str, connected: bool) -> PlatformConnection {
        let mut platform = PlatformConnection::default_catalog()
            .into_iter()
            .find(|p| p.id == id)
            .unwrap();
        platform.connected = connected;
        platform
    }

    #[test]
    fn test_share_text_layout() {
        assert_eq!(share_text(&result()), "Fresh beans & more\n\n#coffee #morning");
    }

    #[test]
    fn test_whatsapp_gets_encoded_compose_url() {
        let plan = plan(&result(), &platform("whatsapp", true)).unwrap();
        assert_eq!(
            plan,
            SharePlan::ComposeUrl {
                url: "https://api.whatsapp.com/send?text=Fresh%20beans%20%26%20more%0A%0A%23coffee%20%23morning"
                    .into()
            }
        );
    }

    #[test]
    fn test_clipboard_platforms() {
        match plan(&result(), &platform("linkedin", true)).unwrap() {
            SharePlan::Clipboard {
                text,
                follow_up_url,
                ..
            } => {
                assert_eq!(text, share_text(&result()));
                assert_eq!(follow_up_url.as_deref(), Some(LINKEDIN_FEED_URL));
            }
            other => panic!("unexpected plan {other:?}"),
        }
        assert!(matches!(
            plan(&result(), &platform("insta", true)).unwrap(),
            SharePlan::Clipboard { follow_up_url: None, .. }
        ));
    }

    #[test]
    fn test_disconnected_platform_is_refused() {
        assert!(matches!(
            plan(&result(), &platform("facebook", false)),
            Err(ShareError::NotConnected(name)) if name == "Facebook"
        ));
    }

    #[test]
    fn test_plan_serializes_with_action_tag() {
        let json = serde_json::to_value(plan(&result(), &platform("facebook", true)).unwrap()).unwrap();
        assert_eq!(json["action"], "clipboard");
        assert_eq!(json["followUpUrl"], FACEBOOK_URL);
    }

    #[tokio::test]
    async fn test_export_writes_png_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.png");
        let written = export_image(&result(), &path).await.unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(written, bytes.len());
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn test_non_data_uri_is_rejected() {
        let mut result = result();
        result.image_uri = "https://example.com/a.png".into();
        assert!(matches!(image_bytes(&result), Err(ShareError::InvalidImageUri)));
    }
}
