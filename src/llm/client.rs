use super::{
    prompts, AspectRatio, ContentProvider, GenerateRequest, GenerateResponse, GenerationConfig,
    Part, ProviderError, Schema, WebReference,
};
use crate::attachments::{Attachment, AttachmentKind};
use crate::db::models::{DesignStyle, GroundingSource, TargetSize, TemplateSuggestion};
use serde::Deserialize;
use std::sync::Arc;

/// Inputs shorter than this (after trimming) are returned as-is without a provider call.
pub const MIN_CORRECTION_CHARS: usize = 3;
pub const CORRECTION_TEMPERATURE: f32 = 0.1;
pub const RESEARCH_FALLBACK: &str =
    "No specific details found, but I will create a creative post based on the topic and attachments.";
pub const SOURCE_TITLE_PLACEHOLDER: &str = "Reference";
pub const SOURCE_URI_SENTINEL: &str = "#";
pub const TEMPLATE_COUNT: usize = 6;
pub const TEMPLATE_SEARCH_URL: &str = "https://www.canva.com/templates/";
pub const FALLBACK_CAPTION: &str = "Engaging content coming soon!";
pub const FALLBACK_HASHTAG: &str = "#trending";
pub const IMAGE_URI_PREFIX: &str = "data:image/png;base64,";

pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSet {
    pub text: String,
    pub image: String,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODEL.to_string(),
            image: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Research {
    pub summary: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Captions {
    pub caption: String,
    pub hashtags: Vec<String>,
}

impl Captions {
    fn fallback() -> Self {
        Self {
            caption: FALLBACK_CAPTION.to_string(),
            hashtags: vec![FALLBACK_HASHTAG.to_string()],
        }
    }
}

#[derive(Deserialize)]
struct TemplateItem {
    name: String,
    description: String,
    #[serde(rename = "searchUrl", alias = "searchUri")]
    search_url: String,
}

#[derive(Deserialize)]
struct CaptionPayload {
    caption: String,
    hashtags: Vec<String>,
}

/// Total mapping from the logical size to the provider's ratio vocabulary.
pub fn aspect_ratio_for(size: TargetSize) -> AspectRatio {
    match size {
        TargetSize::Square => AspectRatio::Square,
        TargetSize::PortraitA4 => AspectRatio::ThreeByFour,
        TargetSize::LandscapeA4 => AspectRatio::FourByThree,
        TargetSize::PortraitTall => AspectRatio::NineBySixteen,
    }
}

fn template_schema() -> Schema {
    Schema::Array(Box::new(Schema::Object(vec![
        ("name", Schema::String),
        ("description", Schema::String),
        ("searchUrl", Schema::String),
    ])))
}

fn caption_schema() -> Schema {
    Schema::Object(vec![
        ("caption", Schema::String),
        ("hashtags", Schema::Array(Box::new(Schema::String))),
    ])
}

/// Models occasionally wrap JSON in a markdown fence even in JSON mode.
fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_json<T: serde::de::DeserializeOwned>(response: &GenerateResponse) -> Result<T, ProviderError> {
    let text = response.text();
    serde_json::from_str(strip_json_fence(&text)).map_err(|e| ProviderError::Parse(e.to_string()))
}

fn is_absolute_url(candidate: &str) -> bool {
    reqwest::Url::parse(candidate.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

fn template_search_url(name: &str, topic: &str) -> String {
    format!(
        "{}?query={}",
        TEMPLATE_SEARCH_URL,
        urlencoding::encode(&format!("{} {}", name, topic))
    )
}

fn grounding_sources(references: &[WebReference]) -> Vec<GroundingSource> {
    let mut sources: Vec<GroundingSource> = Vec::new();
    for reference in references {
        let source = GroundingSource {
            title: reference
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(SOURCE_TITLE_PLACEHOLDER)
                .to_string(),
            uri: reference
                .uri
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .unwrap_or(SOURCE_URI_SENTINEL)
                .to_string(),
        };
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    sources
}

fn normalize_hashtags(raw: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.trim();
        if tag.is_empty() || tag == "#" {
            continue;
        }
        let tag = if tag.starts_with('#') {
            tag.to_string()
        } else {
            format!("#{}", tag)
        };
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if tags.is_empty() {
        tags.push(FALLBACK_HASHTAG.to_string());
    }
    tags
}

/// Capability façade over a [`ContentProvider`]: shapes every stage's request and
/// validates its response.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn ContentProvider>,
    models: ModelSet,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn ContentProvider>, models: ModelSet) -> Self {
        Self { provider, models }
    }

    fn text_request(&self, prompt: String, config: GenerationConfig) -> GenerateRequest {
        GenerateRequest {
            model: self.models.text.clone(),
            parts: vec![Part::Text(prompt)],
            config,
        }
    }

    /// Grammar and spelling clean-up. Trivial input and empty answers fall back to `text`.
    pub async fn correct_text(&self, text: &str) -> Result<String, ProviderError> {
        if text.trim().chars().count() < MIN_CORRECTION_CHARS {
            return Ok(text.to_string());
        }

        let request = self.text_request(
            prompts::correction(text),
            GenerationConfig {
                temperature: Some(CORRECTION_TEMPERATURE),
                ..Default::default()
            },
        );
        let response = self.provider.generate(&request).await?;
        let corrected = response.text().trim().to_string();
        if corrected.is_empty() {
            tracing::debug!("correction returned nothing, keeping original text");
            return Ok(text.to_string());
        }
        Ok(corrected)
    }

    /// Web-grounded research over the topic and every attachment.
    pub async fn research_topic(
        &self,
        topic: &str,
        instructions: Option<&str>,
        attachments: &[Attachment],
    ) -> Result<Research, ProviderError> {
        let referenced: Vec<&str> = attachments
            .iter()
            .filter(|a| !a.kind.is_inline())
            .map(|a| a.display_name.as_str())
            .collect();

        let mut parts = vec![Part::Text(prompts::research(
            topic,
            instructions,
            !attachments.is_empty(),
            &referenced,
        ))];
        parts.extend(
            attachments
                .iter()
                .filter(|a| a.kind.is_inline())
                .map(|a| Part::InlineData {
                    mime_type: a.mime_type.clone(),
                    data: a.encoded_payload.clone(),
                }),
        );

        let request = GenerateRequest {
            model: self.models.text.clone(),
            parts,
            config: GenerationConfig {
                web_search: true,
                ..Default::default()
            },
        };
        let response = self.provider.generate(&request).await?;

        let summary = response.text().trim().to_string();
        let summary = if summary.is_empty() {
            tracing::warn!(topic, "research returned no summary, using fallback context");
            RESEARCH_FALLBACK.to_string()
        } else {
            summary
        };
        let sources = grounding_sources(&response.grounding);
        tracing::debug!(sources = sources.len(), "research complete");
        Ok(Research { summary, sources })
    }

    /// Exactly [`TEMPLATE_COUNT`] suggestions, or none when the provider fails or
    /// returns an unusable list.
    pub async fn suggest_templates(
        &self,
        topic: &str,
        styles: &[DesignStyle],
    ) -> Vec<TemplateSuggestion> {
        let request = self.text_request(
            prompts::templates(topic, styles, TEMPLATE_COUNT),
            GenerationConfig {
                response_schema: Some(template_schema()),
                ..Default::default()
            },
        );

        let items: Vec<TemplateItem> = match self.provider.generate(&request).await {
            Ok(response) => match parse_json(&response) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(error = %e, "template suggestions unparsable");
                    return Vec::new();
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "template suggestion request failed");
                return Vec::new();
            }
        };

        if items.len() < TEMPLATE_COUNT {
            tracing::warn!(got = items.len(), "too few template suggestions, dropping list");
            return Vec::new();
        }

        items
            .into_iter()
            .take(TEMPLATE_COUNT)
            .map(|item| {
                let search_uri = if is_absolute_url(&item.search_url) {
                    item.search_url.trim().to_string()
                } else {
                    template_search_url(&item.name, topic)
                };
                TemplateSuggestion {
                    name: item.name,
                    description: item.description,
                    search_uri,
                }
            })
            .collect()
    }

    /// Caption and hashtags. Never fails: any provider or parse problem yields the
    /// fallback caption with a single default hashtag.
    pub async fn generate_captions(
        &self,
        topic: &str,
        research_summary: &str,
        instructions: Option<&str>,
    ) -> Captions {
        let request = self.text_request(
            prompts::captions(topic, research_summary, instructions),
            GenerationConfig {
                response_schema: Some(caption_schema()),
                ..Default::default()
            },
        );

        let payload: CaptionPayload = match self.provider.generate(&request).await {
            Ok(response) => match parse_json(&response) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "caption response unparsable, using fallback");
                    return Captions::fallback();
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "caption request failed, using fallback");
                return Captions::fallback();
            }
        };

        let caption = payload.caption.trim();
        Captions {
            caption: if caption.is_empty() {
                FALLBACK_CAPTION.to_string()
            } else {
                caption.to_string()
            },
            hashtags: normalize_hashtags(payload.hashtags),
        }
    }

    /// Render the poster and return it as a PNG data URI. The first image attachment,
    /// if any, is sent as a visual reference.
    pub async fn generate_image(
        &self,
        topic: &str,
        styles: &[DesignStyle],
        size: TargetSize,
        instructions: Option<&str>,
        attachments: &[Attachment],
    ) -> Result<String, ProviderError> {
        let reference = attachments.iter().find(|a| a.kind == AttachmentKind::Image);

        let mut parts = Vec::with_capacity(2);
        if let Some(reference) = reference {
            parts.push(Part::InlineData {
                mime_type: reference.mime_type.clone(),
                data: reference.encoded_payload.clone(),
            });
        }
        parts.push(Part::Text(prompts::image(
            topic,
            styles,
            size,
            instructions,
            reference.is_some(),
        )));

        let request = GenerateRequest {
            model: self.models.image.clone(),
            parts,
            config: GenerationConfig {
                aspect_ratio: Some(aspect_ratio_for(size)),
                ..Default::default()
            },
        };
        let response = self.provider.generate(&request).await?;

        match response.first_inline_data() {
            Some(data) => Ok(format!("{}{}", IMAGE_URI_PREFIX, data)),
            None => {
                let said = response.text();
                Err(ProviderError::ImageGeneration(if said.trim().is_empty() {
                    "response contained no image part".to_string()
                } else {
                    format!("response contained no image part: {}", said.trim())
                }))
            }
        }
    }
}
