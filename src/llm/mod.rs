pub mod client;
pub mod gemini;
pub mod prompts;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub use client::GenerationClient;

/// One piece of multimodal request or response content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }
}

/// Provider aspect-ratio vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    ThreeByFour,
    FourByThree,
    NineBySixteen,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::ThreeByFour => "3:4",
            AspectRatio::FourByThree => "4:3",
            AspectRatio::NineBySixteen => "9:16",
        }
    }
}

/// Structured-response schema. Every object property is required.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String,
    Array(Box<Schema>),
    Object(Vec<(&'static str, Schema)>),
}

impl Schema {
    pub fn to_json(&self) -> Value {
        match self {
            Schema::String => json!({ "type": "STRING" }),
            Schema::Array(items) => json!({ "type": "ARRAY", "items": items.to_json() }),
            Schema::Object(fields) => {
                let mut properties = Map::new();
                for (name, schema) in fields {
                    properties.insert((*name).to_string(), schema.to_json());
                }
                let required: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
                json!({
                    "type": "OBJECT",
                    "properties": properties,
                    "required": required,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub response_schema: Option<Schema>,
    pub web_search: bool,
    pub aspect_ratio: Option<AspectRatio>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<Part>,
    pub config: GenerationConfig,
}

/// A web reference the provider used to ground its answer. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebReference {
    pub title: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub parts: Vec<Part>,
    pub grounding: Vec<WebReference>,
}

impl GenerateResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(text.into())],
            grounding: Vec::new(),
        }
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect()
    }

    /// Payload of the first inline binary part.
    pub fn first_inline_data(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            Part::InlineData { data, .. } if !data.is_empty() => Some(data.as_str()),
            _ => None,
        })
    }
}

/// The external generative capability. Implemented over HTTP by
/// [`gemini::GeminiProvider`]; tests substitute a scripted fake.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Image generation error: {0}")]
    ImageGeneration(String),
}

impl Serialize for ProviderError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
