use super::{ContentProvider, GenerateRequest, GenerateResponse, Part, ProviderError, WebReference};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
    #[serde(default, skip_serializing)]
    thought: Option<bool>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: &'static str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Deserialize)]
struct GeminiGroundingChunk {
    #[serde(default)]
    web: Option<GeminiWeb>,
}

#[derive(Deserialize)]
struct GeminiWeb {
    title: Option<String>,
    uri: Option<String>,
}

fn build_request(request: &GenerateRequest) -> GeminiRequest {
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => GeminiPart {
                text: Some(text.clone()),
                ..Default::default()
            },
            Part::InlineData { mime_type, data } => GeminiPart {
                inline_data: Some(GeminiInlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                }),
                ..Default::default()
            },
        })
        .collect();

    let config = &request.config;
    let mut generation_config = GeminiGenerationConfig {
        temperature: config.temperature,
        ..Default::default()
    };
    if let Some(schema) = &config.response_schema {
        generation_config.response_mime_type = Some("application/json");
        generation_config.response_schema = Some(schema.to_json());
    }
    if let Some(ratio) = config.aspect_ratio {
        generation_config.response_modalities = Some(vec!["TEXT", "IMAGE"]);
        generation_config.image_config = Some(GeminiImageConfig {
            aspect_ratio: ratio.as_str(),
        });
    }

    let mut tools = Vec::new();
    if config.web_search {
        tools.push(serde_json::json!({ "googleSearch": {} }));
    }

    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user",
            parts,
        }],
        generation_config: Some(generation_config),
        tools,
    }
}

fn into_response(data: GeminiResponse) -> GenerateResponse {
    let Some(candidate) = data.candidates.into_iter().next() else {
        return GenerateResponse::default();
    };

    let parts = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| p.thought != Some(true))
        .filter_map(|p| match (p.inline_data, p.text) {
            (Some(inline), _) => Some(Part::InlineData {
                mime_type: inline.mime_type,
                data: inline.data,
            }),
            (None, Some(text)) => Some(Part::Text(text)),
            (None, None) => None,
        })
        .collect();

    let grounding = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .map(|chunk| match chunk.web {
            Some(web) => WebReference {
                title: web.title,
                uri: web.uri,
            },
            None => WebReference::default(),
        })
        .collect();

    GenerateResponse { parts, grounding }
}

/// Pull `error.message` out of a Google API error body when there is one.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// HTTP transport to the Gemini `generateContent` endpoint.
pub struct GeminiProvider {
    config: GeminiConfig,
    http: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, timeout: Duration) -> Self {
        let http = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build HTTP client, using default client");
            Client::default()
        });
        Self { config, http }
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model_path
        )
    }
}

#[async_trait]
impl ContentProvider for GeminiProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let body = build_request(request);
        tracing::debug!(
            model = %request.model,
            parts = request.parts.len(),
            web_search = request.config.web_search,
            "sending generateContent request"
        );

        let resp = self
            .http
            .post(self.endpoint(&request.model))
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: api_error_message(&text),
            });
        }

        let data: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(into_response(data))
    }
}
