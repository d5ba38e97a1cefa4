use super::{ContentProvider, GenerateRequest, GenerateResponse, Part, ProviderError, Schema};
use async_trait::async_trait;
use std::sync::Mutex;

/// Which client operation produced a request, recovered from its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    Correct,
    Research,
    Templates,
    Captions,
    Image,
}

pub(crate) fn call_of(request: &GenerateRequest) -> Call {
    let config = &request.config;
    if config.aspect_ratio.is_some() {
        Call::Image
    } else if config.web_search {
        Call::Research
    } else {
        match config.response_schema {
            Some(Schema::Array(_)) => Call::Templates,
            Some(_) => Call::Captions,
            None => Call::Correct,
        }
    }
}

/// The text that was sent for correction.
pub(crate) fn correction_input(request: &GenerateRequest) -> String {
    match request.parts.first() {
        Some(Part::Text(prompt)) => prompt.rsplit("\n\n").next().unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

type Handler = Box<dyn Fn(Call, &GenerateRequest) -> Result<GenerateResponse, ProviderError> + Send + Sync>;

pub(crate) struct FakeProvider {
    handler: Handler,
    calls: Mutex<Vec<GenerateRequest>>,
}

impl FakeProvider {
    pub(crate) fn new(
        handler: impl Fn(Call, &GenerateRequest) -> Result<GenerateResponse, ProviderError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call successfully: correction echoes its input with "sentense" fixed.
    pub(crate) fn happy() -> Self {
        Self::new(|call, request| happy_response(call, request))
    }

    pub(crate) fn calls(&self) -> Vec<GenerateRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_of(&self, call: Call) -> Vec<GenerateRequest> {
        self.calls()
            .into_iter()
            .filter(|r| call_of(r) == call)
            .collect()
    }
}

pub(crate) fn happy_response(
    call: Call,
    request: &GenerateRequest,
) -> Result<GenerateResponse, ProviderError> {
    let response = match call {
        Call::Correct => {
            GenerateResponse::from_text(correction_input(request).replace("sentense", "sentence"))
        }
        Call::Research => GenerateResponse {
            parts: vec![Part::text("Espresso demand is rising.")],
            grounding: vec![super::WebReference {
                title: Some("Coffee Weekly".into()),
                uri: Some("https://example.com/coffee".into()),
            }],
        },
        Call::Templates => GenerateResponse::from_text(
            serde_json::json!([
                { "name": "Cafe Promo", "description": "Bold", "searchUrl": "https://www.canva.com/templates/?query=cafe" },
                { "name": "Latte Art", "description": "Soft", "searchUrl": "/templates/latte" },
                { "name": "Menu Board", "description": "Clean", "searchUrl": "https://www.canva.com/t/menu" },
                { "name": "Bean Story", "description": "Warm", "searchUrl": "https://www.canva.com/t/bean" },
                { "name": "Morning Rush", "description": "Bright", "searchUrl": "https://www.canva.com/t/rush" },
                { "name": "Roast Day", "description": "Dark", "searchUrl": "https://www.canva.com/t/roast" }
            ])
            .to_string(),
        ),
        Call::Captions => GenerateResponse::from_text(
            r##"{"caption":"Fresh beans, fresh start.","hashtags":["#coffee","#morning"]}"##,
        ),
        Call::Image => GenerateResponse {
            parts: vec![
                Part::text("Here is your poster"),
                Part::InlineData {
                    mime_type: "image/png".into(),
                    data: "iVBORw0KGgo=".into(),
                },
            ],
            grounding: vec![],
        },
    };
    Ok(response)
}

#[async_trait]
impl ContentProvider for FakeProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        self.calls.lock().unwrap().push(request.clone());
        (self.handler)(call_of(request), request)
    }
}
