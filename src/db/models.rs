use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical output format chosen by the user.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TargetSize {
    Square,
    PortraitTall,
    PortraitA4,
    LandscapeA4,
}

impl TargetSize {
    pub const ALL: [TargetSize; 4] = [
        TargetSize::Square,
        TargetSize::PortraitTall,
        TargetSize::PortraitA4,
        TargetSize::LandscapeA4,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            TargetSize::Square => "square",
            TargetSize::PortraitTall => "portrait-tall",
            TargetSize::PortraitA4 => "portrait-a4",
            TargetSize::LandscapeA4 => "landscape-a4",
        }
    }

    /// Human description used inside image prompts.
    pub fn label(self) -> &'static str {
        match self {
            TargetSize::Square => "square feed post",
            TargetSize::PortraitTall => "tall story format",
            TargetSize::PortraitA4 => "A4 portrait print",
            TargetSize::LandscapeA4 => "A4 landscape print",
        }
    }
}

impl Default for TargetSize {
    fn default() -> Self {
        TargetSize::Square
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for TargetSize {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        TargetSize::ALL
            .into_iter()
            .find(|size| size.tag() == needle)
            .ok_or_else(|| {
                tracing::warn!(value = %s, "unrecognized target size");
                UnknownTag {
                    kind: "target size",
                    value: s.to_string(),
                }
            })
    }
}

/// Visual style tags a user can combine for one asset.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DesignStyle {
    Minimalist,
    Vibrant,
    Corporate,
    Artistic,
    Retro,
    Realistic,
}

impl DesignStyle {
    pub const ALL: [DesignStyle; 6] = [
        DesignStyle::Minimalist,
        DesignStyle::Vibrant,
        DesignStyle::Corporate,
        DesignStyle::Artistic,
        DesignStyle::Retro,
        DesignStyle::Realistic,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            DesignStyle::Minimalist => "minimalist",
            DesignStyle::Vibrant => "vibrant",
            DesignStyle::Corporate => "corporate",
            DesignStyle::Artistic => "artistic",
            DesignStyle::Retro => "retro",
            DesignStyle::Realistic => "realistic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DesignStyle::Minimalist => "Minimalist & Modern",
            DesignStyle::Vibrant => "Vibrant & Bold",
            DesignStyle::Corporate => "Professional & Clean",
            DesignStyle::Artistic => "Creative & Abstract",
            DesignStyle::Retro => "Retro & Vintage",
            DesignStyle::Realistic => "Photorealistic & Cinematic",
        }
    }

    /// Comma separated display labels, in selection order.
    pub fn join_labels(styles: &[DesignStyle]) -> String {
        styles
            .iter()
            .map(|style| style.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for DesignStyle {
    fn default() -> Self {
        DesignStyle::Realistic
    }
}

impl FromStr for DesignStyle {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DesignStyle::ALL
            .into_iter()
            .find(|style| style.tag() == needle)
            .ok_or_else(|| UnknownTag {
                kind: "design style",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSuggestion {
    pub name: String,
    pub description: String,
    pub search_uri: String,
}

/// One finished asset. Written once at the end of a successful run and never edited.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub id: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeform_instructions: Option<String>,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub image_uri: String,
    pub target_size: TargetSize,
    pub target_styles: Vec<DesignStyle>,
    #[serde(default)]
    pub grounding_sources: Vec<GroundingSource>,
    #[serde(default)]
    pub template_suggestions: Vec<TemplateSuggestion>,
    pub created_at_epoch_millis: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConnection {
    pub id: String,
    pub display_name: String,
    pub icon_glyph: String,
    pub color_token: String,
    pub connected: bool,
}

impl PlatformConnection {
    fn new(id: &str, display_name: &str, icon_glyph: &str, color_token: &str) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            icon_glyph: icon_glyph.into(),
            color_token: color_token.into(),
            connected: false,
        }
    }

    /// The fixed catalog, all disconnected.
    pub fn default_catalog() -> Vec<PlatformConnection> {
        vec![
            PlatformConnection::new("insta", "Instagram", "📸", "gradient-instagram"),
            PlatformConnection::new("whatsapp", "WhatsApp", "💬", "emerald-500"),
            PlatformConnection::new("linkedin", "LinkedIn", "💼", "blue-700"),
            PlatformConnection::new("facebook", "Facebook", "👥", "indigo-600"),
        ]
    }
}
