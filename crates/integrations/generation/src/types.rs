use serde::{Deserialize, Serialize};

/// Parameters of one generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// Tenant whose brand profile should personalize the prompt, if any.
    pub tenant_id: Option<String>,
    /// The brief to write about.
    pub brief: String,
    /// Requested tone override.
    pub tone: Option<String>,
    /// Target audience override.
    pub audience: Option<String>,
    /// Target platform (adjusts length and style).
    pub platform: Option<String>,
    /// Context for the accompanying image.
    pub image_brief: Option<String>,
}

/// Structured result of a generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedPost {
    /// The post text.
    #[serde(default)]
    pub content: String,
    /// Suggested hashtags.
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// English prompt for AI image generation.
    #[serde(default, rename = "imagePrompt", alias = "image_prompt")]
    pub image_prompt: String,
}

/// A previously approved post used as a style exemplar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedPost {
    pub content: String,
    #[serde(default)]
    pub channel: String,
}

/// Business metadata used to personalize generation.
///
/// Fetched read-only from the brand-profile service; every field beyond the
/// business type is optional and only included in the prompt when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandProfile {
    pub business_type: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub positioning_style: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub unique_value: Option<String>,
    #[serde(default)]
    pub preferred_tone: Option<String>,
    #[serde(default)]
    pub approved_posts: Vec<ApprovedPost>,
}
