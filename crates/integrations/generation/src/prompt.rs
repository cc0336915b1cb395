//! Deterministic prompt assembly.
//!
//! The system prompt is built from whichever brand profile fields are
//! present, in a fixed order, so the same profile always yields the same
//! prompt. Missing profiles degrade to a generic copywriter persona.

use std::fmt::Write;

use crate::types::{BrandProfile, GenerateRequest};

/// Maximum number of approved posts quoted as style exemplars.
const MAX_EXEMPLARS: usize = 3;

/// Maximum characters quoted from each exemplar.
const EXEMPLAR_MAX_CHARS: usize = 200;

/// Build the system prompt for a generation call.
pub fn build_system_prompt(profile: Option<&BrandProfile>) -> String {
    let Some(profile) = profile else {
        return "You are an expert social media copywriter.\n\
                Write engaging posts that drive engagement."
            .to_owned();
    };

    let mut parts = vec![format!(
        "You are a professional SMM copywriter for a {} business.",
        profile.business_type
    )];

    if let Some(name) = non_empty(profile.business_name.as_deref()) {
        parts.push(format!("Business name: \"{name}\""));
    }
    if profile.city.is_some() || profile.country.is_some() {
        parts.push(format!(
            "Location: {}, {}",
            profile.city.as_deref().unwrap_or(""),
            profile.country.as_deref().unwrap_or("")
        ));
    }
    if !profile.languages.is_empty() {
        parts.push(format!("Languages: {}", profile.languages.join(", ")));
    }
    if let Some(audience) = non_empty(profile.target_audience.as_deref()) {
        parts.push(format!("Target audience: {audience}"));
    }
    if let Some(positioning) = non_empty(profile.positioning_style.as_deref()) {
        parts.push(format!("Brand positioning: {positioning}"));
    }
    if let Some(tagline) = non_empty(profile.tagline.as_deref()) {
        parts.push(format!("Tagline: \"{tagline}\""));
    }
    if let Some(value) = non_empty(profile.unique_value.as_deref()) {
        parts.push(format!("Unique value: {value}"));
    }
    parts.push(format!(
        "Tone: {}",
        non_empty(profile.preferred_tone.as_deref()).unwrap_or("professional and warm")
    ));

    if !profile.approved_posts.is_empty() {
        parts.push("\n--- APPROVED POST EXAMPLES (match this style) ---".to_owned());
        for (i, post) in profile.approved_posts.iter().take(MAX_EXEMPLARS).enumerate() {
            let excerpt: String = post.content.chars().take(EXEMPLAR_MAX_CHARS).collect();
            parts.push(format!("Example {}: {excerpt}...", i + 1));
        }
    }

    parts.join("\n")
}

/// Build the user prompt embedding overrides, output rules, and the brief.
pub fn build_user_prompt(system_prompt: &str, request: &GenerateRequest) -> String {
    let mut prompt = format!("{system_prompt}\n\n");

    if let Some(tone) = non_empty(request.tone.as_deref()) {
        let _ = writeln!(prompt, "Requested tone: {tone}");
    }
    if let Some(audience) = non_empty(request.audience.as_deref()) {
        let _ = writeln!(prompt, "Target audience override: {audience}");
    }
    if let Some(platform) = non_empty(request.platform.as_deref()) {
        let _ = writeln!(prompt, "Platform: {platform} (adjust length and style)");
    }
    if let Some(image_brief) = non_empty(request.image_brief.as_deref()) {
        let _ = writeln!(prompt, "Image context: {image_brief}");
    }

    prompt.push_str(
        "\nRules:\n\
         - Match the language of the brief (Hebrew/Russian/English)\n\
         - Be concise and punchy\n\
         - Include relevant emojis\n\
         - End with a call-to-action\n\
         \n\
         Return ONLY valid JSON with this structure:\n\
         {\n\
         \x20 \"content\": \"The post text with emojis\",\n\
         \x20 \"hashtags\": [\"hashtag1\", \"hashtag2\", \"hashtag3\"],\n\
         \x20 \"imagePrompt\": \"Detailed English prompt for AI image generation. Include: style, colors, composition, lighting, mood.\"\n\
         }\n\
         \n\
         The imagePrompt must be:\n\
         - In ENGLISH only\n\
         - Detailed (style, colors, composition, lighting)\n\
         - Suitable for AI image generation (Midjourney/DALL-E style)\n\
         - Related to the post content\n\
         \n",
    );

    let _ = write!(prompt, "Write a social media post about: {}", request.brief);
    prompt
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
