//! Gemini `generateContent` client.
//!
//! Sends reference images as inline parts followed by the prompt, asks for
//! both text and image modalities, and picks the primary image out of the
//! response.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::Deserialize;

use super::{ImageData, ImageProvider, ProviderError, ProviderOutput, ProviderRequest};

/// Data URIs with base64 image payloads embedded in text parts.
static EMBEDDED_IMAGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"data:image/(?P<ext>png|jpeg|jpg|webp);base64,(?P<data>[A-Za-z0-9+/=\r\n]+)").ok()
});

/// HTTP client for the Gemini image model.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Creates a client for `model` at `base_url` with a per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Request`] if the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, model))
    }

    /// Creates a provider reusing an existing [`reqwest::Client`].
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut parts: Vec<serde_json::Value> = request
            .references
            .iter()
            .map(|image| {
                serde_json::json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": STANDARD.encode(&image.bytes),
                    }
                })
            })
            .collect();
        parts.push(serde_json::json!({ "text": request.prompt }));

        serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
                "imageConfig": {
                    "aspectRatio": request.aspect_ratio.as_str(),
                    "imageSize": request.resolution.as_str(),
                }
            }
        })
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderOutput, ProviderError> {
        let credential = request
            .credential
            .as_ref()
            .ok_or(ProviderError::MissingCredential)?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .json(&Self::request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        parse_response(parsed)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Picks the primary image: first inline image part, else the first image
/// embedded in a text part.
fn parse_response(response: GenerateContentResponse) -> Result<ProviderOutput, ProviderError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .filter(|r| !r.is_empty())
    {
        return Err(ProviderError::Blocked(reason));
    }

    let mut text = Vec::new();
    let mut image = None;
    let parts = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts);
    for part in parts {
        if let Some(t) = part.text {
            text.push(t);
        }
        if image.is_none()
            && let Some(inline) = part.inline_data
            && inline.mime_type.starts_with("image/")
        {
            let bytes = STANDARD
                .decode(inline.data.as_bytes())
                .map_err(|e| ProviderError::Decode(e.to_string()))?;
            image = Some(ImageData {
                bytes,
                mime_type: inline.mime_type,
            });
        }
    }

    let image = match image {
        Some(image) => image,
        None => text
            .iter()
            .find_map(|t| extract_embedded_image(t))
            .ok_or(ProviderError::NoImage)?,
    };
    Ok(ProviderOutput { image, text })
}

fn extract_embedded_image(text: &str) -> Option<ImageData> {
    let pattern = EMBEDDED_IMAGE.as_ref()?;
    pattern.captures_iter(text).find_map(|caps| {
        let ext = caps.name("ext")?.as_str();
        let data: String = caps
            .name("data")?
            .as_str()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = STANDARD.decode(data.as_bytes()).ok()?;
        let mime_type = if ext == "jpg" {
            "image/jpeg".to_string()
        } else {
            format!("image/{ext}")
        };
        Some(ImageData { bytes, mime_type })
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{AspectRatio, Resolution};

    fn parse(json: serde_json::Value) -> Result<ProviderOutput, ProviderError> {
        let Ok(response) = serde_json::from_value::<GenerateContentResponse>(json) else {
            panic!("fixture does not deserialize");
        };
        parse_response(response)
    }

    #[test]
    fn picks_first_inline_image_and_keeps_text() {
        let first = STANDARD.encode(b"first");
        let second = STANDARD.encode(b"second");
        let output = parse(serde_json::json!({
            "candidates": [{ "content": { "parts": [
                { "text": "here you go" },
                { "inlineData": { "mimeType": "image/png", "data": first } },
                { "inlineData": { "mimeType": "image/png", "data": second } }
            ]}}]
        }));
        let Ok(output) = output else {
            panic!("expected image");
        };
        assert_eq!(output.image.bytes, b"first");
        assert_eq!(output.image.mime_type, "image/png");
        assert_eq!(output.text, vec!["here you go".to_string()]);
    }

    #[test]
    fn falls_back_to_embedded_data_uri() {
        let payload = STANDARD.encode(b"embedded");
        let output = parse(serde_json::json!({
            "candidates": [{ "content": { "parts": [
                { "text": format!("see data:image/jpg;base64,{payload} above") }
            ]}}]
        }));
        let Ok(output) = output else {
            panic!("expected embedded image");
        };
        assert_eq!(output.image.bytes, b"embedded");
        assert_eq!(output.image.mime_type, "image/jpeg");
    }

    #[test]
    fn text_only_response_is_no_image() {
        let output = parse(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "sorry" }] } }]
        }));
        assert!(matches!(output, Err(ProviderError::NoImage)));
    }

    #[test]
    fn blocked_prompt_is_a_failure() {
        let output = parse(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }));
        assert!(matches!(output, Err(ProviderError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn request_body_carries_settings_and_references() {
        let request = ProviderRequest {
            prompt: "Sheet 1 prompt: x".to_string(),
            aspect_ratio: AspectRatio::Landscape16x9,
            resolution: Resolution::TwoK,
            credential: None,
            references: vec![ImageData {
                bytes: b"ref".to_vec(),
                mime_type: "image/png".to_string(),
            }],
        };
        let body = GeminiProvider::request_body(&request);
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
        assert_eq!(body["generationConfig"]["imageConfig"]["imageSize"], "2K");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "Sheet 1 prompt: x");
        assert_eq!(
            body["contents"][0]["parts"][0]["inlineData"]["data"],
            STANDARD.encode(b"ref")
        );
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let Ok(provider) = GeminiProvider::new("http://127.0.0.1:9", "m", Duration::from_secs(1))
        else {
            panic!("client build failed");
        };
        let request = ProviderRequest {
            prompt: "x".to_string(),
            aspect_ratio: AspectRatio::Square,
            resolution: Resolution::OneK,
            credential: None,
            references: Vec::new(),
        };
        assert!(matches!(
            provider.generate(&request).await,
            Err(ProviderError::MissingCredential)
        ));
        assert!(provider.endpoint().ends_with("/models/m:generateContent"));
    }
}
