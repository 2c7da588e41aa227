//! External image-generation provider boundary.
//!
//! The engine talks to providers only through the [`ImageProvider`] trait:
//! one request in, one image (plus any model text) or one failure out. No
//! provider implementation retries on its own.

pub mod gemini;
pub mod scripted;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{AspectRatio, BlockKind, Resolution};

pub use gemini::GeminiProvider;
pub use scripted::ScriptedProvider;

/// Secret used to authenticate against the provider.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential(String);

impl ProviderCredential {
    /// Wraps a raw credential string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parses an optional client-supplied credential, dropping blanks.
    #[must_use]
    pub fn from_optional(raw: Option<String>) -> Option<Self> {
        raw.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Self)
    }

    /// Returns the raw value for the outgoing request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderCredential(***)")
    }
}

/// Encoded image with its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw encoded bytes.
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One provider call.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Fully assembled prompt text.
    pub prompt: String,
    /// Requested aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Requested resolution.
    pub resolution: Resolution,
    /// Credential to authenticate with, if any.
    pub credential: Option<ProviderCredential>,
    /// Reference images sent before the prompt.
    pub references: Vec<ImageData>,
}

/// Successful provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOutput {
    /// Primary image.
    pub image: ImageData,
    /// Text parts returned alongside the image.
    pub text: Vec<String>,
}

/// Errors from the image provider layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No credential was supplied and none is configured.
    #[error("no provider credential configured")]
    MissingCredential,

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider returned a non-2xx status code.
    #[error("provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Provider refused the prompt.
    #[error("prompt blocked by provider: {0}")]
    Blocked(String),

    /// Response carried no usable image.
    #[error("provider returned no image")]
    NoImage,

    /// Response could not be decoded.
    #[error("malformed provider response: {0}")]
    Decode(String),

    /// Scripted failure.
    #[error("{0}")]
    Rejected(String),
}

/// Black-box image generator.
#[async_trait]
pub trait ImageProvider: fmt::Debug + Send + Sync {
    /// Issues exactly one generation call.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] describing why no image was produced.
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderOutput, ProviderError>;
}

/// Assembles the prompt sent for card `index`.
///
/// Cards are numbered from 1 in the prompt. Kinds that carry no text get a
/// fixed instruction to work from the reference image instead.
#[must_use]
pub fn build_generation_prompt(index: u32, text: &str, kind: BlockKind, style: &str) -> String {
    let body = text.trim();
    let body = if body.is_empty() && !kind.capabilities().produces_text {
        "Recreate the attached reference image as a finished sheet."
    } else {
        body
    };
    let number = index.saturating_add(1);
    let style = style.trim();
    if style.is_empty() {
        format!("Sheet {number} prompt: {body}")
    } else {
        format!("Sheet {number} prompt: {body}\n\n{style}")
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn prompt_numbers_cards_from_one() {
        let prompt = build_generation_prompt(0, " a red door ", BlockKind::Text, "");
        assert_eq!(prompt, "Sheet 1 prompt: a red door");
    }

    #[test]
    fn style_follows_a_blank_line() {
        let prompt = build_generation_prompt(2, "a garden", BlockKind::Text, "watercolor");
        assert_eq!(prompt, "Sheet 3 prompt: a garden\n\nwatercolor");
    }

    #[test]
    fn textless_kinds_get_reference_instruction() {
        let prompt = build_generation_prompt(0, "", BlockKind::Background, "");
        assert!(prompt.contains("reference image"));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = ProviderCredential::new("sk-very-secret");
        assert!(!format!("{credential:?}").contains("secret"));
        assert_eq!(credential.expose(), "sk-very-secret");
        assert!(ProviderCredential::from_optional(Some("  ".to_string())).is_none());
    }
}
