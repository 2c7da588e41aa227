//! Fixed generation settings: aspect ratios, resolutions, and prompt blocks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SpawnerError;

/// Output aspect ratio supported by the image provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum AspectRatio {
    /// `1:1`
    #[serde(rename = "1:1")]
    Square,
    /// `2:3`
    #[serde(rename = "2:3")]
    Portrait2x3,
    /// `3:2`
    #[serde(rename = "3:2")]
    Landscape3x2,
    /// `3:4`
    #[serde(rename = "3:4")]
    Portrait3x4,
    /// `4:3`
    #[serde(rename = "4:3")]
    Landscape4x3,
    /// `4:5`
    #[serde(rename = "4:5")]
    Portrait4x5,
    /// `5:4`
    #[serde(rename = "5:4")]
    Landscape5x4,
    /// `9:16`
    #[serde(rename = "9:16")]
    Portrait9x16,
    /// `16:9`
    #[serde(rename = "16:9")]
    Landscape16x9,
    /// `21:9`
    #[serde(rename = "21:9")]
    Ultrawide21x9,
}

impl AspectRatio {
    /// Every supported ratio, in display order.
    pub const ALL: [Self; 10] = [
        Self::Square,
        Self::Portrait2x3,
        Self::Landscape3x2,
        Self::Portrait3x4,
        Self::Landscape4x3,
        Self::Portrait4x5,
        Self::Landscape5x4,
        Self::Portrait9x16,
        Self::Landscape16x9,
        Self::Ultrawide21x9,
    ];

    /// Returns the wire form, e.g. `"16:9"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait2x3 => "2:3",
            Self::Landscape3x2 => "3:2",
            Self::Portrait3x4 => "3:4",
            Self::Landscape4x3 => "4:3",
            Self::Portrait4x5 => "4:5",
            Self::Landscape5x4 => "5:4",
            Self::Portrait9x16 => "9:16",
            Self::Landscape16x9 => "16:9",
            Self::Ultrawide21x9 => "21:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = SpawnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == wanted)
            .ok_or_else(|| SpawnerError::Validation(format!("unsupported aspect ratio: {s}")))
    }
}

/// Output resolution class supported by the image provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Resolution {
    /// `1K`
    #[serde(rename = "1K")]
    OneK,
    /// `2K`
    #[serde(rename = "2K")]
    TwoK,
    /// `4K`
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    /// Every supported resolution, smallest first.
    pub const ALL: [Self; 3] = [Self::OneK, Self::TwoK, Self::FourK];

    /// Returns the wire form, e.g. `"2K"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = SpawnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|res| res.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SpawnerError::Validation(format!("unsupported resolution: {s}")))
    }
}

/// What a prompt block contributes to its card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Free-form sheet prompt.
    #[default]
    Text,
    /// Background plate driven by a reference image.
    Background,
    /// Layout sheet combining a prompt with a reference image.
    Layout,
}

/// Capability set of a [`BlockKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Capabilities {
    /// The block's text is meaningful prompt content.
    pub produces_text: bool,
    /// The block must carry a reference image.
    pub requires_file: bool,
}

impl BlockKind {
    /// Every block kind.
    pub const ALL: [Self; 3] = [Self::Text, Self::Background, Self::Layout];

    /// Returns the capability set of this kind.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        match self {
            Self::Text => Capabilities {
                produces_text: true,
                requires_file: false,
            },
            Self::Background => Capabilities {
                produces_text: false,
                requires_file: true,
            },
            Self::Layout => Capabilities {
                produces_text: true,
                requires_file: true,
            },
        }
    }

    /// Returns the wire form, e.g. `"background"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Background => "background",
            Self::Layout => "layout",
        }
    }
}

/// One ordered block of a sheet prompt. Each block becomes one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PromptBlock {
    /// Block kind.
    #[serde(default)]
    pub kind: BlockKind,
    /// Prompt text sent to the provider.
    #[serde(default)]
    pub text: String,
    /// Name of a stored reference image, required by file-backed kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl PromptBlock {
    /// Creates a plain text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Text,
            text: text.into(),
            reference: None,
        }
    }

    /// Returns `true` if the block carries no usable prompt text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_parses_every_supported_value() {
        for ratio in AspectRatio::ALL {
            let parsed = ratio.as_str().parse::<AspectRatio>();
            assert!(matches!(parsed, Ok(r) if r == ratio));
        }
    }

    #[test]
    fn aspect_ratio_rejects_unknown() {
        let parsed = "7:3".parse::<AspectRatio>();
        assert!(matches!(parsed, Err(SpawnerError::Validation(_))));
    }

    #[test]
    fn resolution_is_case_insensitive() {
        assert!(matches!("2k".parse::<Resolution>(), Ok(Resolution::TwoK)));
        assert!(matches!(" 4K ".parse::<Resolution>(), Ok(Resolution::FourK)));
        assert!("8K".parse::<Resolution>().is_err());
    }

    #[test]
    fn wire_forms_match_serde() {
        let Ok(json) = serde_json::to_string(&AspectRatio::Landscape16x9) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"16:9\"");
        let Ok(json) = serde_json::to_string(&Resolution::OneK) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"1K\"");
    }

    #[test]
    fn capabilities_per_kind() {
        assert!(!BlockKind::Text.capabilities().requires_file);
        assert!(BlockKind::Background.capabilities().requires_file);
        assert!(!BlockKind::Background.capabilities().produces_text);
        let layout = BlockKind::Layout.capabilities();
        assert!(layout.produces_text && layout.requires_file);
    }

    #[test]
    fn block_kind_defaults_to_text_when_missing() {
        let Ok(block) = serde_json::from_str::<PromptBlock>(r#"{"text":"a forest"}"#) else {
            panic!("deserialization failed");
        };
        assert_eq!(block.kind, BlockKind::Text);
        assert!(block.reference.is_none());
        assert!(!block.is_blank());
        assert!(PromptBlock::text("  \n").is_blank());
    }
}
