//! Request intake validation.
//!
//! [`GenerationIntake`] is the raw, untrusted form of a submission. It is
//! turned into a [`GenerationRequest`] only after every field checks out, so
//! a rejected submission never creates cards.

use chrono::Utc;

use super::prompt_file::parse_prompt_yaml;
use super::record::GenerationRequest;
use super::settings::{AspectRatio, PromptBlock, Resolution};
use super::{ProjectId, RequestId};
use crate::error::SpawnerError;

/// Unvalidated submission.
#[derive(Debug, Clone, Default)]
pub struct GenerationIntake {
    /// Aspect ratio in wire form, e.g. `"16:9"`.
    pub aspect_ratio: String,
    /// Resolution in wire form, e.g. `"2K"`.
    pub resolution: String,
    /// Ordered prompt blocks, blanks allowed.
    pub blocks: Vec<PromptBlock>,
    /// Owning project, if any.
    pub project_id: Option<ProjectId>,
    /// Names of stored reference images sent with every card.
    pub references: Vec<String>,
}

impl GenerationIntake {
    /// Text-only intake with the default settings.
    #[must_use]
    pub fn from_prompts<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aspect_ratio: AspectRatio::Square.as_str().to_string(),
            resolution: Resolution::OneK.as_str().to_string(),
            blocks: prompts.into_iter().map(PromptBlock::text).collect(),
            ..Self::default()
        }
    }

    /// Appends the prompts of a YAML prompt file after the existing blocks.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] if the file is empty, malformed
    /// or yields no prompt.
    pub fn append_prompt_file(&mut self, raw: &str) -> Result<(), SpawnerError> {
        let prompts = parse_prompt_yaml(raw)?;
        self.blocks.extend(prompts.into_iter().map(PromptBlock::text));
        Ok(())
    }

    /// Trimmed, non-empty reference names named anywhere in the intake.
    #[must_use]
    pub fn reference_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .blocks
            .iter()
            .filter_map(|b| b.reference.as_deref())
            .chain(self.references.iter().map(String::as_str))
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Validates the intake and builds a request.
    ///
    /// Blank text blocks are dropped first. `reference_exists` answers
    /// whether a named reference image is in the store.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] for an empty block list, an
    /// unsupported ratio or resolution, a file-backed block without a
    /// reference, or a reference the store does not hold.
    pub fn validate<F>(self, reference_exists: F) -> Result<GenerationRequest, SpawnerError>
    where
        F: Fn(&str) -> bool,
    {
        let aspect_ratio: AspectRatio = self.aspect_ratio.parse()?;
        let resolution: Resolution = self.resolution.parse()?;

        let blocks: Vec<PromptBlock> = self
            .blocks
            .into_iter()
            .filter(|b| !b.is_blank() || !b.kind.capabilities().produces_text)
            .map(|mut b| {
                b.text = b.text.trim().to_string();
                b.reference = b.reference.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
                b
            })
            .collect();
        if blocks.is_empty() {
            return Err(SpawnerError::Validation(
                "at least one non-empty prompt block is required".to_string(),
            ));
        }

        for (position, block) in blocks.iter().enumerate() {
            match &block.reference {
                Some(name) if !reference_exists(name) => {
                    return Err(SpawnerError::Validation(format!(
                        "block {position} references unknown image {name}"
                    )));
                }
                None if block.kind.capabilities().requires_file => {
                    return Err(SpawnerError::Validation(format!(
                        "block {position} of kind {} requires a reference image",
                        block.kind.as_str()
                    )));
                }
                _ => {}
            }
        }

        let references: Vec<String> = self
            .references
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if let Some(missing) = references.iter().find(|r| !reference_exists(r)) {
            return Err(SpawnerError::Validation(format!(
                "unknown reference image {missing}"
            )));
        }

        Ok(GenerationRequest {
            id: RequestId::new(),
            created_at: Utc::now(),
            aspect_ratio,
            resolution,
            blocks,
            project_id: self.project_id,
            references,
            credential: None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::BlockKind;

    fn none_exist(_: &str) -> bool {
        false
    }

    #[test]
    fn drops_blank_blocks_and_keeps_order() {
        let intake = GenerationIntake::from_prompts(["first", "   ", "", "second"]);
        let Ok(request) = intake.validate(none_exist) else {
            panic!("expected valid intake");
        };
        let texts: Vec<&str> = request.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(request.aspect_ratio, AspectRatio::Square);
        assert_eq!(request.resolution, Resolution::OneK);
    }

    #[test]
    fn all_blank_is_rejected() {
        let intake = GenerationIntake::from_prompts([" ", "\n"]);
        assert!(matches!(
            intake.validate(none_exist),
            Err(SpawnerError::Validation(_))
        ));
        assert!(GenerationIntake::default().validate(none_exist).is_err());
    }

    #[test]
    fn unsupported_settings_are_rejected() {
        let mut intake = GenerationIntake::from_prompts(["a"]);
        intake.aspect_ratio = "7:5".to_string();
        assert!(intake.validate(none_exist).is_err());

        let mut intake = GenerationIntake::from_prompts(["a"]);
        intake.resolution = "8K".to_string();
        assert!(intake.validate(none_exist).is_err());
    }

    #[test]
    fn file_backed_block_needs_existing_reference() {
        let background = PromptBlock {
            kind: BlockKind::Background,
            text: String::new(),
            reference: None,
        };
        let mut intake = GenerationIntake::from_prompts(Vec::<String>::new());
        intake.blocks = vec![background.clone()];
        assert!(intake.clone().validate(|_| true).is_err());

        intake.blocks = vec![PromptBlock {
            reference: Some("abc.png".to_string()),
            ..background
        }];
        assert!(intake.clone().validate(none_exist).is_err());
        let Ok(request) = intake.validate(|name| name == "abc.png") else {
            panic!("expected valid intake");
        };
        assert_eq!(request.blocks.len(), 1);
    }

    #[test]
    fn prompt_file_is_appended_after_inline_prompts() {
        let mut intake = GenerationIntake::from_prompts(["inline"]);
        let raw = "slides:\n  - title: Hero\n    body: portrait\n  - closing\n";
        assert!(intake.append_prompt_file(raw).is_ok());
        let Ok(request) = intake.validate(none_exist) else {
            panic!("expected valid intake");
        };
        let texts: Vec<&str> = request.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["inline", "Hero\n\nportrait", "closing"]);
    }

    #[test]
    fn bad_prompt_file_leaves_intake_unchanged() {
        let mut intake = GenerationIntake::from_prompts(["inline"]);
        assert!(matches!(
            intake.append_prompt_file("slides: []"),
            Err(SpawnerError::Validation(_))
        ));
        assert_eq!(intake.blocks.len(), 1);
    }

    #[test]
    fn reference_names_are_trimmed_and_unique() {
        let mut intake = GenerationIntake::from_prompts(["a"]);
        intake.blocks.push(PromptBlock {
            kind: BlockKind::Background,
            text: String::new(),
            reference: Some(" bg.png ".to_string()),
        });
        intake.references = vec!["bg.png".to_string(), "  ".to_string(), "detail.png".to_string()];
        assert_eq!(
            intake.reference_names(),
            vec!["bg.png".to_string(), "detail.png".to_string()]
        );
    }

    #[test]
    fn shared_references_must_exist() {
        let mut intake = GenerationIntake::from_prompts(["a"]);
        intake.references = vec!["missing.png".to_string()];
        assert!(intake.clone().validate(none_exist).is_err());
        let Ok(request) = intake.validate(|_| true) else {
            panic!("expected valid intake");
        };
        assert_eq!(request.references, vec!["missing.png".to_string()]);
    }
}
