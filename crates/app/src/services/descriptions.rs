//! Product title and description optimization.

use serde::{Deserialize, Serialize};

use crate::batch::{BatchTransform, StepError};
use crate::gemini::ContentGenerator;
use crate::models::ShopSettings;
use crate::shopify::{CommerceAdmin, ProductContentUpdate, ProductSnapshot};

use super::prompts::{self, MAX_TITLE_CHARS};

/// Tag marking products whose copy has been rewritten.
pub const TAG: &str = "ai-optimized";

/// Generated title and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizedCopy {
    pub title: String,
    pub description_html: String,
}

impl OptimizedCopy {
    fn validate(self) -> Result<Self, StepError> {
        let title = self.title.trim().to_string();
        let description_html = self.description_html.trim().to_string();
        if title.is_empty() || description_html.is_empty() {
            return Err(StepError::Generation(
                "model returned an empty title or description".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(StepError::Generation(format!(
                "title longer than {MAX_TITLE_CHARS} characters"
            )));
        }
        Ok(Self {
            title,
            description_html,
        })
    }
}

/// Rewrites title and description, then tags the product.
pub struct DescriptionTransform<'a, G, A> {
    generator: &'a G,
    admin: &'a A,
    settings: &'a ShopSettings,
}

impl<'a, G, A> DescriptionTransform<'a, G, A> {
    /// Create the transform for one shop.
    #[must_use]
    pub const fn new(generator: &'a G, admin: &'a A, settings: &'a ShopSettings) -> Self {
        Self {
            generator,
            admin,
            settings,
        }
    }
}

impl<G: ContentGenerator, A: CommerceAdmin> BatchTransform for DescriptionTransform<'_, G, A> {
    type Entity = ProductSnapshot;
    type Patch = OptimizedCopy;

    fn entity_id(entity: &ProductSnapshot) -> &str {
        &entity.id
    }

    async fn generate(&self, entity: &ProductSnapshot) -> Result<OptimizedCopy, StepError> {
        let request = prompts::description_request(entity, self.settings);
        let copy: OptimizedCopy = self
            .generator
            .generate_json(&request)
            .await
            .map_err(StepError::generation)?;
        copy.validate()
    }

    async fn commit(&self, entity: &ProductSnapshot, patch: OptimizedCopy) -> Result<String, StepError> {
        let summary = format!(
            "title: {:?} -> {:?}, description: {} chars",
            entity.title,
            patch.title,
            patch.description_html.chars().count()
        );
        let update = ProductContentUpdate {
            id: entity.id.clone(),
            title: Some(patch.title),
            description_html: Some(patch.description_html),
        };
        self.admin
            .update_product(&update)
            .await
            .map_err(StepError::commit)?;
        Ok(summary)
    }

    async fn apply_tag(&self, entity: &ProductSnapshot, tag: &str) -> Result<(), StepError> {
        self.admin
            .add_tags(&entity.id, &[tag.to_string()])
            .await
            .map_err(StepError::commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_trims_and_rejects_empty() {
        let copy = OptimizedCopy {
            title: "  Mug  ".to_string(),
            description_html: "<p>Nice</p>\n".to_string(),
        };
        let valid = copy.validate();
        assert!(matches!(valid, Ok(ref c) if c.title == "Mug" && c.description_html == "<p>Nice</p>"));

        let empty = OptimizedCopy {
            title: "Mug".to_string(),
            description_html: "   ".to_string(),
        };
        assert!(matches!(empty.validate(), Err(StepError::Generation(_))));
    }

    #[test]
    fn test_validate_rejects_long_title() {
        let copy = OptimizedCopy {
            title: "x".repeat(MAX_TITLE_CHARS + 1),
            description_html: "<p>ok</p>".to_string(),
        };
        assert!(copy.validate().is_err());
    }
}
