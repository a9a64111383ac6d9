//! Per-product ad copy, stored as a JSON metafield.

use serde::{Deserialize, Serialize};

use crate::batch::{BatchTransform, StepError};
use crate::gemini::ContentGenerator;
use crate::models::ShopSettings;
use crate::shopify::{CommerceAdmin, MetafieldInput, ProductSnapshot};

use super::prompts;

/// Tag marking products that have ad copy.
pub const TAG: &str = "ad-copy-ready";

/// Metafield namespace owned by the app.
pub const METAFIELD_NAMESPACE: &str = "shelfwise";

/// Metafield key holding the ad copy.
pub const METAFIELD_KEY: &str = "ad_copy";

const MAX_HEADLINE_CHARS: usize = 40;
const MAX_PRIMARY_TEXT_CHARS: usize = 125;
const MAX_CTA_CHARS: usize = 20;

/// Generated ad copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdCopy {
    pub headline: String,
    pub primary_text: String,
    pub call_to_action: String,
}

impl AdCopy {
    fn validate(self) -> Result<Self, StepError> {
        let fields = [
            ("headline", &self.headline, MAX_HEADLINE_CHARS),
            ("primary_text", &self.primary_text, MAX_PRIMARY_TEXT_CHARS),
            ("call_to_action", &self.call_to_action, MAX_CTA_CHARS),
        ];
        for (name, value, max) in fields {
            let len = value.trim().chars().count();
            if len == 0 || len > max {
                return Err(StepError::Generation(format!(
                    "{name} must be 1..={max} characters, got {len}"
                )));
            }
        }
        Ok(Self {
            headline: self.headline.trim().to_string(),
            primary_text: self.primary_text.trim().to_string(),
            call_to_action: self.call_to_action.trim().to_string(),
        })
    }
}

/// Generates ad copy and stores it in the `shelfwise.ad_copy` metafield.
pub struct AdCopyTransform<'a, G, A> {
    generator: &'a G,
    admin: &'a A,
    settings: &'a ShopSettings,
}

impl<'a, G, A> AdCopyTransform<'a, G, A> {
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

impl<G: ContentGenerator, A: CommerceAdmin> BatchTransform for AdCopyTransform<'_, G, A> {
    type Entity = ProductSnapshot;
    type Patch = AdCopy;

    fn entity_id(entity: &ProductSnapshot) -> &str {
        &entity.id
    }

    async fn generate(&self, entity: &ProductSnapshot) -> Result<AdCopy, StepError> {
        let request = prompts::ad_copy_request(entity, self.settings);
        let copy: AdCopy = self
            .generator
            .generate_json(&request)
            .await
            .map_err(StepError::generation)?;
        copy.validate()
    }

    async fn commit(&self, entity: &ProductSnapshot, patch: AdCopy) -> Result<String, StepError> {
        let value = serde_json::to_string(&patch)
            .map_err(|e| StepError::Commit(format!("failed to encode ad copy: {e}")))?;
        let input = MetafieldInput {
            owner_id: entity.id.clone(),
            namespace: METAFIELD_NAMESPACE.to_string(),
            key: METAFIELD_KEY.to_string(),
            value_type: "json".to_string(),
            value,
        };
        self.admin
            .set_metafield(&input)
            .await
            .map_err(StepError::commit)?;
        Ok(format!("headline: {:?}", patch.headline))
    }

    async fn apply_tag(&self, entity: &ProductSnapshot, tag: &str) -> Result<(), StepError> {
        self.admin
            .add_tags(&entity.id, &[tag.to_string()])
            .await
            .map_err(StepError::commit)
    }
}
