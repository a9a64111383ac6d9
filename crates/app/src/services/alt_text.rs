//! Image alt text generation.

use serde::Deserialize;

use crate::batch::{BatchTransform, StepError};
use crate::gemini::ContentGenerator;
use crate::models::ShopSettings;
use crate::shopify::{CommerceAdmin, ProductSnapshot};

use super::prompts::{self, MAX_ALT_TEXT_CHARS};

/// Tag marking products whose images have alt text.
pub const TAG: &str = "alt-text-done";

/// Alt text for one image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageAlt {
    pub id: String,
    pub alt: String,
}

#[derive(Debug, Deserialize)]
struct AltTextAnswer {
    images: Vec<ImageAlt>,
}

/// Writes alt text for every image of a product, then tags it.
///
/// Products without images are tagged directly so later runs skip them.
pub struct AltTextTransform<'a, G, A> {
    generator: &'a G,
    admin: &'a A,
    settings: &'a ShopSettings,
}

impl<'a, G, A> AltTextTransform<'a, G, A> {
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

/// Pick one answer per product image, trimmed to length.
///
/// Every image must be covered. A partial answer fails the product so it
/// stays untagged and is picked up again by the next run.
fn sanitize(product: &ProductSnapshot, answer: Vec<ImageAlt>) -> Result<Vec<ImageAlt>, StepError> {
    let usable: Vec<ImageAlt> = answer
        .into_iter()
        .filter_map(|a| {
            let alt: String = a.alt.trim().chars().take(MAX_ALT_TEXT_CHARS).collect();
            (!alt.is_empty()).then_some(ImageAlt { id: a.id, alt })
        })
        .collect();

    let alts: Vec<ImageAlt> = product
        .images
        .iter()
        .filter_map(|image| usable.iter().find(|a| a.id == image.id).cloned())
        .collect();

    if alts.len() < product.images.len() {
        return Err(StepError::Generation(format!(
            "model returned alt text for {} of {} image(s)",
            alts.len(),
            product.images.len()
        )));
    }
    Ok(alts)
}

impl<G: ContentGenerator, A: CommerceAdmin> BatchTransform for AltTextTransform<'_, G, A> {
    type Entity = ProductSnapshot;
    type Patch = Vec<ImageAlt>;

    fn entity_id(entity: &ProductSnapshot) -> &str {
        &entity.id
    }

    async fn generate(&self, entity: &ProductSnapshot) -> Result<Vec<ImageAlt>, StepError> {
        if entity.images.is_empty() {
            return Ok(Vec::new());
        }
        let request = prompts::alt_text_request(entity, self.settings);
        let answer: AltTextAnswer = self
            .generator
            .generate_json(&request)
            .await
            .map_err(StepError::generation)?;
        sanitize(entity, answer.images)
    }

    async fn commit(&self, _entity: &ProductSnapshot, patch: Vec<ImageAlt>) -> Result<String, StepError> {
        if patch.is_empty() {
            return Ok("no images".to_string());
        }
        for image in &patch {
            self.admin
                .update_image_alt(&image.id, &image.alt)
                .await
                .map_err(StepError::commit)?;
        }
        Ok(format!("{} image(s) updated", patch.len()))
    }

    async fn apply_tag(&self, entity: &ProductSnapshot, tag: &str) -> Result<(), StepError> {
        self.admin
            .add_tags(&entity.id, &[tag.to_string()])
            .await
            .map_err(StepError::commit)
    }
}
