//! Built-in prompts for the copywriting pipelines.
//!
//! Every prompt carries the shop's brand voice and target language. Answers
//! are JSON constrained by a response schema, so the pipelines parse typed
//! structs instead of scraping free text.

use serde_json::json;

use crate::gemini::GenerationRequest;
use crate::models::ShopSettings;
use crate::shopify::{ProductImage, ProductSnapshot};

const DESCRIPTION_TEMPERATURE: f32 = 0.7;
const ALT_TEXT_TEMPERATURE: f32 = 0.3;
const AD_TEMPERATURE: f32 = 0.9;

/// Maximum alt text length accepted back from the model.
pub const MAX_ALT_TEXT_CHARS: usize = 125;

/// Maximum product title length accepted back from the model.
pub const MAX_TITLE_CHARS: usize = 255;

fn system_instruction(settings: &ShopSettings, task: &str) -> String {
    let mut system = format!(
        "You are an e-commerce copywriter for a Shopify store. {task} \
         Write in the language with ISO code '{}'. Never invent facts such as \
         materials, dimensions or certifications that the input does not state.",
        settings.target_language
    );
    if !settings.brand_voice.trim().is_empty() {
        system.push_str("\nBrand voice: ");
        system.push_str(settings.brand_voice.trim());
    }
    system
}

fn product_context(product: &ProductSnapshot) -> String {
    let mut context = format!("Title: {}\n", product.title);
    if !product.product_type.is_empty() {
        context.push_str(&format!("Type: {}\n", product.product_type));
    }
    if !product.vendor.is_empty() {
        context.push_str(&format!("Vendor: {}\n", product.vendor));
    }
    if !product.tags.is_empty() {
        context.push_str(&format!("Tags: {}\n", product.tags.join(", ")));
    }
    context.push_str(&format!(
        "Current description (HTML): {}\n",
        product.description_html
    ));
    context
}

/// Rewrite a product's title and HTML description.
#[must_use]
pub fn description_request(product: &ProductSnapshot, settings: &ShopSettings) -> GenerationRequest {
    let system = system_instruction(
        settings,
        "Rewrite product titles and descriptions so they are clear, persuasive and search friendly.",
    );
    let prompt = format!(
        "{}\nReturn an improved title of at most {MAX_TITLE_CHARS} characters and a description \
         of at most {} words as simple HTML (<p>, <ul>, <li>, <strong> only).",
        product_context(product),
        settings.max_description_words
    );

    GenerationRequest::text(prompt)
        .with_system(system)
        .with_temperature(DESCRIPTION_TEMPERATURE)
        .with_schema(json!({
            "type": "OBJECT",
            "properties": {
                "title": {"type": "STRING"},
                "description_html": {"type": "STRING"}
            },
            "required": ["title", "description_html"]
        }))
}

/// Alt text for every image of a product.
#[must_use]
pub fn alt_text_request(product: &ProductSnapshot, settings: &ShopSettings) -> GenerationRequest {
    let system = system_instruction(
        settings,
        "Write concise, descriptive image alt text for accessibility and search.",
    );
    let images = product
        .images
        .iter()
        .enumerate()
        .map(|(i, image)| image_line(i, image))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        "{}\nImages:\n{images}\nReturn one alt text per image, at most {MAX_ALT_TEXT_CHARS} \
         characters each, keyed by the image id.",
        product_context(product)
    );

    GenerationRequest::text(prompt)
        .with_system(system)
        .with_temperature(ALT_TEXT_TEMPERATURE)
        .with_schema(json!({
            "type": "OBJECT",
            "properties": {
                "images": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "id": {"type": "STRING"},
                            "alt": {"type": "STRING"}
                        },
                        "required": ["id", "alt"]
                    }
                }
            },
            "required": ["images"]
        }))
}

fn image_line(index: usize, image: &ProductImage) -> String {
    format!(
        "{}. id={} url={} current_alt={}",
        index + 1,
        image.id,
        image.url,
        image.alt.as_deref().unwrap_or("(none)")
    )
}

/// Social ad copy for a product.
#[must_use]
pub fn ad_copy_request(product: &ProductSnapshot, settings: &ShopSettings) -> GenerationRequest {
    let system = system_instruction(
        settings,
        "Write short social media ad copy that drives clicks without clickbait.",
    );
    let prompt = format!(
        "{}\nReturn a headline of at most 40 characters, primary text of at most 125 characters \
         and a call to action of at most 20 characters.",
        product_context(product)
    );

    GenerationRequest::text(prompt)
        .with_system(system)
        .with_temperature(AD_TEMPERATURE)
        .with_schema(json!({
            "type": "OBJECT",
            "properties": {
                "headline": {"type": "STRING"},
                "primary_text": {"type": "STRING"},
                "call_to_action": {"type": "STRING"}
            },
            "required": ["headline", "primary_text", "call_to_action"]
        }))
}
