//! Per-shop prompt settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest brand voice description accepted, in characters.
pub const MAX_BRAND_VOICE_CHARS: usize = 500;
/// Allowed range of `max_description_words`.
pub const DESCRIPTION_WORDS_RANGE: std::ops::RangeInclusive<u32> = 50..=600;

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_DESCRIPTION_WORDS: u32 = 180;

/// Validation failures for [`ShopSettings`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("brand voice must be at most {MAX_BRAND_VOICE_CHARS} characters")]
    BrandVoiceTooLong,
    #[error("target language must be a 2-8 character language tag")]
    InvalidLanguage,
    #[error("max description words must be between 50 and 600")]
    DescriptionWordsOutOfRange,
}

/// Settings read into every prompt for a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSettings {
    /// Free-text tone guidance, e.g. "playful, short sentences".
    pub brand_voice: String,
    /// Language of generated copy (BCP 47 tag such as `en` or `pt-BR`).
    pub target_language: String,
    /// Upper bound on generated description length.
    pub max_description_words: u32,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            brand_voice: String::new(),
            target_language: DEFAULT_LANGUAGE.to_string(),
            max_description_words: DEFAULT_DESCRIPTION_WORDS,
        }
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub brand_voice: Option<String>,
    pub target_language: Option<String>,
    pub max_description_words: Option<u32>,
}

impl ShopSettings {
    /// Check every field against its constraint.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.brand_voice.chars().count() > MAX_BRAND_VOICE_CHARS {
            return Err(SettingsError::BrandVoiceTooLong);
        }
        if !is_language_tag(&self.target_language) {
            return Err(SettingsError::InvalidLanguage);
        }
        if !DESCRIPTION_WORDS_RANGE.contains(&self.max_description_words) {
            return Err(SettingsError::DescriptionWordsOutOfRange);
        }
        Ok(())
    }

    /// Apply a partial update and validate the result.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint of the merged settings.
    pub fn merge(mut self, update: SettingsUpdate) -> Result<Self, SettingsError> {
        if let Some(brand_voice) = update.brand_voice {
            self.brand_voice = brand_voice.trim().to_string();
        }
        if let Some(language) = update.target_language {
            self.target_language = language.trim().to_string();
        }
        if let Some(words) = update.max_description_words {
            self.max_description_words = words;
        }
        self.validate()?;
        Ok(self)
    }
}

fn is_language_tag(tag: &str) -> bool {
    (2..=8).contains(&tag.len()) && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = ShopSettings::default();
        assert_eq!(settings.target_language, "en");
        assert_eq!(settings.max_description_words, 180);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let merged = ShopSettings::default()
            .merge(SettingsUpdate {
                brand_voice: Some("  warm and direct ".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(merged.brand_voice, "warm and direct");
        assert_eq!(merged.max_description_words, 180);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let too_short = ShopSettings::default().merge(SettingsUpdate {
            max_description_words: Some(49),
            ..Default::default()
        });
        assert_eq!(too_short, Err(SettingsError::DescriptionWordsOutOfRange));

        let too_long = ShopSettings::default().merge(SettingsUpdate {
            brand_voice: Some("x".repeat(501)),
            ..Default::default()
        });
        assert_eq!(too_long, Err(SettingsError::BrandVoiceTooLong));

        let bad_language = ShopSettings::default().merge(SettingsUpdate {
            target_language: Some("english please".to_string()),
            ..Default::default()
        });
        assert_eq!(bad_language, Err(SettingsError::InvalidLanguage));
    }

    #[test]
    fn test_accepts_region_subtag() {
        let merged = ShopSettings::default()
            .merge(SettingsUpdate {
                target_language: Some("pt-BR".to_string()),
                max_description_words: Some(600),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(merged.target_language, "pt-BR");
    }
}
