//! Engine configuration.
//!
//! Every field has a default, so a JSON document only needs to name the
//! values it overrides:
//!
//! ```json
//! { "line_spacing": 1.25, "atlas_cache_capacity": 64 }
//! ```

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

use crate::atlas::RASTER_PADDING;
use crate::error::TextError;
use crate::layout::WordWrap;

/// Characters every atlas carries when the font supports them.
pub const BASELINE_CHARACTERS: &str = concat!(
    "0123456789",
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    "abcdefghijklmnopqrstuvwxyz",
    " !\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~",
);

/// Default regional extras (Western European accented letters).
pub const DEFAULT_EXTRA_CHARACTERS: &str = "ÄÖÜäöüßÀÁÂÉÈÊÍÓÚàáâçéèêëíîïñóôúû€";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Characters merged into every atlas build.
    pub baseline_characters: String,
    /// Locale-specific characters merged after the baseline set.
    pub extra_characters: String,
    /// Empty pixels around every glyph in an atlas image.
    pub atlas_padding: u32,
    /// Line height as a multiple of the font height.
    pub line_spacing: f32,
    /// Maximum number of cached atlases (`None` = never evict).
    pub atlas_cache_capacity: Option<usize>,
    /// Wrap mode for new text blocks.
    pub default_wrap: WordWrap,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            baseline_characters: BASELINE_CHARACTERS.to_string(),
            extra_characters: DEFAULT_EXTRA_CHARACTERS.to_string(),
            atlas_padding: RASTER_PADDING,
            line_spacing: 1.5,
            atlas_cache_capacity: None,
            default_wrap: WordWrap::Bounded,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, TextError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TextError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Atlas cache bound in the form the cache expects.
    pub fn atlas_capacity(&self) -> Option<NonZeroUsize> {
        self.atlas_cache_capacity.and_then(NonZeroUsize::new)
    }

    /// Baseline and regional characters, in that order.
    pub fn atlas_extra_characters(&self) -> impl Iterator<Item = char> + '_ {
        self.baseline_characters
            .chars()
            .chain(self.extra_characters.chars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.line_spacing, 1.5);
        assert_eq!(config.atlas_cache_capacity, None);
        assert_eq!(config.atlas_padding, 2);
        assert!(config.atlas_capacity().is_none());
        assert!(config.baseline_characters.contains('A'));
        assert!(config.baseline_characters.contains('~'));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "line_spacing": 1.25, "atlas_cache_capacity": 8 }"#)
            .unwrap();
        assert_eq!(config.line_spacing, 1.25);
        assert_eq!(config.atlas_capacity().map(|c| c.get()), Some(8));
        assert_eq!(config.extra_characters, DEFAULT_EXTRA_CHARACTERS);
        assert_eq!(config.default_wrap, WordWrap::Bounded);
    }

    #[test]
    fn test_wrap_mode_names() {
        let config = EngineConfig::from_json(r#"{ "default_wrap": "on" }"#).unwrap();
        assert_eq!(config.default_wrap, WordWrap::On);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig {
            extra_characters: "ąćęłńóśźż".into(),
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = EngineConfig::from_json("{ line_spacing: }").unwrap_err();
        assert!(matches!(err, TextError::Config(_)));
    }

    #[test]
    fn test_zero_capacity_means_unbounded() {
        let config = EngineConfig {
            atlas_cache_capacity: Some(0),
            ..Default::default()
        };
        assert!(config.atlas_capacity().is_none());
    }
}
