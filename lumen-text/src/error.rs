use std::path::PathBuf;
use thiserror::Error;

use crate::raster::RasterError;
use crate::utf8::Utf8Error;

/// Errors surfaced by the text pipeline.
///
/// All of them are recoverable: callers log and fall back to empty
/// output for the affected text.
#[derive(Error, Debug)]
pub enum TextError {
    #[error("invalid UTF-8 text: {0}")]
    InvalidUtf8(#[from] Utf8Error),

    #[error("font {} could not be loaded", .0.display())]
    FontLoad(PathBuf),

    #[error("glyph generation failed for {} at {size}px: {source}", font.display())]
    GlyphGeneration {
        font: PathBuf,
        size: u32,
        #[source]
        source: RasterError,
    },

    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}
