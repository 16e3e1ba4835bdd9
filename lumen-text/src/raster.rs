//! Rasterizer seam: the boundary to the glyph rasterization library.
//!
//! Everything that crosses this boundary is an owned Rust value: coverage
//! sets are `Vec<Codepoint>`, atlases are [`RasterizedGlyphs`] with their
//! own pixel buffer. Implementations report failures as [`RasterError`];
//! they never panic on bad font files.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utf8::Codepoint;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("failed to read font file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("glyphs do not fit in a {max}x{max} atlas")]
    AtlasTooLarge { max: u32 },
    #[error("rasterizer produced an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
}

/// A request to rasterize a fixed set of codepoints from one font.
#[derive(Clone, Debug)]
pub struct GlyphRequest<'a> {
    pub font: &'a Path,
    /// Pixel size.
    pub size: u32,
    /// Codepoints in generation order; index 0 is the line-height reference.
    pub codepoints: &'a [Codepoint],
    /// Empty pixels kept around every glyph inside the atlas image.
    pub padding: u32,
}

/// Pixel metrics of one rasterized glyph.
///
/// Bearings are measured from the pen origin on the baseline, y up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphMetrics {
    pub codepoint: Codepoint,
    /// Bitmap rectangle inside the atlas image.
    pub atlas_x: u32,
    pub atlas_y: u32,
    pub width: u32,
    pub height: u32,
    /// Pen origin to the left edge of the bitmap.
    pub left_bearing: f32,
    /// Baseline to the top edge of the bitmap.
    pub top_bearing: f32,
    /// Horizontal pen advance.
    pub advance_x: f32,
}

impl GlyphMetrics {
    /// Space between the right edge of the bitmap and the next pen origin.
    pub fn right_side_bearing(&self) -> f32 {
        self.advance_x - self.left_bearing - self.width as f32
    }

    /// Baseline to the bottom edge of the bitmap (positive below baseline).
    pub fn bottom_bearing(&self) -> f32 {
        self.height as f32 - self.top_bearing
    }
}

/// Vertical font metrics at one pixel size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineMetrics {
    /// Baseline to the top of the line box.
    pub ascent: f32,
    /// Baseline to the bottom of the line box, as a positive distance.
    pub descent: f32,
}

/// RGBA8 image holding every glyph of one atlas.
#[derive(Clone, Debug, Default)]
pub struct AtlasImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl AtlasImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize * 4],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGBA value at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        self.pixels.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Output of one glyph generation call.
#[derive(Clone, Debug)]
pub struct RasterizedGlyphs {
    pub image: AtlasImage,
    /// Metrics for every codepoint the font could render, in request order.
    pub glyphs: Vec<GlyphMetrics>,
    pub line: LineMetrics,
}

impl RasterizedGlyphs {
    /// Metrics of `cp`, if it was rasterized.
    pub fn glyph(&self, cp: Codepoint) -> Option<&GlyphMetrics> {
        self.glyphs.iter().find(|g| g.codepoint == cp)
    }
}

/// The glyph rasterization library as seen by the engine.
///
/// Calls may be slow (file I/O, rasterization). The caches above this
/// trait make sure each font file's coverage and each exact atlas key are
/// requested once.
pub trait Rasterizer: Send + Sync {
    /// Every codepoint `font` has a glyph for.
    fn supported_characters(&self, font: &Path) -> Result<Vec<Codepoint>, RasterError>;

    /// Rasterize `request.codepoints` into a single atlas image.
    fn generate_glyphs(&self, request: &GlyphRequest<'_>) -> Result<RasterizedGlyphs, RasterError>;

    /// Kerning adjustment between `left` and `right` at `size`, in pixels.
    fn kerning(&self, font: &Path, size: u32, left: Codepoint, right: Codepoint) -> f32;
}
