//! Deterministic in-memory rasterizer.
//!
//! Fonts are declared by name with the characters they cover; glyphs are
//! solid boxes with simple, predictable metrics. Used by the test suites
//! and benches, and handy for headless layout where real font files are
//! not available.
//!
//! Metrics at pixel size `s` (integer division):
//!
//! | glyph            | width | left bearing | advance     | top bearing          | height           |
//! |------------------|-------|--------------|-------------|----------------------|------------------|
//! | space            | 0     | 0            | `s / 4`     | 0                    | 0                |
//! | `gjpqy`          | `s/2` | 1            | `s / 2 + 2` | `ascent`             | `ascent+descent` |
//! | non-ASCII upper  | `s/2` | 1            | `s / 2 + 2` | `ascent + descent/2` | same as top      |
//! | everything else  | `s/2` | 1            | `s / 2 + 2` | `ascent`             | `ascent`         |
//!
//! with `ascent = 4s/5` and `descent = s/5`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::raster::{
    AtlasImage, GlyphMetrics, GlyphRequest, LineMetrics, RasterError, RasterizedGlyphs, Rasterizer,
};
use crate::utf8::Codepoint;

#[derive(Debug, Default)]
struct SyntheticFont {
    coverage: HashSet<Codepoint>,
    kerning: HashMap<(Codepoint, Codepoint), f32>,
    broken: bool,
}

/// See the module documentation for the glyph metrics it produces.
#[derive(Debug, Default)]
pub struct SyntheticRasterizer {
    fonts: HashMap<PathBuf, SyntheticFont>,
    coverage_calls: AtomicUsize,
    generate_calls: AtomicUsize,
}

impl SyntheticRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a font covering `chars`.
    pub fn with_font(mut self, path: impl Into<PathBuf>, chars: &str) -> Self {
        let font = self.fonts.entry(path.into()).or_default();
        font.coverage.extend(chars.chars().map(|c| c as Codepoint));
        self
    }

    /// Declare a font covering printable ASCII.
    pub fn with_ascii_font(self, path: impl Into<PathBuf>) -> Self {
        let ascii: String = (0x20u8..0x7F).map(char::from).collect();
        self.with_font(path, &ascii)
    }

    /// Add a kerning pair to an already declared font.
    pub fn with_kerning(mut self, path: impl AsRef<Path>, left: char, right: char, value: f32) -> Self {
        if let Some(font) = self.fonts.get_mut(path.as_ref()) {
            font.kerning.insert((left as Codepoint, right as Codepoint), value);
        }
        self
    }

    /// Make glyph generation for `path` return an empty image.
    pub fn with_broken_glyphs(mut self, path: impl AsRef<Path>) -> Self {
        if let Some(font) = self.fonts.get_mut(path.as_ref()) {
            font.broken = true;
        }
        self
    }

    /// Number of coverage queries served so far.
    pub fn coverage_calls(&self) -> usize {
        self.coverage_calls.load(Ordering::Relaxed)
    }

    /// Number of glyph generation calls served so far.
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::Relaxed)
    }

    fn font(&self, path: &Path) -> Result<&SyntheticFont, RasterError> {
        self.fonts.get(path).ok_or_else(|| RasterError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "unknown synthetic font"),
        })
    }

    /// Vertical metrics at `size`.
    pub fn line_metrics(size: u32) -> LineMetrics {
        LineMetrics {
            ascent: (size * 4 / 5) as f32,
            descent: (size / 5) as f32,
        }
    }

    /// Glyph metrics at `size`, before atlas placement.
    pub fn glyph_metrics(cp: Codepoint, size: u32) -> GlyphMetrics {
        let line = Self::line_metrics(size);
        let half = size / 2;
        let c = char::from_u32(cp).unwrap_or('\u{FFFD}');

        let (width, left_bearing, advance, top, height) = if c == ' ' {
            (0, 0.0, (size / 4) as f32, 0.0, 0)
        } else if "gjpqy".contains(c) {
            let h = (line.ascent + line.descent) as u32;
            (half, 1.0, (half + 2) as f32, line.ascent, h)
        } else if !c.is_ascii() && c.is_uppercase() {
            let top = line.ascent + (line.descent / 2.0).floor();
            (half, 1.0, (half + 2) as f32, top, top as u32)
        } else {
            (half, 1.0, (half + 2) as f32, line.ascent, line.ascent as u32)
        };

        GlyphMetrics {
            codepoint: cp,
            atlas_x: 0,
            atlas_y: 0,
            width,
            height,
            left_bearing,
            top_bearing: top,
            advance_x: advance,
        }
    }
}

impl Rasterizer for SyntheticRasterizer {
    fn supported_characters(&self, font: &Path) -> Result<Vec<Codepoint>, RasterError> {
        self.coverage_calls.fetch_add(1, Ordering::Relaxed);
        let mut cps: Vec<Codepoint> = self.font(font)?.coverage.iter().copied().collect();
        cps.sort_unstable();
        Ok(cps)
    }

    fn generate_glyphs(&self, request: &GlyphRequest<'_>) -> Result<RasterizedGlyphs, RasterError> {
        self.generate_calls.fetch_add(1, Ordering::Relaxed);
        let font = self.font(request.font)?;
        let line = Self::line_metrics(request.size);

        if font.broken {
            return Ok(RasterizedGlyphs {
                image: AtlasImage::default(),
                glyphs: Vec::new(),
                line,
            });
        }

        // Single row, left to right.
        let pad = request.padding;
        let mut glyphs = Vec::with_capacity(request.codepoints.len());
        let mut cursor = pad;
        let mut tallest = 0;
        for &cp in request.codepoints {
            if !font.coverage.contains(&cp) {
                continue;
            }
            let mut g = Self::glyph_metrics(cp, request.size);
            g.atlas_x = cursor;
            g.atlas_y = pad;
            cursor += g.width + pad;
            tallest = tallest.max(g.height);
            glyphs.push(g);
        }

        let mut image = AtlasImage::new(cursor, tallest + 2 * pad);
        for g in &glyphs {
            for y in g.atlas_y..g.atlas_y + g.height {
                for x in g.atlas_x..g.atlas_x + g.width {
                    let i = ((y * image.width + x) * 4) as usize;
                    image.pixels[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
                }
            }
        }

        Ok(RasterizedGlyphs { image, glyphs, line })
    }

    fn kerning(&self, font: &Path, _size: u32, left: Codepoint, right: Codepoint) -> f32 {
        self.fonts
            .get(font)
            .and_then(|f| f.kerning.get(&(left, right)).copied())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_sorted() {
        let raster = SyntheticRasterizer::new().with_font("f.ttf", "cba");
        let cps = raster.supported_characters(Path::new("f.ttf")).unwrap();
        assert_eq!(cps, vec!['a' as Codepoint, 'b' as Codepoint, 'c' as Codepoint]);
        assert_eq!(raster.coverage_calls(), 1);
    }

    #[test]
    fn test_unknown_font_is_io_error() {
        let raster = SyntheticRasterizer::new();
        let err = raster.supported_characters(Path::new("nope.ttf")).unwrap_err();
        assert!(matches!(err, RasterError::Io { .. }));
    }

    #[test]
    fn test_generate_skips_uncovered_and_places_glyphs() {
        let raster = SyntheticRasterizer::new().with_font("f.ttf", "AB");
        let cps = ['A' as Codepoint, 'Z' as Codepoint, 'B' as Codepoint];
        let out = raster
            .generate_glyphs(&GlyphRequest {
                font: Path::new("f.ttf"),
                size: 20,
                codepoints: &cps,
                padding: 1,
            })
            .unwrap();
        assert_eq!(out.glyphs.len(), 2);
        assert_eq!(out.glyphs[0].atlas_x, 1);
        assert_eq!(out.glyphs[1].atlas_x, 12);
        assert_eq!(out.image.width, 23);
        assert_eq!(out.image.height, 16 + 2);
        assert_eq!(out.image.pixel(1, 1), Some([255; 4]));
        assert_eq!(out.image.pixel(0, 0), Some([0; 4]));
    }

    #[test]
    fn test_descender_metrics() {
        let g = SyntheticRasterizer::glyph_metrics('g' as Codepoint, 20);
        assert_eq!(g.top_bearing, 16.0);
        assert_eq!(g.bottom_bearing(), 4.0);
        let space = SyntheticRasterizer::glyph_metrics(' ' as Codepoint, 20);
        assert_eq!(space.width, 0);
        assert_eq!(space.right_side_bearing(), 5.0);
    }

    #[test]
    fn test_kerning_lookup() {
        let raster = SyntheticRasterizer::new()
            .with_font("f.ttf", "AV")
            .with_kerning("f.ttf", 'A', 'V', -3.0);
        let k = raster.kerning(Path::new("f.ttf"), 20, 'A' as Codepoint, 'V' as Codepoint);
        assert_eq!(k, -3.0);
        assert_eq!(raster.kerning(Path::new("f.ttf"), 20, 'V' as Codepoint, 'A' as Codepoint), 0.0);
    }
}
