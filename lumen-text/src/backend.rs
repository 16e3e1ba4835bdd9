//! `fontdue`-backed rasterizer.
//!
//! Parsed fonts are kept per path for the life of the rasterizer, so
//! coverage queries, glyph generation and kerning share one parse.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use fontdue::{Font, FontSettings};

use crate::packer::{blit_coverage, PackedRect, ShelfPacker};
use crate::raster::{
    AtlasImage, GlyphMetrics, GlyphRequest, LineMetrics, RasterError, RasterizedGlyphs, Rasterizer,
};
use crate::utf8::Codepoint;

/// Smallest atlas edge tried.
const MIN_ATLAS_SIZE: u32 = 128;
/// Largest atlas edge before generation gives up.
pub const MAX_ATLAS_SIZE: u32 = 4096;

#[derive(Default)]
pub struct FontdueRasterizer {
    fonts: Mutex<HashMap<PathBuf, Arc<Font>>>,
}

struct Bitmap {
    metrics: GlyphMetrics,
    coverage: Vec<u8>,
}

impl FontdueRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(&self, path: &Path) -> Result<Arc<Font>, RasterError> {
        let mut fonts = self.fonts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(font) = fonts.get(path) {
            return Ok(font.clone());
        }

        let data = std::fs::read(path).map_err(|source| RasterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Font::from_bytes(data, FontSettings::default()).map_err(|reason| {
            RasterError::Parse {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            }
        })?;
        log::debug!("FontdueRasterizer: parsed {} ({} glyphs)", path.display(), font.glyph_count());

        let font = Arc::new(font);
        fonts.insert(path.to_path_buf(), font.clone());
        Ok(font)
    }

    fn rasterize(font: &Font, request: &GlyphRequest<'_>) -> Vec<Bitmap> {
        let px = request.size as f32;
        request
            .codepoints
            .iter()
            .filter_map(|&cp| char::from_u32(cp).map(|c| (cp, c)))
            .filter(|(_, c)| font.chars().contains_key(c))
            .map(|(cp, c)| {
                let (m, coverage) = font.rasterize(c, px);
                Bitmap {
                    metrics: GlyphMetrics {
                        codepoint: cp,
                        atlas_x: 0,
                        atlas_y: 0,
                        width: m.width as u32,
                        height: m.height as u32,
                        left_bearing: m.xmin as f32,
                        top_bearing: (m.ymin + m.height as i32) as f32,
                        advance_x: m.advance_width,
                    },
                    coverage,
                }
            })
            .collect()
    }

    /// Pack into the smallest power-of-two square that holds every bitmap.
    fn pack(bitmaps: &mut [Bitmap], padding: u32) -> Result<ShelfPacker, RasterError> {
        let mut size = MIN_ATLAS_SIZE;
        'grow: while size <= MAX_ATLAS_SIZE {
            let mut packer = ShelfPacker::new(size, padding);
            for b in bitmaps.iter_mut() {
                match packer.allocate(b.metrics.width, b.metrics.height) {
                    Some(rect) => {
                        b.metrics.atlas_x = rect.x;
                        b.metrics.atlas_y = rect.y;
                    }
                    None => {
                        size *= 2;
                        continue 'grow;
                    }
                }
            }
            return Ok(packer);
        }
        Err(RasterError::AtlasTooLarge { max: MAX_ATLAS_SIZE })
    }
}

impl Rasterizer for FontdueRasterizer {
    fn supported_characters(&self, font: &Path) -> Result<Vec<Codepoint>, RasterError> {
        let font = self.load(font)?;
        let mut cps: Vec<Codepoint> = font.chars().keys().map(|&c| c as Codepoint).collect();
        cps.sort_unstable();
        Ok(cps)
    }

    fn generate_glyphs(&self, request: &GlyphRequest<'_>) -> Result<RasterizedGlyphs, RasterError> {
        let font = self.load(request.font)?;
        let px = request.size as f32;

        let line = font
            .horizontal_line_metrics(px)
            .map(|l| LineMetrics {
                ascent: l.ascent,
                descent: -l.descent,
            })
            .unwrap_or(LineMetrics {
                ascent: px,
                descent: 0.0,
            });

        let mut bitmaps = Self::rasterize(&font, request);
        let packer = Self::pack(&mut bitmaps, request.padding)?;

        // Crop below the last shelf.
        let height = (packer.used_height() + request.padding).min(packer.size());
        let mut image = AtlasImage::new(packer.size(), height);
        for b in &bitmaps {
            let rect = PackedRect {
                x: b.metrics.atlas_x,
                y: b.metrics.atlas_y,
                width: b.metrics.width,
                height: b.metrics.height,
            };
            blit_coverage(&mut image, rect, &b.coverage);
        }

        log::debug!(
            "FontdueRasterizer: {} glyphs from {} at {}px in {}x{}",
            bitmaps.len(),
            request.font.display(),
            request.size,
            image.width,
            image.height
        );

        Ok(RasterizedGlyphs {
            image,
            glyphs: bitmaps.into_iter().map(|b| b.metrics).collect(),
            line,
        })
    }

    fn kerning(&self, font: &Path, size: u32, left: Codepoint, right: Codepoint) -> f32 {
        let (Some(l), Some(r)) = (char::from_u32(left), char::from_u32(right)) else {
            return 0.0;
        };
        match self.load(font) {
            Ok(font) => font.horizontal_kern(l, r, size as f32).unwrap_or(0.0),
            Err(e) => {
                log::debug!("FontdueRasterizer: no kerning: {e}");
                0.0
            }
        }
    }
}
