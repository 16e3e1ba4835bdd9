//! Text → GPU bridge: converts a laid-out `lumen_text::TextBlock` into
//! per-atlas batches of `GlyphInstance`s.

use std::collections::HashMap;
use std::sync::Arc;

use lumen_text::{AtlasId, GlyphAtlas, TextBlock};

use crate::vertex::{glyph_transform, GlyphInstance};

/// Glyph instances that sample the same atlas image; one draw call each.
pub struct TextBatch {
    pub atlas: Arc<GlyphAtlas>,
    pub instances: Vec<GlyphInstance>,
}

impl TextBatch {
    pub fn atlas_id(&self) -> AtlasId {
        self.atlas.id()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Per-glyph transforms, index-aligned with `instances`.
    pub fn transforms(&self) -> Vec<[[f32; 4]; 4]> {
        self.instances
            .iter()
            .map(|i| glyph_transform(i.position[0], i.position[1]))
            .collect()
    }
}

/// Visible screen rectangle in the same pixel space as `origin`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    fn intersects(&self, left: f32, top: f32, right: f32, bottom: f32) -> bool {
        left < self.x + self.width && right > self.x && top < self.y + self.height && bottom > self.y
    }
}

/// Build one batch per atlas for every drawable glyph of `block`, with
/// the text's top-left corner at `origin`.
///
/// Glyphs with an empty bitmap (spaces) are skipped, as are glyphs whose
/// atlas carries no quads (measure-only contexts).
pub fn collect_instances(block: &TextBlock, origin: [f32; 2]) -> Vec<TextBatch> {
    collect(block, origin, None)
}

/// Like [`collect_instances`], but drops glyphs outside `viewport`. A block
/// whose visible bounds miss the viewport entirely produces no batches.
pub fn collect_visible(block: &TextBlock, origin: [f32; 2], viewport: Viewport) -> Vec<TextBatch> {
    let layout = block.layout();
    let top = origin[1] + layout.visible.top;
    let bottom = origin[1] + layout.visible.bottom;
    if !viewport.intersects(origin[0], top, origin[0] + layout.width, bottom) {
        return Vec::new();
    }
    collect(block, origin, Some(viewport))
}

fn collect(block: &TextBlock, origin: [f32; 2], viewport: Option<Viewport>) -> Vec<TextBatch> {
    let mut batches: Vec<TextBatch> = Vec::new();
    let mut by_font: HashMap<usize, usize> = HashMap::new();

    let chars = block.resolved().characters.iter().zip(block.characters());
    for (resolved, placed) in chars {
        if !placed.draw {
            continue;
        }
        let (Some(font), Some(glyph_index)) = (resolved.font_index, placed.glyph_index) else {
            continue;
        };
        let Some(atlas) = block.atlas(font) else {
            continue;
        };
        let (Some(glyph), Some(quad)) = (atlas.glyph_at(glyph_index), atlas.quad(glyph_index)) else {
            continue;
        };
        if glyph.width == 0 || glyph.height == 0 {
            continue;
        }

        let x = origin[0] + placed.position_left_x;
        let y = origin[1] + placed.position_top_y;
        let (w, h) = (glyph.width as f32, glyph.height as f32);
        if viewport.is_some_and(|v| !v.intersects(x, y, x + w, y + h)) {
            continue;
        }

        let slot = *by_font.entry(font).or_insert_with(|| {
            batches.push(TextBatch {
                atlas: atlas.clone(),
                instances: Vec::new(),
            });
            batches.len() - 1
        });
        batches[slot].instances.push(GlyphInstance::new(
            x,
            y,
            w,
            h,
            quad.uv_rect(),
            resolved.color.to_rgba(1.0),
        ));
    }

    log::trace!(
        "collect: {} batches, {} glyphs",
        batches.len(),
        batches.iter().map(TextBatch::len).sum::<usize>()
    );
    batches
}

// ===================================================================
// Tests
// ===================================================================
