//! Instance data handed to the draw call.
//!
//! All types derive `bytemuck::Pod` + `Zeroable` so a batch can be cast to
//! bytes and uploaded as-is.

use bytemuck::{Pod, Zeroable};

/// Per-glyph instance for instanced quad rendering.
///
/// 48 bytes per instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlyphInstance {
    /// Top-left corner of the glyph bitmap, in pixels.
    pub position: [f32; 2],
    /// Bitmap width and height in pixels.
    pub size: [f32; 2],
    /// Atlas UV rectangle `(u_min, v_min, u_max, v_max)`.
    pub uv_rect: [f32; 4],
    /// RGBA color, each channel in [0.0, 1.0].
    pub color: [f32; 4],
}

impl GlyphInstance {
    pub fn new(x: f32, y: f32, w: f32, h: f32, uv_rect: [f32; 4], color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            size: [w, h],
            uv_rect,
            color,
        }
    }

    /// Translation matrix placing this glyph's quad.
    pub fn transform(&self) -> [[f32; 4]; 4] {
        glyph_transform(self.position[0], self.position[1])
    }
}

/// Column-major 4×4 translation by `(x, y)`.
pub fn glyph_transform(x: f32, y: f32) -> [[f32; 4]; 4] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [x, y, 0.0, 1.0],
    ]
}
