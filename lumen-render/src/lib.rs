//! # lumen-render
//!
//! Renderer-facing output of the Lumen text engine. Nothing here talks to
//! a GPU; it produces the buffers a draw call consumes.
//!
//! ## Architecture
//!
//! ```text
//!  TextBlock (lumen-text)
//!       │
//!       ▼
//!  bridge::collect_instances()      ◀─── layout + atlas quads → GlyphInstance
//!       │
//!       ▼
//!  TextBatch per atlas              ◀─── atlas image + instances + transforms
//! ```
//!
//! - [`vertex`]: `GlyphInstance` and per-glyph transforms
//! - [`bridge`]: text block → batched instances, with viewport culling

pub mod bridge;
pub mod vertex;

pub use bridge::{collect_instances, collect_visible, TextBatch, Viewport};
pub use vertex::{glyph_transform, GlyphInstance};
