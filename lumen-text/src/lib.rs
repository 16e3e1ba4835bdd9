//! # lumen-text
//!
//! Font text engine: UTF-8 text in, positioned glyphs and glyph atlases out.
//!
//! ## Architecture
//!
//! ```text
//! FontEngineContext (Rasterizer + FontCoverageCache + GlyphAtlasCache)
//!     │
//!     ▼
//! FontResolver ──► ResolvedText { codepoint, font index, color }
//!     │                   │
//!     ▼                   ▼
//! GlyphAtlasCache ──► GlyphAtlas (metrics, RGBA image, quads)
//!     │
//!     ▼
//! LayoutEngine ──► TextLayout { positions, lines, extents }
//! ```
//!
//! - **`utf8`**: Strict decoding, encoding and comparison.
//! - **`coverage`**: Which codepoints each font file supports.
//! - **`resolver`**: Per-character font fallback.
//! - **`atlas`**: Exact-set glyph atlas cache (render or data-only).
//! - **`layout`**: Kerning, line breaking, text metrics.
//! - **`text`**: `TextBlock`, a text object that keeps its layout current.
//! - **`backend`** / **`synthetic`**: Rasterizer implementations.
//! - **`fonts`**: Font lists and system font discovery.

pub mod atlas;
pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod coverage;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod packer;
pub mod raster;
pub mod resolver;
pub mod synthetic;
pub mod text;
pub mod utf8;

// Re-exports for ergonomic use.
pub use atlas::{AtlasId, AtlasMode, GlyphAtlas, GlyphAtlasCache, GlyphQuad, QuadVertex};
pub use backend::FontdueRasterizer;
pub use config::EngineConfig;
pub use context::FontEngineContext;
pub use coverage::FontCoverageCache;
pub use error::TextError;
pub use fonts::{FontDescriptor, FontList, FontRegistry};
pub use layout::{
    LayoutCharacter, LayoutEngine, LayoutLine, LayoutOptions, TextLayout, VisibleBounds, WordWrap,
};
pub use raster::{GlyphMetrics, Rasterizer};
pub use resolver::{Color, FontResolver, ResolvedCharacter, ResolvedText};
pub use synthetic::SyntheticRasterizer;
pub use text::TextBlock;
pub use utf8::{Codepoint, Utf8Error, Utf8Ordering};
