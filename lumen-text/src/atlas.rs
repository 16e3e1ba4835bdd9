//! Glyph atlas cache: rasterized glyph sets keyed by exact content.
//!
//! An atlas holds one font at one pixel size for a fixed set of
//! codepoints: a single RGBA image, per-glyph metrics and (for renderable
//! atlases) one textured quad per glyph.
//!
//! ```text
//! get_or_build(codepoints, font, size, mode)
//!     │
//!     ├── key hit ─────────────────────────► Arc<GlyphAtlas>
//!     │
//!     └── miss: 'A' + requested + baseline extras (if covered)
//!             │
//!             ▼
//!         Rasterizer::generate_glyphs ──► GlyphAtlas (+ quads)
//!             │
//!             ├── Render: inserted into the cache
//!             └── MeasureOnly: returned to the caller only
//! ```
//!
//! Keys compare the *requested* codepoint set exactly: a request that adds
//! a single character builds a new atlas rather than reusing a superset.
//! The baseline extras make each atlas large enough to measure common text
//! without another build.

use bytemuck::{Pod, Zeroable};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::{Lookup, SyncCache};
use crate::config::EngineConfig;
use crate::coverage::FontCoverageCache;
use crate::error::TextError;
use crate::raster::{AtlasImage, GlyphMetrics, GlyphRequest, RasterError, Rasterizer};
use crate::utf8::Codepoint;

/// Default empty pixels around each glyph in generated atlas images.
pub const RASTER_PADDING: u32 = 2;

/// Glyph whose metrics define an atlas's ascent.
pub const REFERENCE_GLYPH: Codepoint = 'A' as Codepoint;

// ── Keys and handles ────────────────────────────────────────────────

/// Small integer handle identifying an atlas (and its texture downstream).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtlasId(pub u32);

/// Font, pixel size and the exact set of requested codepoints.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GlyphAtlasKey {
    font: PathBuf,
    size: u32,
    /// Sorted, deduplicated.
    codepoints: Vec<Codepoint>,
}

impl GlyphAtlasKey {
    pub fn new(font: &Path, size: u32, codepoints: &[Codepoint]) -> Self {
        let mut codepoints = codepoints.to_vec();
        codepoints.sort_unstable();
        codepoints.dedup();
        Self {
            font: font.to_path_buf(),
            size,
            codepoints,
        }
    }

    pub fn codepoints(&self) -> &[Codepoint] {
        &self.codepoints
    }
}

/// How an atlas is going to be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtlasMode {
    /// Kept in the cache; quads are built if the cache can render.
    Render,
    /// Metrics only, never cached, no quads.
    MeasureOnly,
}

// ── Quad geometry ───────────────────────────────────────────────────

/// One corner of a glyph quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    /// Pixel offset from the glyph's top-left corner.
    pub position: [f32; 2],
    /// Normalized atlas texture coordinate.
    pub uv: [f32; 2],
}

/// Textured quad for one glyph: top-left, top-right, bottom-left, bottom-right.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlyphQuad {
    pub vertices: [QuadVertex; 4],
}

impl GlyphQuad {
    /// Triangle indices into [`GlyphQuad::vertices`].
    pub const INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

    fn from_metrics(g: &GlyphMetrics, image: &AtlasImage) -> Self {
        let inv_w = 1.0 / image.width as f32;
        let inv_h = 1.0 / image.height as f32;
        let (w, h) = (g.width as f32, g.height as f32);
        let u0 = g.atlas_x as f32 * inv_w;
        let v0 = g.atlas_y as f32 * inv_h;
        let u1 = (g.atlas_x + g.width) as f32 * inv_w;
        let v1 = (g.atlas_y + g.height) as f32 * inv_h;
        Self {
            vertices: [
                QuadVertex { position: [0.0, 0.0], uv: [u0, v0] },
                QuadVertex { position: [w, 0.0], uv: [u1, v0] },
                QuadVertex { position: [0.0, h], uv: [u0, v1] },
                QuadVertex { position: [w, h], uv: [u1, v1] },
            ],
        }
    }

    /// UV rectangle as `(u_min, v_min, u_max, v_max)`.
    pub fn uv_rect(&self) -> [f32; 4] {
        let [tl, _, _, br] = self.vertices;
        [tl.uv[0], tl.uv[1], br.uv[0], br.uv[1]]
    }
}

// ── Atlas ───────────────────────────────────────────────────────────

/// A rasterized glyph set for one font at one size.
#[derive(Debug)]
pub struct GlyphAtlas {
    id: AtlasId,
    font: PathBuf,
    size: u32,
    image: AtlasImage,
    glyphs: Vec<GlyphMetrics>,
    index: HashMap<Codepoint, usize>,
    /// Index-aligned with `glyphs`; empty for measure-only atlases.
    quads: Vec<GlyphQuad>,
    ascent: f32,
    descent: f32,
    cached: bool,
}

impl GlyphAtlas {
    pub fn id(&self) -> AtlasId {
        self.id
    }

    pub fn font(&self) -> &Path {
        &self.font
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn image(&self) -> &AtlasImage {
        &self.image
    }

    /// Position of `cp` inside this atlas.
    pub fn glyph_index(&self, cp: Codepoint) -> Option<usize> {
        self.index.get(&cp).copied()
    }

    pub fn glyph(&self, cp: Codepoint) -> Option<&GlyphMetrics> {
        self.glyph_index(cp).map(|i| &self.glyphs[i])
    }

    pub fn glyph_at(&self, index: usize) -> Option<&GlyphMetrics> {
        self.glyphs.get(index)
    }

    pub fn glyphs(&self) -> &[GlyphMetrics] {
        &self.glyphs
    }

    pub fn contains(&self, cp: Codepoint) -> bool {
        self.index.contains_key(&cp)
    }

    pub fn quad(&self, index: usize) -> Option<&GlyphQuad> {
        self.quads.get(index)
    }

    pub fn quads(&self) -> &[GlyphQuad] {
        &self.quads
    }

    pub fn has_quads(&self) -> bool {
        !self.quads.is_empty()
    }

    /// Baseline to the top of the reference glyph.
    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    pub fn descent(&self) -> f32 {
        self.descent
    }

    /// Whole-pixel height of one line of this font.
    pub fn font_height(&self) -> f32 {
        (self.ascent + self.descent).ceil()
    }

    /// `true` if the atlas lives in the cache, `false` for measure-only builds.
    pub fn is_cached(&self) -> bool {
        self.cached
    }
}

// ── Cache ───────────────────────────────────────────────────────────

/// Counters for cache behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AtlasStats {
    pub hits: u64,
    pub builds: u64,
    pub measure_builds: u64,
    pub failures: u64,
}

pub struct GlyphAtlasCache {
    rasterizer: Arc<dyn Rasterizer>,
    coverage: Arc<FontCoverageCache>,
    extras: Vec<Codepoint>,
    padding: u32,
    render_capable: bool,
    entries: SyncCache<GlyphAtlasKey, GlyphAtlas>,
    next_id: AtomicU32,
    hits: AtomicU64,
    builds: AtomicU64,
    measure_builds: AtomicU64,
    failures: AtomicU64,
}

impl GlyphAtlasCache {
    /// A cache whose atlases carry quad geometry for rendering.
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        coverage: Arc<FontCoverageCache>,
        config: &EngineConfig,
    ) -> Self {
        Self::with_render(rasterizer, coverage, config, true)
    }

    /// A cache that only ever produces glyph metrics.
    pub fn data_only(
        rasterizer: Arc<dyn Rasterizer>,
        coverage: Arc<FontCoverageCache>,
        config: &EngineConfig,
    ) -> Self {
        Self::with_render(rasterizer, coverage, config, false)
    }

    fn with_render(
        rasterizer: Arc<dyn Rasterizer>,
        coverage: Arc<FontCoverageCache>,
        config: &EngineConfig,
        render_capable: bool,
    ) -> Self {
        Self {
            rasterizer,
            coverage,
            extras: config.atlas_extra_characters().map(|c| c as Codepoint).collect(),
            padding: config.atlas_padding,
            render_capable,
            entries: SyncCache::new(config.atlas_capacity()),
            next_id: AtomicU32::new(0),
            hits: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            measure_builds: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn is_render_capable(&self) -> bool {
        self.render_capable
    }

    /// Return the atlas for exactly `codepoints` in `font` at `size`,
    /// building it on a miss.
    pub fn get_or_build(
        &self,
        codepoints: &[Codepoint],
        font: &Path,
        size: u32,
        mode: AtlasMode,
    ) -> Result<Arc<GlyphAtlas>, TextError> {
        let key = GlyphAtlasKey::new(font, size, codepoints);

        let result = match mode {
            AtlasMode::Render => self
                .entries
                .get_or_try_insert_with(key.clone(), || {
                    self.build(&key, true, self.render_capable)
                })
                .map(|(atlas, lookup)| {
                    match lookup {
                        Lookup::Hit => self.hits.fetch_add(1, Ordering::Relaxed),
                        Lookup::Built => self.builds.fetch_add(1, Ordering::Relaxed),
                    };
                    atlas
                }),
            AtlasMode::MeasureOnly => match self.entries.get(&key) {
                Some(atlas) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Ok(atlas)
                }
                None => self.build(&key, false, false).map(|atlas| {
                    self.measure_builds.fetch_add(1, Ordering::Relaxed);
                    Arc::new(atlas)
                }),
            },
        };

        if let Err(e) = &result {
            self.failures.fetch_add(1, Ordering::Relaxed);
            log::warn!("GlyphAtlasCache: {e}");
        }
        result
    }

    /// The cached atlas for an exact key, if any.
    pub fn get(&self, codepoints: &[Codepoint], font: &Path, size: u32) -> Option<Arc<GlyphAtlas>> {
        self.entries.get(&GlyphAtlasKey::new(font, size, codepoints))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached atlas.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> AtlasStats {
        AtlasStats {
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            measure_builds: self.measure_builds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Generation order: reference glyph, requested codepoints, extras.
    fn generation_list(&self, key: &GlyphAtlasKey) -> Vec<Codepoint> {
        let font = key.font.as_path();
        let mut seen = HashSet::new();
        let mut list = Vec::with_capacity(key.codepoints.len() + self.extras.len() + 1);

        if self.coverage.supports(REFERENCE_GLYPH, font) {
            seen.insert(REFERENCE_GLYPH);
            list.push(REFERENCE_GLYPH);
        }
        for &cp in &key.codepoints {
            if seen.insert(cp) {
                list.push(cp);
            }
        }
        for &cp in &self.extras {
            if !seen.contains(&cp) && self.coverage.supports(cp, font) {
                seen.insert(cp);
                list.push(cp);
            }
        }
        list
    }

    fn build(&self, key: &GlyphAtlasKey, cached: bool, with_quads: bool) -> Result<GlyphAtlas, TextError> {
        if !self.coverage.ensure_loaded(&key.font) {
            return Err(TextError::FontLoad(key.font.clone()));
        }

        let codepoints = self.generation_list(key);
        let request = GlyphRequest {
            font: &key.font,
            size: key.size,
            codepoints: &codepoints,
            padding: self.padding,
        };

        let generation_error = |source| TextError::GlyphGeneration {
            font: key.font.clone(),
            size: key.size,
            source,
        };

        let raster = self
            .rasterizer
            .generate_glyphs(&request)
            .map_err(generation_error)?;

        if raster.image.is_empty() {
            return Err(generation_error(RasterError::EmptyImage {
                width: raster.image.width,
                height: raster.image.height,
            }));
        }

        let ascent = raster
            .glyph(REFERENCE_GLYPH)
            .map(|g| g.top_bearing)
            .unwrap_or(raster.line.ascent);

        let index = raster
            .glyphs
            .iter()
            .enumerate()
            .map(|(i, g)| (g.codepoint, i))
            .collect();

        let quads = if with_quads {
            raster
                .glyphs
                .iter()
                .map(|g| GlyphQuad::from_metrics(g, &raster.image))
                .collect()
        } else {
            Vec::new()
        };

        let id = AtlasId(self.next_id.fetch_add(1, Ordering::Relaxed));
        log::debug!(
            "GlyphAtlasCache: built atlas {:?} for {} at {}px: {} glyphs, {}x{} image{}",
            id,
            key.font.display(),
            key.size,
            raster.glyphs.len(),
            raster.image.width,
            raster.image.height,
            if cached { "" } else { " (measure only)" },
        );

        Ok(GlyphAtlas {
            id,
            font: key.font.clone(),
            size: key.size,
            image: raster.image,
            glyphs: raster.glyphs,
            index,
            quads,
            ascent,
            descent: raster.line.descent,
            cached,
        })
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticRasterizer;

    fn cps(s: &str) -> Vec<Codepoint> {
        s.chars().map(|c| c as Codepoint).collect()
    }

    fn setup(raster: SyntheticRasterizer, config: &EngineConfig) -> (Arc<SyntheticRasterizer>, GlyphAtlasCache) {
        let raster = Arc::new(raster);
        let coverage = Arc::new(FontCoverageCache::new(raster.clone()));
        let cache = GlyphAtlasCache::new(raster.clone(), coverage, config);
        (raster, cache)
    }

    fn ascii() -> SyntheticRasterizer {
        SyntheticRasterizer::new().with_ascii_font("sans.ttf")
    }

    #[test]
    fn test_identical_key_reuses_atlas() {
        let (raster, cache) = setup(ascii(), &EngineConfig::default());
        let font = Path::new("sans.ttf");
        let a = cache.get_or_build(&cps("hello"), font, 16, AtlasMode::Render).unwrap();
        let b = cache.get_or_build(&cps("olleh"), font, 16, AtlasMode::Render).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(raster.generate_calls(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().builds, 1);
        assert!(a.is_cached());
    }

    #[test]
    fn test_distinct_sets_never_share() {
        let (raster, cache) = setup(ascii(), &EngineConfig::default());
        let font = Path::new("sans.ttf");
        let a = cache.get_or_build(&cps("abc"), font, 16, AtlasMode::Render).unwrap();
        // A subset is a different key even though `a` already covers it.
        let b = cache.get_or_build(&cps("ab"), font, 16, AtlasMode::Render).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.id(), b.id());
        assert_eq!(raster.generate_calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_size_is_part_of_key() {
        let (_, cache) = setup(ascii(), &EngineConfig::default());
        let font = Path::new("sans.ttf");
        let a = cache.get_or_build(&cps("a"), font, 16, AtlasMode::Render).unwrap();
        let b = cache.get_or_build(&cps("a"), font, 24, AtlasMode::Render).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(b.font_height() > a.font_height());
    }

    #[test]
    fn test_reference_glyph_first_and_extras_added() {
        let (_, cache) = setup(ascii(), &EngineConfig::default());
        let atlas = cache
            .get_or_build(&cps("xyz"), Path::new("sans.ttf"), 20, AtlasMode::Render)
            .unwrap();
        assert_eq!(atlas.glyph_index('A' as Codepoint), Some(0));
        assert_eq!(atlas.glyph_index('x' as Codepoint), Some(1));
        // Baseline extras the font covers are present, uncovered ones are not.
        assert!(atlas.contains('7' as Codepoint));
        assert!(atlas.contains('~' as Codepoint));
        assert!(!atlas.contains('ß' as Codepoint));
        assert_eq!(atlas.ascent(), 16.0);
        assert_eq!(atlas.font_height(), 20.0);
    }

    #[test]
    fn test_font_without_reference_glyph_uses_line_ascent() {
        let raster = SyntheticRasterizer::new().with_font("cjk.ttf", "日本");
        let (_, cache) = setup(raster, &EngineConfig::default());
        let atlas = cache
            .get_or_build(&cps("日"), Path::new("cjk.ttf"), 20, AtlasMode::Render)
            .unwrap();
        assert_eq!(atlas.glyph_index('日' as Codepoint), Some(0));
        assert!(!atlas.contains('本' as Codepoint));
        assert_eq!(atlas.ascent(), 16.0);
    }

    #[test]
    fn test_measure_only_not_cached() {
        let (raster, cache) = setup(ascii(), &EngineConfig::default());
        let font = Path::new("sans.ttf");
        let a = cache.get_or_build(&cps("abc"), font, 16, AtlasMode::MeasureOnly).unwrap();
        let b = cache.get_or_build(&cps("abc"), font, 16, AtlasMode::MeasureOnly).unwrap();
        assert!(!a.is_cached());
        assert!(!a.has_quads());
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(raster.generate_calls(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().measure_builds, 2);
    }

    #[test]
    fn test_measure_only_reuses_cached_entry() {
        let (raster, cache) = setup(ascii(), &EngineConfig::default());
        let font = Path::new("sans.ttf");
        let rendered = cache.get_or_build(&cps("abc"), font, 16, AtlasMode::Render).unwrap();
        let measured = cache.get_or_build(&cps("abc"), font, 16, AtlasMode::MeasureOnly).unwrap();
        assert!(Arc::ptr_eq(&rendered, &measured));
        assert_eq!(raster.generate_calls(), 1);
    }

    #[test]
    fn test_quads_match_glyphs() {
        let (_, cache) = setup(ascii(), &EngineConfig::default());
        let atlas = cache
            .get_or_build(&cps("Hi"), Path::new("sans.ttf"), 20, AtlasMode::Render)
            .unwrap();
        assert_eq!(atlas.quads().len(), atlas.glyphs().len());
        let i = atlas.glyph_index('H' as Codepoint).unwrap();
        let g = atlas.glyph_at(i).unwrap();
        let quad = atlas.quad(i).unwrap();
        assert_eq!(quad.vertices[3].position, [g.width as f32, g.height as f32]);
        let [u0, v0, u1, v1] = quad.uv_rect();
        assert!(u0 < u1 && v0 < v1 && u1 <= 1.0 && v1 <= 1.0);
        assert_eq!(bytemuck::bytes_of(quad).len(), 4 * 4 * 4);
    }

    #[test]
    fn test_data_only_cache_has_no_quads() {
        let raster = Arc::new(ascii());
        let coverage = Arc::new(FontCoverageCache::new(raster.clone()));
        let cache = GlyphAtlasCache::data_only(raster, coverage, &EngineConfig::default());
        let atlas = cache
            .get_or_build(&cps("abc"), Path::new("sans.ttf"), 16, AtlasMode::Render)
            .unwrap();
        assert!(!cache.is_render_capable());
        assert!(atlas.is_cached());
        assert!(!atlas.has_quads());
        assert!(atlas.glyph('a' as Codepoint).is_some());
    }

    #[test]
    fn test_empty_image_is_generation_failure() {
        let raster = ascii().with_broken_glyphs("sans.ttf");
        let (_, cache) = setup(raster, &EngineConfig::default());
        let err = cache
            .get_or_build(&cps("abc"), Path::new("sans.ttf"), 16, AtlasMode::Render)
            .unwrap_err();
        assert!(matches!(err, TextError::GlyphGeneration { size: 16, .. }));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().failures, 1);
    }

    #[test]
    fn test_unknown_font_is_load_failure() {
        let (_, cache) = setup(ascii(), &EngineConfig::default());
        let err = cache
            .get_or_build(&cps("abc"), Path::new("missing.ttf"), 16, AtlasMode::Render)
            .unwrap_err();
        assert!(matches!(err, TextError::FontLoad(_)));
    }

    #[test]
    fn test_bounded_cache_evicts() {
        let config = EngineConfig {
            atlas_cache_capacity: Some(1),
            ..Default::default()
        };
        let (raster, cache) = setup(ascii(), &config);
        let font = Path::new("sans.ttf");
        cache.get_or_build(&cps("a"), font, 16, AtlasMode::Render).unwrap();
        cache.get_or_build(&cps("b"), font, 16, AtlasMode::Render).unwrap();
        cache.get_or_build(&cps("a"), font, 16, AtlasMode::Render).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(raster.generate_calls(), 3);
    }

    #[test]
    fn test_key_normalizes_order_and_duplicates() {
        let font = Path::new("f.ttf");
        assert_eq!(
            GlyphAtlasKey::new(font, 12, &cps("cabba")),
            GlyphAtlasKey::new(font, 12, &cps("abc"))
        );
        assert_ne!(
            GlyphAtlasKey::new(font, 12, &cps("abc")),
            GlyphAtlasKey::new(font, 12, &cps("abcd"))
        );
    }
}
