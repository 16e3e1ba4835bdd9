//! Shared engine state.
//!
//! A [`FontEngineContext`] owns the rasterizer, the coverage cache, the
//! atlas cache and the configuration. Create one per application (or per
//! test) and hand it to every text object; there is no global state.

use std::path::Path;
use std::sync::Arc;

use crate::atlas::{AtlasMode, GlyphAtlas, GlyphAtlasCache};
use crate::config::EngineConfig;
use crate::coverage::FontCoverageCache;
use crate::error::TextError;
use crate::fonts::FontList;
use crate::layout::{LayoutEngine, LayoutOptions, TextLayout};
use crate::raster::Rasterizer;
use crate::resolver::{Color, FontResolver, ResolvedText};

pub struct FontEngineContext {
    rasterizer: Arc<dyn Rasterizer>,
    coverage: Arc<FontCoverageCache>,
    atlases: GlyphAtlasCache,
    config: EngineConfig,
}

impl FontEngineContext {
    /// A context whose atlases carry render geometry.
    pub fn new(rasterizer: Arc<dyn Rasterizer>, config: EngineConfig) -> Self {
        let coverage = Arc::new(FontCoverageCache::new(rasterizer.clone()));
        let atlases = GlyphAtlasCache::new(rasterizer.clone(), coverage.clone(), &config);
        Self {
            rasterizer,
            coverage,
            atlases,
            config,
        }
    }

    /// A context for measurement only (servers, tests, headless tools).
    pub fn data_only(rasterizer: Arc<dyn Rasterizer>, config: EngineConfig) -> Self {
        let coverage = Arc::new(FontCoverageCache::new(rasterizer.clone()));
        let atlases = GlyphAtlasCache::data_only(rasterizer.clone(), coverage.clone(), &config);
        Self {
            rasterizer,
            coverage,
            atlases,
            config,
        }
    }

    pub fn rasterizer(&self) -> &dyn Rasterizer {
        self.rasterizer.as_ref()
    }

    pub fn coverage(&self) -> &FontCoverageCache {
        &self.coverage
    }

    pub fn atlases(&self) -> &GlyphAtlasCache {
        &self.atlases
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> FontResolver<'_> {
        FontResolver::new(&self.coverage)
    }

    /// Layout options seeded from the configuration.
    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            wrap: self.config.default_wrap,
            line_spacing: self.config.line_spacing,
            ..Default::default()
        }
    }

    /// One atlas per font of `resolved.fonts`; `None` for fonts no
    /// character was assigned to.
    pub fn atlases_for(
        &self,
        resolved: &ResolvedText,
        size: u32,
        mode: AtlasMode,
    ) -> Result<Vec<Option<Arc<GlyphAtlas>>>, TextError> {
        resolved
            .fonts
            .iter()
            .enumerate()
            .map(|(index, font)| {
                let codepoints = resolved.codepoints_for_font(index);
                if codepoints.is_empty() {
                    return Ok(None);
                }
                self.atlases
                    .get_or_build(&codepoints, font, size, mode)
                    .map(Some)
            })
            .collect()
    }

    /// Lay out `text` without adding anything to the atlas cache.
    pub fn measure(
        &self,
        text: &str,
        main_font: &Path,
        fonts: &FontList,
        size: u32,
        options: &LayoutOptions,
    ) -> Result<TextLayout, TextError> {
        let resolved = self
            .resolver()
            .resolve_characters(text.as_bytes(), main_font, fonts, Color::default())?;
        let atlases = self.atlases_for(&resolved, size, AtlasMode::MeasureOnly)?;
        Ok(LayoutEngine::new(options.clone()).layout(&resolved, &atlases, self.rasterizer()))
    }
}
