//! Text objects.
//!
//! A [`TextBlock`] owns its content and styling and keeps the resolved
//! characters, atlases and layout in sync with them. Every setter that can
//! change geometry re-runs resolve → atlas → layout. Failures are logged
//! and leave the block with empty output; the previous content is not kept.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::atlas::{AtlasMode, GlyphAtlas};
use crate::context::FontEngineContext;
use crate::error::TextError;
use crate::fonts::FontList;
use crate::layout::{LayoutCharacter, LayoutEngine, LayoutLine, LayoutOptions, TextLayout, WordWrap};
use crate::resolver::{Color, ResolvedText};

pub struct TextBlock {
    context: Arc<FontEngineContext>,
    text: String,
    main_font: PathBuf,
    fonts: FontList,
    size: u32,
    color: Color,
    options: LayoutOptions,
    resolved: ResolvedText,
    atlases: Vec<Option<Arc<GlyphAtlas>>>,
    layout: TextLayout,
}

impl TextBlock {
    /// A block drawn with the default font of `fonts` at `size` pixels.
    pub fn new(context: Arc<FontEngineContext>, text: &str, fonts: FontList, size: u32) -> Self {
        let options = context.layout_options();
        let main_font = fonts.default_font().map(Path::to_path_buf).unwrap_or_default();
        let mut block = Self {
            context,
            text: text.to_string(),
            main_font,
            fonts,
            size,
            color: Color::default(),
            options,
            resolved: ResolvedText::default(),
            atlases: Vec::new(),
            layout: TextLayout::default(),
        };
        block.update();
        block
    }

    pub fn with_options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self.update();
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.set_color(color);
        self
    }

    // ── Setters ─────────────────────────────────────────────────────

    pub fn set_text(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_string();
            self.update();
        }
    }

    /// Replace the font list; its default font becomes the main font.
    pub fn set_fonts(&mut self, fonts: FontList) {
        if self.fonts != fonts {
            self.main_font = fonts.default_font().map(Path::to_path_buf).unwrap_or_default();
            self.fonts = fonts;
            self.update();
        }
    }

    pub fn set_main_font(&mut self, font: impl Into<PathBuf>) {
        let font = font.into();
        if self.main_font != font {
            self.main_font = font;
            self.update();
        }
    }

    pub fn set_size(&mut self, size: u32) {
        if self.size != size {
            self.size = size;
            self.update();
        }
    }

    pub fn set_max_width(&mut self, width: Option<f32>) {
        if self.options.max_line_width != width {
            self.options.max_line_width = width;
            self.relayout();
        }
    }

    pub fn set_wrap(&mut self, wrap: WordWrap) {
        if self.options.wrap != wrap {
            self.options.wrap = wrap;
            self.relayout();
        }
    }

    pub fn set_max_line_count(&mut self, count: Option<usize>) {
        if self.options.max_line_count != count {
            self.options.max_line_count = count;
            self.relayout();
        }
    }

    /// Color only; geometry is unaffected.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        for c in &mut self.resolved.characters {
            c.color = color;
        }
    }

    // ── Getters ─────────────────────────────────────────────────────

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn main_font(&self) -> &Path {
        &self.main_font
    }

    pub fn fonts(&self) -> &FontList {
        &self.fonts
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn resolved(&self) -> &ResolvedText {
        &self.resolved
    }

    pub fn layout(&self) -> &TextLayout {
        &self.layout
    }

    /// Atlas of the font at `font_index` of the resolved font list.
    pub fn atlas(&self, font_index: usize) -> Option<&Arc<GlyphAtlas>> {
        self.atlases.get(font_index)?.as_ref()
    }

    pub fn width(&self) -> f32 {
        self.layout.width
    }

    pub fn all_draw_text_height(&self) -> f32 {
        self.layout.all_draw_text_height()
    }

    pub fn lines(&self) -> &[LayoutLine] {
        &self.layout.lines
    }

    pub fn characters(&self) -> &[LayoutCharacter] {
        &self.layout.characters
    }

    /// Drawn characters of line `line`, in order.
    pub fn line_text(&self, line: usize) -> String {
        self.resolved
            .characters
            .iter()
            .zip(&self.layout.characters)
            .filter(|(_, l)| l.draw && l.line_number == line)
            .filter_map(|(r, _)| char::from_u32(r.codepoint))
            .collect()
    }

    // ── Pipeline ────────────────────────────────────────────────────

    fn update(&mut self) {
        match self.resolve() {
            Ok((resolved, atlases)) => {
                self.resolved = resolved;
                self.atlases = atlases;
                self.relayout();
            }
            Err(e) => {
                log::warn!("TextBlock: {e}");
                self.resolved = ResolvedText::default();
                self.atlases.clear();
                self.layout = TextLayout::default();
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn resolve(&self) -> Result<(ResolvedText, Vec<Option<Arc<GlyphAtlas>>>), TextError> {
        let resolved = self.context.resolver().resolve_characters(
            self.text.as_bytes(),
            &self.main_font,
            &self.fonts,
            self.color,
        )?;
        let atlases = self
            .context
            .atlases_for(&resolved, self.size, AtlasMode::Render)?;
        Ok((resolved, atlases))
    }

    fn relayout(&mut self) {
        self.layout = LayoutEngine::new(self.options.clone()).layout(
            &self.resolved,
            &self.atlases,
            self.context.rasterizer(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::synthetic::SyntheticRasterizer;

    fn context(raster: SyntheticRasterizer) -> Arc<FontEngineContext> {
        Arc::new(FontEngineContext::new(Arc::new(raster), EngineConfig::default()))
    }

    fn block(text: &str) -> TextBlock {
        let ctx = context(SyntheticRasterizer::new().with_ascii_font("sans.ttf"));
        TextBlock::new(ctx, text, FontList::new(["sans.ttf"]), 20)
    }

    #[test]
    fn test_new_block_is_laid_out() {
        let block = block("hello");
        assert_eq!(block.characters().len(), 5);
        assert_eq!(block.lines().len(), 1);
        assert_eq!(block.all_draw_text_height(), 20.0);
        assert_eq!(block.line_text(0), "hello");
    }

    #[test]
    fn test_set_max_width_rewraps() {
        let mut block = block("abc def");
        block.set_wrap(WordWrap::On);
        assert_eq!(block.lines().len(), 1);
        block.set_max_width(Some(35.0));
        assert_eq!(block.lines().len(), 2);
        assert_eq!(block.line_text(0), "abc ");
        assert_eq!(block.line_text(1), "def");
        block.set_max_width(None);
        assert_eq!(block.lines().len(), 1);
    }

    #[test]
    fn test_set_text_and_size() {
        let mut block = block("a");
        let narrow = block.width();
        block.set_text("aa");
        assert!(block.width() > narrow);
        block.set_size(40);
        assert_eq!(block.layout().font_height, 40.0);
        assert_eq!(block.size(), 40);
    }

    #[test]
    fn test_unloadable_font_draws_nothing() {
        let mut block = block("ok");
        assert!(!block.characters().is_empty());
        block.set_fonts(FontList::new(["missing.ttf"]));
        assert!(block.characters().iter().all(|c| !c.draw));
        assert_eq!(block.width(), 0.0);
    }

    #[test]
    fn test_glyph_generation_failure_empties_block() {
        let raster = SyntheticRasterizer::new()
            .with_ascii_font("sans.ttf")
            .with_broken_glyphs("sans.ttf");
        let block = TextBlock::new(context(raster), "abc", FontList::new(["sans.ttf"]), 20);
        assert!(block.characters().is_empty());
        assert!(block.lines().is_empty());
        assert_eq!(block.all_draw_text_height(), 0.0);
    }

    #[test]
    fn test_set_color_keeps_geometry() {
        let mut block = block("ab");
        let before = block.characters().to_vec();
        block.set_color(Color::BLACK);
        assert_eq!(block.characters(), &before[..]);
        assert!(block.resolved().characters.iter().all(|c| c.color == Color::BLACK));
    }

    #[test]
    fn test_main_font_and_fallback() {
        let raster = SyntheticRasterizer::new()
            .with_ascii_font("sans.ttf")
            .with_font("greek.ttf", "αβγ");
        let block = TextBlock::new(
            context(raster),
            "aβ",
            FontList::new(["sans.ttf", "greek.ttf"]),
            20,
        );
        assert!(block.atlas(0).is_some());
        assert!(block.atlas(1).is_some());
        assert_eq!(block.line_text(0), "aβ");
    }
}
