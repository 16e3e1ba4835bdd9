//! Per-character font resolution with fallback.
//!
//! Each codepoint is assigned the first font in the text's font list that
//! covers it, except that the font of the previous character is tried
//! first. Runs of text from one script therefore stay on one font without
//! rescanning the whole list per character.

use std::collections::HashSet;
use std::path::Path;

use crate::coverage::FontCoverageCache;
use crate::error::TextError;
use crate::fonts::FontList;
use crate::utf8::{self, Codepoint};

/// RGB color, each channel in [0.0, 1.0].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self, alpha: f32) -> [f32; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A codepoint and the font it will be drawn with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedCharacter {
    pub codepoint: Codepoint,
    /// Index into [`ResolvedText::fonts`]; `None` if no font covers it.
    pub font_index: Option<usize>,
    pub color: Color,
}

impl ResolvedCharacter {
    pub fn is_resolved(&self) -> bool {
        self.font_index.is_some()
    }
}

/// Resolution result for one string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedText {
    /// Font list with the main font at index 0.
    pub fonts: FontList,
    pub characters: Vec<ResolvedCharacter>,
}

impl ResolvedText {
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Distinct codepoints assigned to `font_index`, in first-seen order.
    pub fn codepoints_for_font(&self, font_index: usize) -> Vec<Codepoint> {
        let mut seen = HashSet::new();
        self.characters
            .iter()
            .filter(|c| c.font_index == Some(font_index))
            .filter(|c| seen.insert(c.codepoint))
            .map(|c| c.codepoint)
            .collect()
    }

    /// Font indices referenced by at least one character, ascending.
    pub fn used_fonts(&self) -> Vec<usize> {
        let mut used: Vec<usize> = self.characters.iter().filter_map(|c| c.font_index).collect();
        used.sort_unstable();
        used.dedup();
        used
    }

    pub fn unresolved_count(&self) -> usize {
        self.characters.iter().filter(|c| !c.is_resolved()).count()
    }
}

pub struct FontResolver<'a> {
    coverage: &'a FontCoverageCache,
}

impl<'a> FontResolver<'a> {
    pub fn new(coverage: &'a FontCoverageCache) -> Self {
        Self { coverage }
    }

    /// Decode `text` and assign a font to every codepoint.
    ///
    /// `main_font` is moved to (or inserted at) the front of `fonts` for
    /// this resolution; the caller's list is not modified.
    pub fn resolve_characters(
        &self,
        text: &[u8],
        main_font: &Path,
        fonts: &FontList,
        color: Color,
    ) -> Result<ResolvedText, TextError> {
        let codepoints = utf8::decode_all(text).map_err(|e| {
            log::warn!("FontResolver: {e}");
            TextError::from(e)
        })?;

        let fonts = fonts.with_default(main_font);
        let mut characters = Vec::with_capacity(codepoints.len());
        let mut previous: Option<usize> = None;

        for cp in codepoints {
            let preferred = previous.and_then(|i| fonts.get(i));
            let font_index = self
                .coverage
                .resolve_font_index(cp, preferred, fonts.paths());
            characters.push(ResolvedCharacter {
                codepoint: cp,
                font_index,
                color,
            });
            previous = font_index;
        }

        let resolved = ResolvedText { fonts, characters };
        let unresolved = resolved.unresolved_count();
        if unresolved > 0 {
            log::debug!(
                "FontResolver: {unresolved} of {} characters have no font",
                resolved.len()
            );
        }
        Ok(resolved)
    }
}
