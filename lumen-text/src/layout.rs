//! Line layout: pen positions, kerning, line breaking and extents.
//!
//! Input is a [`ResolvedText`] plus one atlas per font of its font list.
//! Output is a [`TextLayout`] with one [`LayoutCharacter`] per resolved
//! character (same length, same order), the line list and the overall
//! metrics the renderer and widgets need.
//!
//! Horizontal positions follow the font's advances exactly. For two
//! consecutive glyphs on a line:
//!
//! ```text
//! x(cur) = x(prev) + width(prev) + kern(prev, cur)
//!        + left_bearing(cur) + right_side_bearing(prev)
//! ```
//!
//! where `x` is the left edge of the glyph bitmap and the first glyph of a
//! line sits at `x = 0`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::atlas::GlyphAtlas;
use crate::raster::{GlyphMetrics, Rasterizer};
use crate::resolver::{ResolvedCharacter, ResolvedText};
use crate::utf8::Codepoint;

const NEWLINE: Codepoint = '\n' as Codepoint;
const SPACE: Codepoint = ' ' as Codepoint;

/// Line breaking policy when a line runs past `max_line_width`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordWrap {
    /// Break before the first glyph that does not fit, even mid-word.
    #[default]
    Bounded,
    /// Only explicit `\n` breaks lines; overflow is clipped by the renderer.
    Off,
    /// Break after the last space on the line, else behave like `Bounded`.
    On,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutOptions {
    /// Available width in pixels; `None` = unlimited.
    pub max_line_width: Option<f32>,
    pub wrap: WordWrap,
    /// Maximum number of rendered lines; `None` = unlimited.
    pub max_line_count: Option<usize>,
    /// Keep lines started by `\n` past `max_line_count` in the line list
    /// (their characters are not drawn) instead of dropping them.
    pub allow_break_line_over_max_line: bool,
    /// Line height as a multiple of the font height.
    pub line_spacing: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            max_line_width: None,
            wrap: WordWrap::Bounded,
            max_line_count: None,
            allow_break_line_over_max_line: false,
            line_spacing: 1.5,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutLine {
    pub line_number: usize,
    pub pixel_width: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutCharacter {
    /// Left edge of the glyph bitmap, relative to the line start.
    pub position_left_x: f32,
    /// Top edge of the glyph bitmap, relative to the top of the text.
    pub position_top_y: f32,
    pub line_number: usize,
    /// Glyph position inside the atlas of the character's font.
    pub glyph_index: Option<usize>,
    pub draw: bool,
}

/// Vertical extent actually covered by glyph pixels, relative to the top
/// of the text. `top` is negative when glyphs rise above the first line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VisibleBounds {
    pub top: f32,
    pub bottom: f32,
}

/// Result of laying out one text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextLayout {
    pub characters: Vec<LayoutCharacter>,
    /// Every line, including lines kept past the line cap.
    pub lines: Vec<LayoutLine>,
    /// Widest rendered line.
    pub width: f32,
    pub font_height: f32,
    pub line_height: f32,
    /// Baseline offset from the top of each line.
    pub baseline: f32,
    /// Number of rendered lines.
    pub all_line_count: usize,
    pub visible: VisibleBounds,
}

impl TextLayout {
    /// `font_height + (all_line_count - 1) * line_height`, rounded up.
    pub fn all_draw_text_height(&self) -> f32 {
        if self.all_line_count == 0 {
            return 0.0;
        }
        (self.font_height + (self.all_line_count - 1) as f32 * self.line_height).ceil()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// The previous placed glyph on the current line.
#[derive(Clone, Copy)]
struct Pen {
    x: f32,
    width: f32,
    right_side_bearing: f32,
    font_index: usize,
    codepoint: Codepoint,
}

impl Pen {
    fn end(&self) -> f32 {
        self.x + self.width
    }
}

pub struct LayoutEngine {
    options: LayoutOptions,
}

impl LayoutEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Lay out `text`. `atlases[i]` is the atlas for font `i` of
    /// `text.fonts`; a missing atlas makes that font's characters invisible.
    pub fn layout(
        &self,
        text: &ResolvedText,
        atlases: &[Option<Arc<GlyphAtlas>>],
        rasterizer: &dyn Rasterizer,
    ) -> TextLayout {
        if text.is_empty() {
            return TextLayout::default();
        }

        let chars = &text.characters;
        let n = chars.len();
        let glyph_of = |i: usize| glyph_for(atlases, &chars[i]);

        // Vertical metrics over every font that has characters.
        let used: Vec<&GlyphAtlas> = text
            .used_fonts()
            .into_iter()
            .filter_map(|f| atlases.get(f)?.as_deref())
            .collect();
        let font_height = used.iter().map(|a| a.font_height()).fold(0.0, f32::max);
        let baseline = used.iter().map(|a| a.ascent()).fold(0.0, f32::max);
        let line_height = (font_height * self.options.line_spacing).ceil();

        let wrap_width = match self.options.wrap {
            WordWrap::Off => None,
            _ => self.options.max_line_width,
        };
        let cap = self.options.max_line_count.unwrap_or(usize::MAX).max(1);

        let mut out = vec![LayoutCharacter::default(); n];
        // Right edge of each placed non-space glyph, for line widths.
        let mut ends = vec![None::<f32>; n];
        let mut lines = vec![LayoutLine::default()];
        let mut line = 0usize;
        let mut line_start = 0usize;
        let mut pen: Option<Pen> = None;
        let mut rendered_lines = 0usize;
        let mut overflow = false;

        let mut i = 0;
        while i < n {
            let cp = chars[i].codepoint;

            if overflow {
                out[i] = LayoutCharacter {
                    line_number: line,
                    ..Default::default()
                };
                if cp == NEWLINE && self.options.allow_break_line_over_max_line {
                    line += 1;
                    lines.push(LayoutLine {
                        line_number: line,
                        pixel_width: 0.0,
                    });
                }
                i += 1;
                continue;
            }

            if cp == NEWLINE {
                out[i] = LayoutCharacter {
                    position_left_x: pen.map_or(0.0, |p| p.end()),
                    line_number: line,
                    ..Default::default()
                };
                lines[line].pixel_width = line_width(&ends[line_start..=i]);
                if line + 1 >= cap {
                    rendered_lines = line + 1;
                    overflow = true;
                    if self.options.allow_break_line_over_max_line {
                        line += 1;
                        lines.push(LayoutLine {
                            line_number: line,
                            pixel_width: 0.0,
                        });
                    }
                } else {
                    line += 1;
                    lines.push(LayoutLine {
                        line_number: line,
                        pixel_width: 0.0,
                    });
                }
                line_start = i + 1;
                pen = None;
                i += 1;
                continue;
            }

            let Some((atlas, glyph_index, glyph)) = glyph_of(i) else {
                // Unresolved or missing glyph: zero width, not drawn.
                out[i] = LayoutCharacter {
                    position_left_x: pen.map_or(0.0, |p| p.end()),
                    line_number: line,
                    ..Default::default()
                };
                i += 1;
                continue;
            };
            let font_index = chars[i].font_index.unwrap_or_default();

            let x = match pen {
                None => 0.0,
                Some(prev) => {
                    let kern = if prev.font_index == font_index {
                        rasterizer.kerning(atlas.font(), atlas.size(), prev.codepoint, cp)
                    } else {
                        0.0
                    };
                    prev.end() + kern + glyph.left_bearing + prev.right_side_bearing
                }
            };
            let end = x + glyph.width as f32;

            let overflows = wrap_width.is_some_and(|w| end > w);
            if overflows && cp != SPACE && pen.is_some() {
                // Where the next line starts.
                let break_at = match self.options.wrap {
                    WordWrap::On => (line_start..i)
                        .rev()
                        .find(|&s| chars[s].codepoint == SPACE)
                        .map_or(i, |s| s + 1),
                    _ => i,
                };

                lines[line].pixel_width = line_width(&ends[line_start..break_at]);
                for end in &mut ends[break_at..=i] {
                    *end = None;
                }
                if line + 1 >= cap {
                    rendered_lines = line + 1;
                    overflow = true;
                } else {
                    line += 1;
                    lines.push(LayoutLine {
                        line_number: line,
                        pixel_width: 0.0,
                    });
                }
                line_start = break_at;
                pen = None;
                i = break_at;
                continue;
            }

            out[i] = LayoutCharacter {
                position_left_x: x,
                position_top_y: line as f32 * line_height + baseline - glyph.top_bearing,
                line_number: line,
                glyph_index: Some(glyph_index),
                draw: true,
            };
            if cp != SPACE {
                ends[i] = Some(end);
            }
            pen = Some(Pen {
                x,
                width: glyph.width as f32,
                right_side_bearing: glyph.right_side_bearing(),
                font_index,
                codepoint: cp,
            });
            i += 1;
        }

        if !overflow {
            lines[line].pixel_width = line_width(&ends[line_start..]);
            rendered_lines = line + 1;
        }

        // Extents cover every glyph that resolved, drawn or not.
        let (min_top, max_bottom) = (0..n)
            .filter(|&i| chars[i].codepoint != NEWLINE)
            .filter_map(|i| glyph_of(i).map(|(_, _, g)| g))
            .fold(None, |acc: Option<(f32, f32)>, g| {
                let top = baseline - g.top_bearing;
                let bottom = baseline + g.bottom_bearing();
                Some(match acc {
                    None => (top, bottom),
                    Some((t, b)) => (t.min(top), b.max(bottom)),
                })
            })
            .unwrap_or((0.0, 0.0));

        let width = lines[..rendered_lines]
            .iter()
            .map(|l| l.pixel_width)
            .fold(0.0, f32::max);

        TextLayout {
            characters: out,
            lines,
            width,
            font_height,
            line_height,
            baseline,
            all_line_count: rendered_lines,
            visible: VisibleBounds {
                top: min_top,
                bottom: (rendered_lines - 1) as f32 * line_height + max_bottom,
            },
        }
    }
}

fn glyph_for<'a>(
    atlases: &'a [Option<Arc<GlyphAtlas>>],
    ch: &ResolvedCharacter,
) -> Option<(&'a GlyphAtlas, usize, &'a GlyphMetrics)> {
    let atlas = atlases.get(ch.font_index?)?.as_deref()?;
    let index = atlas.glyph_index(ch.codepoint)?;
    Some((atlas, index, atlas.glyph_at(index)?))
}

fn line_width(ends: &[Option<f32>]) -> f32 {
    ends.iter().flatten().copied().fold(0.0, f32::max)
}

// ===================================================================
// Tests
// ===================================================================
