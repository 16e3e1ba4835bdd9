//! End-to-end tests for the text pipeline.
//!
//! Everything runs against `SyntheticRasterizer`, so no system fonts are
//! needed. At 20px its glyphs are 10px wide with a 12px advance, spaces
//! advance 5px.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use lumen_text::utf8::{self, Utf8Ordering};
use lumen_text::{
    AtlasMode, Codepoint, EngineConfig, FontEngineContext, FontList, LayoutOptions, SyntheticRasterizer,
    TextBlock, WordWrap,
};

fn rasterizer() -> Arc<SyntheticRasterizer> {
    Arc::new(
        SyntheticRasterizer::new()
            .with_ascii_font("sans.ttf")
            .with_font("greek.ttf", "αβγδ")
            .with_kerning("sans.ttf", 'A', 'V', -3.0),
    )
}

fn context() -> (Arc<SyntheticRasterizer>, Arc<FontEngineContext>) {
    let raster = rasterizer();
    let ctx = Arc::new(FontEngineContext::new(raster.clone(), EngineConfig::default()));
    (raster, ctx)
}

#[test]
fn test_utf8_round_trip_and_ordering() {
    for s in ["", "plain", "ÄÖÜ ß", "αβγ", "日本語", "🎉 party"] {
        let cps = utf8::decode_all(s.as_bytes()).unwrap();
        assert_eq!(utf8::encode_all(&cps).unwrap(), s.as_bytes());
        assert_eq!(utf8::compare_str(s, s, true), Utf8Ordering::Equal);
    }

    assert_eq!(utf8::compare_str("ab", "abc", true), Utf8Ordering::APrefixOfB);
    assert_eq!(utf8::compare_str("Ab", "ab", false), Utf8Ordering::Equal);
    assert_ne!(utf8::compare_str("Ab", "ab", true), Utf8Ordering::Equal);

    let pairs = [("apple", "apricot"), ("zeta", "alpha"), ("α", "a"), ("x", "xy")];
    for (a, b) in pairs {
        for cs in [true, false] {
            assert_eq!(utf8::compare_str(a, b, cs), utf8::compare_str(b, a, cs).reverse());
        }
    }
}

#[test]
fn test_identical_blocks_share_atlas() {
    let (raster, ctx) = context();
    let fonts = FontList::new(["sans.ttf"]);
    let first = TextBlock::new(ctx.clone(), "shared", fonts.clone(), 20);
    let second = TextBlock::new(ctx.clone(), "shared", fonts, 20);

    let a = first.atlas(0).unwrap();
    let b = second.atlas(0).unwrap();
    assert!(Arc::ptr_eq(a, b));
    assert_eq!(a.id(), b.id());
    assert_eq!(raster.generate_calls(), 1);
    assert_eq!(ctx.atlases().stats().hits, 1);
}

#[test]
fn test_distinct_character_sets_never_share() {
    let (raster, ctx) = context();
    let fonts = FontList::new(["sans.ttf"]);
    let abc = TextBlock::new(ctx.clone(), "abc", fonts.clone(), 20);
    let ab = TextBlock::new(ctx.clone(), "ab", fonts, 20);

    assert_ne!(abc.atlas(0).unwrap().id(), ab.atlas(0).unwrap().id());
    assert_eq!(raster.generate_calls(), 2);
    // Both atlases still carry the baseline characters.
    assert!(ab.atlas(0).unwrap().contains('c' as Codepoint));
}

#[test]
fn test_word_wrap_modes() {
    let (_, ctx) = context();
    let fonts = FontList::new(["sans.ttf"]);
    let lines = |wrap: WordWrap| {
        let options = LayoutOptions {
            max_line_width: Some(35.0),
            wrap,
            ..ctx.layout_options()
        };
        let block = TextBlock::new(ctx.clone(), "abc def", fonts.clone(), 20).with_options(options);
        (0..block.layout().all_line_count)
            .map(|l| block.line_text(l).trim_end().to_string())
            .collect::<Vec<_>>()
    };

    assert_eq!(lines(WordWrap::On), vec!["abc", "def"]);
    assert_eq!(lines(WordWrap::Off), vec!["abc def"]);
    assert_eq!(lines(WordWrap::Bounded), vec!["abc", "def"]);
}

#[test]
fn test_kerning_overlap() {
    let (_, ctx) = context();
    let block = TextBlock::new(ctx, "AV", FontList::new(["sans.ttf"]), 20);
    let atlas = block.atlas(0).unwrap();
    let a_width = atlas.glyph('A' as Codepoint).unwrap().width as f32;
    let [a, v] = [block.characters()[0], block.characters()[1]];
    assert!(v.position_left_x < a.position_left_x + a_width);
}

#[test]
fn test_draw_height_by_line_count() {
    let (_, ctx) = context();
    let fonts = FontList::new(["sans.ttf"]);
    let one = TextBlock::new(ctx.clone(), "one", fonts.clone(), 20);
    assert_eq!(one.layout().all_line_count, 1);
    assert_eq!(one.all_draw_text_height(), one.layout().font_height);

    let three = TextBlock::new(ctx, "one\ntwo\nthree", fonts, 20);
    let layout = three.layout();
    assert_eq!(layout.all_line_count, 3);
    assert_eq!(
        three.all_draw_text_height(),
        (layout.font_height + 2.0 * layout.line_height).ceil()
    );
}

#[test]
fn test_unresolved_character_slot() {
    let (_, ctx) = context();
    let block = TextBlock::new(ctx, "aЖb", FontList::new(["sans.ttf", "greek.ttf"]), 20);
    assert_eq!(block.characters().len(), 3);
    assert_eq!(block.resolved().characters[1].font_index, None);
    assert!(!block.characters()[1].draw);
    assert!(block.characters()[2].draw);
}

#[test]
fn test_measure_matches_block() {
    let (_, ctx) = context();
    let fonts = FontList::new(["sans.ttf", "greek.ttf"]);
    let options = LayoutOptions {
        max_line_width: Some(60.0),
        wrap: WordWrap::On,
        ..ctx.layout_options()
    };
    let measured = ctx
        .measure("alpha α beta β", Path::new("sans.ttf"), &fonts, 20, &options)
        .unwrap();
    assert!(ctx.atlases().is_empty());

    let block = TextBlock::new(ctx.clone(), "alpha α beta β", fonts, 20).with_options(options);
    assert_eq!(block.layout(), &measured);
    assert!(!ctx.atlases().is_empty());
}

#[test]
fn test_concurrent_blocks_share_caches() {
    let (raster, ctx) = context();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ctx = ctx.clone();
            thread::spawn(move || {
                let text = if i % 2 == 0 { "even αβ" } else { "odd γδ" };
                let block = TextBlock::new(ctx, text, FontList::new(["sans.ttf", "greek.ttf"]), 20);
                block.width()
            })
        })
        .collect();

    let widths: Vec<f32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(widths.iter().all(|&w| w > 0.0));
    assert_eq!(widths[0], widths[2]);
    assert_eq!(widths[1], widths[3]);
    // One coverage query per font, one atlas per distinct (chars, font, size).
    assert_eq!(raster.coverage_calls(), 2);
    assert_eq!(raster.generate_calls(), 4);
}

#[test]
fn test_measure_only_atlas_for_cached_key() {
    let (raster, ctx) = context();
    let block = TextBlock::new(ctx.clone(), "hi", FontList::new(["sans.ttf"]), 20);
    let cps: Vec<Codepoint> = "hi".chars().map(|c| c as Codepoint).collect();
    let atlas = ctx
        .atlases()
        .get_or_build(&cps, Path::new("sans.ttf"), 20, AtlasMode::MeasureOnly)
        .unwrap();
    assert!(Arc::ptr_eq(&atlas, block.atlas(0).unwrap()));
    assert_eq!(raster.generate_calls(), 1);
}
