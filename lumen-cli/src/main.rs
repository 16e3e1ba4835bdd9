//! Lumen CLI: lays out text with real font files and prints the result.
//!
//! ```text
//! lumen [--font PATH]... [--family "Inter, sans-serif"] [--size PX]
//!       [--width PX] [--wrap on|off|bounded] [--max-lines N]
//!       [--config engine.json] TEXT
//! ```
//!
//! Without `--font`, fonts are discovered on the system via `--family`
//! (default `sans-serif`). Set `RUST_LOG=debug` to watch the caches.

use clap::{Parser, ValueEnum};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use lumen_text::{
    EngineConfig, FontDescriptor, FontEngineContext, FontList, FontRegistry, FontdueRasterizer,
    TextBlock, WordWrap,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Wrap {
    On,
    Off,
    Bounded,
}

impl From<Wrap> for WordWrap {
    fn from(wrap: Wrap) -> Self {
        match wrap {
            Wrap::On => WordWrap::On,
            Wrap::Off => WordWrap::Off,
            Wrap::Bounded => WordWrap::Bounded,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lumen", about = "Lay out text with real font files and print the lines")]
struct Args {
    /// Font file; repeat for a fallback chain. The first is the main font.
    #[arg(long = "font", value_name = "PATH")]
    fonts: Vec<PathBuf>,

    /// CSS-style family chain used when no `--font` is given.
    #[arg(long, default_value = "sans-serif")]
    family: String,

    #[arg(long, value_name = "PX", default_value_t = 16)]
    size: u32,

    /// Maximum line width in pixels.
    #[arg(long, value_name = "PX")]
    width: Option<f32>,

    #[arg(long, value_enum)]
    wrap: Option<Wrap>,

    #[arg(long, value_name = "N")]
    max_lines: Option<usize>,

    /// Engine config as JSON.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Text to lay out; several words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let json = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    EngineConfig::from_json(&json).map_err(|e| e.to_string())
}

fn font_list(args: &Args) -> FontList {
    if !args.fonts.is_empty() {
        return FontList::new(args.fonts.iter().cloned());
    }
    let registry = FontRegistry::discover();
    info!("Font registry: {registry}");
    registry.fallback_list(&FontDescriptor::from_css(&args.family, 400, false))
}

fn run(args: Args) -> Result<(), String> {
    let config = load_config(args.config.as_ref())?;
    let fonts = font_list(&args);
    if fonts.is_empty() {
        return Err(format!("no fonts found for '{}'", args.family));
    }
    for (i, font) in fonts.iter().enumerate() {
        info!("font {i}: {}", font.display());
    }

    let ctx = Arc::new(FontEngineContext::data_only(Arc::new(FontdueRasterizer::new()), config));
    let mut options = ctx.layout_options();
    options.max_line_width = args.width;
    options.max_line_count = args.max_lines;
    if let Some(wrap) = args.wrap {
        options.wrap = wrap.into();
    }

    let text = args.text.join(" ");
    let block = TextBlock::new(ctx, &text, fonts, args.size).with_options(options);
    let layout = block.layout();
    if layout.is_empty() {
        return Err("layout failed (see log output)".into());
    }

    for line in &layout.lines[..layout.all_line_count] {
        println!(
            "{:>3} {:>8.1}px  {}",
            line.line_number,
            line.pixel_width,
            block.line_text(line.line_number)
        );
    }
    println!(
        "width {:.1}px, height {:.1}px, font height {:.1}px, line height {:.1}px",
        block.width(),
        block.all_draw_text_height(),
        layout.font_height,
        layout.line_height
    );

    let unresolved = block.resolved().unresolved_count();
    if unresolved > 0 {
        println!("{unresolved} characters have no font");
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("lumen: {e}");
            ExitCode::FAILURE
        }
    }
}
