//! Font lists and system font discovery.
//!
//! [`FontList`] is the ordered list of font files a text block draws from;
//! index 0 is the default font and the rest form the fallback chain.
//!
//! [`FontRegistry`] wraps `font-kit` to find font *files* on the system and
//! turn a CSS-like family chain (`"Noto Sans, DejaVu Sans, sans-serif"`)
//! into a [`FontList`]. Only faces backed by a file on disk are kept,
//! since the rasterizer works on paths. A path opens the first face of a
//! collection, so fallback lists only draw from faces at index 0.
//!
//! ```text
//! FontRegistry
//!   ├── families: HashMap<String, Vec<FontFace>>   (lowercase family → faces)
//!   ├── generic_map: HashMap<GenericFamily, String>
//!   └── fallback_list(descriptor) → FontList
//! ```

use font_kit::family_name::FamilyName;
use font_kit::handle::Handle;
use font_kit::properties::{Properties as FkProperties, Style as FkStyle};
use font_kit::source::SystemSource;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

// ── Font list ───────────────────────────────────────────────────────

/// Ordered font files; index 0 is the default.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FontList {
    paths: Vec<PathBuf>,
}

impl FontList {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut list = Self::default();
        for p in paths {
            list.push(p);
        }
        list
    }

    /// Append a fallback font. Duplicates are ignored.
    pub fn push(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Make `path` the default font, moving it to the front or inserting it.
    pub fn set_default(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if let Some(pos) = self.paths.iter().position(|p| *p == path) {
            self.paths.remove(pos);
        }
        self.paths.insert(0, path);
    }

    /// A copy of this list with `path` as the default.
    pub fn with_default(&self, path: &Path) -> Self {
        let mut list = self.clone();
        list.set_default(path);
        list
    }

    pub fn default_font(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    pub fn position(&self, path: &Path) -> Option<usize> {
        self.paths.iter().position(|p| p == path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

// ── Descriptors ─────────────────────────────────────────────────────

/// CSS generic font families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenericFamily {
    Serif,
    SansSerif,
    Monospace,
}

/// One face of a family, backed by a file.
#[derive(Clone, Debug, PartialEq)]
pub struct FontFace {
    pub path: PathBuf,
    /// Face index inside collection files (`.ttc`).
    pub font_index: u32,
    pub postscript_name: String,
    /// Weight (100–900).
    pub weight: u16,
    pub italic: bool,
}

/// Family chain plus the face properties to match within each family.
#[derive(Clone, Debug, PartialEq)]
pub struct FontDescriptor {
    /// Lowercase family names in fallback order.
    pub families: Vec<String>,
    pub weight: u16,
    pub italic: bool,
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self {
            families: vec!["sans-serif".into()],
            weight: 400,
            italic: false,
        }
    }
}

impl FontDescriptor {
    /// Parse `"Noto Sans, 'DejaVu Sans', sans-serif"` into a fallback chain.
    pub fn from_css(family_str: &str, weight: u16, italic: bool) -> Self {
        let families: Vec<String> = family_str
            .split(',')
            .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            families: if families.is_empty() {
                vec!["sans-serif".into()]
            } else {
                families
            },
            weight,
            italic,
        }
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// System font files indexed by family.
pub struct FontRegistry {
    families: HashMap<String, Vec<FontFace>>,
    generic_map: HashMap<GenericFamily, String>,
    face_count: usize,
    discovery_time_ms: f64,
}

impl FontRegistry {
    /// Enumerate system fonts. I/O bound; call once and keep the result.
    pub fn discover() -> Self {
        let start = Instant::now();
        let source = SystemSource::new();
        let mut families: HashMap<String, Vec<FontFace>> = HashMap::new();
        let mut face_count = 0usize;

        match source.all_families() {
            Ok(names) => {
                for name in &names {
                    let Ok(family) = source.select_family_by_name(name) else {
                        continue;
                    };
                    let faces: Vec<FontFace> =
                        family.fonts().iter().filter_map(face_from_handle).collect();
                    if !faces.is_empty() {
                        face_count += faces.len();
                        families.entry(name.to_lowercase()).or_default().extend(faces);
                    }
                }
            }
            Err(e) => log::warn!("FontRegistry: font enumeration failed: {e:?}"),
        }

        let generic_map = resolve_generics(&source);
        let discovery_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "FontRegistry: found {} font files in {} families ({:.1}ms)",
            face_count,
            families.len(),
            discovery_time_ms,
        );

        Self {
            families,
            generic_map,
            face_count,
            discovery_time_ms,
        }
    }

    /// Build a registry from known faces (no system access).
    pub fn from_faces<I>(faces: I) -> Self
    where
        I: IntoIterator<Item = (String, FontFace)>,
    {
        let mut families: HashMap<String, Vec<FontFace>> = HashMap::new();
        let mut face_count = 0;
        for (family, face) in faces {
            families.entry(family.to_lowercase()).or_default().push(face);
            face_count += 1;
        }
        Self {
            families,
            generic_map: HashMap::new(),
            face_count,
            discovery_time_ms: 0.0,
        }
    }

    /// Map a generic family to a concrete one.
    pub fn set_generic(&mut self, generic: GenericFamily, family: &str) {
        self.generic_map.insert(generic, family.to_lowercase());
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn face_count(&self) -> usize {
        self.face_count
    }

    pub fn has_family(&self, name: &str) -> bool {
        self.families.contains_key(&name.to_lowercase())
    }

    /// Best face of the first family in the chain that exists.
    pub fn match_font(&self, descriptor: &FontDescriptor) -> Option<&FontFace> {
        descriptor
            .families
            .iter()
            .find_map(|family| self.best_face(family, descriptor))
    }

    /// One font file per family in the chain, in order, with the generic
    /// sans-serif family appended as the last resort.
    pub fn fallback_list(&self, descriptor: &FontDescriptor) -> FontList {
        let mut list = FontList::default();
        let last_resort = "sans-serif".to_string();
        for family in descriptor.families.iter().chain(std::iter::once(&last_resort)) {
            let best = self.faces(family).and_then(|faces| {
                faces
                    .iter()
                    .filter(|face| face.font_index == 0)
                    .min_by_key(|face| match_score(face, descriptor))
            });
            if let Some(face) = best {
                list.push(face.path.clone());
            }
        }
        list
    }

    fn best_face(&self, family: &str, descriptor: &FontDescriptor) -> Option<&FontFace> {
        self.faces(family)?
            .iter()
            .min_by_key(|face| match_score(face, descriptor))
    }

    fn faces(&self, family: &str) -> Option<&[FontFace]> {
        let concrete = match parse_generic(family) {
            Some(generic) => self.generic_map.get(&generic)?.as_str(),
            None => family,
        };
        self.families.get(concrete).map(Vec::as_slice)
    }
}

impl fmt::Display for FontRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FontRegistry({} families, {} faces, {:.1}ms)",
            self.families.len(),
            self.face_count,
            self.discovery_time_ms,
        )
    }
}

/// Lower is better: style mismatch dominates, then weight distance.
fn match_score(face: &FontFace, desc: &FontDescriptor) -> u32 {
    let style_diff = u32::from(face.italic != desc.italic);
    let weight_diff = (face.weight as i32 - desc.weight as i32).unsigned_abs();
    style_diff * 1000 + weight_diff
}

fn parse_generic(name: &str) -> Option<GenericFamily> {
    match name {
        "serif" => Some(GenericFamily::Serif),
        "sans-serif" => Some(GenericFamily::SansSerif),
        "monospace" => Some(GenericFamily::Monospace),
        _ => None,
    }
}

fn face_from_handle(handle: &Handle) -> Option<FontFace> {
    let Handle::Path { path, font_index } = handle else {
        return None;
    };
    let font = handle.load().ok()?;
    let props = font.properties();
    Some(FontFace {
        path: path.clone(),
        font_index: *font_index,
        postscript_name: font.postscript_name().unwrap_or_default(),
        weight: props.weight.0 as u16,
        italic: props.style != FkStyle::Normal,
    })
}

fn resolve_generics(source: &SystemSource) -> HashMap<GenericFamily, String> {
    let mut map = HashMap::new();
    let props = FkProperties::new();

    let generics = [
        (GenericFamily::Serif, FamilyName::Serif),
        (GenericFamily::SansSerif, FamilyName::SansSerif),
        (GenericFamily::Monospace, FamilyName::Monospace),
    ];

    for (generic, fk_name) in generics {
        if let Ok(handle) = source.select_best_match(&[fk_name], &props) {
            if let Ok(font) = handle.load() {
                let name = font.family_name();
                if !name.is_empty() {
                    map.insert(generic, name.to_lowercase());
                }
            }
        }
    }

    map
}

// ===================================================================
// Tests
// ===================================================================
