//! Font coverage cache: which codepoints each font file can render.
//!
//! The rasterizer is asked once per distinct font file. Entries live for
//! the lifetime of the cache. A font whose coverage query fails gets no
//! entry; it is remembered as failed and never queried again.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cache::{Lookup, SyncCache};
use crate::raster::{RasterError, Rasterizer};
use crate::utf8::Codepoint;

/// The set of codepoints one font file supports.
#[derive(Debug)]
pub struct FontCoverage {
    path: PathBuf,
    codepoints: HashSet<Codepoint>,
}

impl FontCoverage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn supports(&self, cp: Codepoint) -> bool {
        self.codepoints.contains(&cp)
    }

    pub fn len(&self) -> usize {
        self.codepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codepoints.is_empty()
    }
}

pub struct FontCoverageCache {
    rasterizer: Arc<dyn Rasterizer>,
    entries: SyncCache<PathBuf, FontCoverage>,
    failed: Mutex<HashSet<PathBuf>>,
}

impl FontCoverageCache {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            rasterizer,
            entries: SyncCache::unbounded(),
            failed: Mutex::new(HashSet::new()),
        }
    }

    /// Coverage of `font`, querying the rasterizer on first use.
    pub fn coverage(&self, font: &Path) -> Option<Arc<FontCoverage>> {
        if self.has_failed(font) {
            return None;
        }

        let result = self
            .entries
            .get_or_try_insert_with(font.to_path_buf(), || -> Result<_, RasterError> {
                let codepoints = self.rasterizer.supported_characters(font)?;
                Ok(FontCoverage {
                    path: font.to_path_buf(),
                    codepoints: codepoints.into_iter().collect(),
                })
            });

        match result {
            Ok((coverage, Lookup::Built)) => {
                log::debug!(
                    "FontCoverageCache: loaded {} ({} codepoints)",
                    font.display(),
                    coverage.len()
                );
                Some(coverage)
            }
            Ok((coverage, Lookup::Hit)) => Some(coverage),
            Err(e) => {
                log::warn!("FontCoverageCache: {e}; font disabled");
                self.failed_fonts().insert(font.to_path_buf());
                None
            }
        }
    }

    fn failed_fonts(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.failed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether loading `font` has already failed.
    pub fn has_failed(&self, font: &Path) -> bool {
        self.failed_fonts().contains(font)
    }

    /// Make sure `font` has a coverage entry. Returns `false` if the font
    /// cannot be loaded.
    pub fn ensure_loaded(&self, font: &Path) -> bool {
        self.coverage(font).is_some()
    }

    pub fn is_loaded(&self, font: &Path) -> bool {
        self.entries.contains(&font.to_path_buf())
    }

    /// Whether `font` has a glyph for `cp`. Unloadable fonts support nothing.
    pub fn supports(&self, cp: Codepoint, font: &Path) -> bool {
        self.coverage(font).is_some_and(|c| c.supports(cp))
    }

    /// Pick the font for `cp`: `preferred` first, then `ordered` front to
    /// back. The returned index points into `ordered`.
    ///
    /// Checking the preferred font first keeps runs of text on the font
    /// they started with when several fonts could render them.
    pub fn resolve_font_index<P: AsRef<Path>>(
        &self,
        cp: Codepoint,
        preferred: Option<&Path>,
        ordered: &[P],
    ) -> Option<usize> {
        if let Some(preferred) = preferred {
            if let Some(index) = ordered.iter().position(|p| p.as_ref() == preferred) {
                if self.supports(cp, preferred) {
                    return Some(index);
                }
            }
        }

        ordered
            .iter()
            .position(|font| self.supports(cp, font.as_ref()))
    }

    /// Number of fonts with a coverage entry.
    pub fn loaded_count(&self) -> usize {
        self.entries.len()
    }
}
