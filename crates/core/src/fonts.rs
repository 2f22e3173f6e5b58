//! Caption fonts.
//!
//! Captions name their font the way a stylesheet would: a comma-separated
//! family stack such as `Impact, sans-serif`. [`FontBook`] indexes the font
//! files it can find and resolves a stack to the first family it has,
//! preferring bold faces since captions are drawn bold.

use crate::error::{AppError, Result};
use ab_glyph::FontArc;
use directories::{BaseDirs, ProjectDirs};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A selectable caption font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemeFont {
    pub name: &'static str,
    pub font_family: &'static str,
}

/// The fonts offered to the user. The first entry is the default.
pub const FONTS: &[MemeFont] = &[
    MemeFont { name: "Impact", font_family: "Impact, sans-serif" },
    MemeFont { name: "Arial Black", font_family: "\"Arial Black\", Gadget, sans-serif" },
    MemeFont { name: "Comic Sans", font_family: "\"Comic Sans MS\", \"Comic Sans\", cursive" },
    MemeFont { name: "Montserrat", font_family: "Montserrat, sans-serif" },
    MemeFont { name: "Lobster", font_family: "Lobster, cursive" },
    MemeFont { name: "Bangers", font_family: "Bangers, cursive" },
    MemeFont { name: "Anton", font_family: "Anton, sans-serif" },
];

pub fn default_font_family() -> &'static str {
    FONTS[0].font_family
}

/// Looks up a font by its display name, ignoring case.
pub fn font_by_name(name: &str) -> Option<&'static MemeFont> {
    FONTS.iter().find(|f| f.name.eq_ignore_ascii_case(name.trim()))
}

const GENERIC_FAMILIES: &[(&str, &[&str])] = &[
    ("sansserif", &["dejavusans", "liberationsans", "arial", "helvetica", "notosans", "freesans"]),
    ("serif", &["dejavuserif", "liberationserif", "timesnewroman", "notoserif", "freeserif"]),
    ("cursive", &["comicsansms", "comicneue", "comicrelief"]),
    ("monospace", &["dejavusansmono", "liberationmono", "couriernew", "notosansmono"]),
];

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Index of font files keyed by normalized file stem.
///
/// Files are parsed on first use and kept for later exports.
#[derive(Default)]
pub struct FontBook {
    files: BTreeMap<String, PathBuf>,
    loaded: Mutex<BTreeMap<String, FontArc>>,
}

impl FontBook {
    /// Indexes fonts from `extra_dir`, the per-user data directory and the
    /// platform font directories, in that order. Earlier directories win on
    /// name clashes.
    pub fn discover(extra_dir: Option<&Path>) -> Self {
        let mut book = Self::default();
        for dir in extra_dir.map(Path::to_path_buf).into_iter().chain(search_dirs()) {
            book.index_dir(&dir);
        }
        debug!(fonts = book.files.len(), "Indexed font files");
        book
    }

    /// Adds every font file under `dir` to the index.
    pub fn index_dir(&mut self, dir: &Path) {
        if !dir.is_dir() {
            return;
        }
        for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
            let path = entry.path();
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if !is_font {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                self.files
                    .entry(normalize(stem))
                    .or_insert_with(|| path.to_path_buf());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Resolves a family stack to a font.
    ///
    /// Each family is tried in order, generic families expand to common
    /// concrete ones, and if nothing matches any indexed font is used.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Composition`] if no font is available at all.
    pub fn resolve(&self, family_stack: &str) -> Result<FontArc> {
        for family in parse_family_stack(family_stack) {
            let key = normalize(&family);
            if let Some(font) = self.lookup(&key) {
                return Ok(font);
            }
            if let Some((_, concrete)) = GENERIC_FAMILIES.iter().find(|(g, _)| *g == key) {
                if let Some(font) = concrete.iter().find_map(|c| self.lookup(c)) {
                    return Ok(font);
                }
            }
        }

        warn!(family = family_stack, "No matching font, using any available font");
        self.files
            .keys()
            .find_map(|k| self.load_key(k))
            .ok_or_else(|| AppError::composition("no usable font found"))
    }

    /// Describes what a family stack resolves to, for display.
    pub fn describe(&self, family_stack: &str) -> Option<String> {
        parse_family_stack(family_stack).into_iter().find_map(|family| {
            let key = normalize(&family);
            self.best_file_key(&key)
                .and_then(|k| self.files.get(&k))
                .map(|p| p.display().to_string())
        })
    }

    fn lookup(&self, key: &str) -> Option<FontArc> {
        self.best_file_key(key).and_then(|k| self.load_key(&k))
    }

    /// Picks the best file for a family: exact bold face, then the plain
    /// face, then any face of the family.
    fn best_file_key(&self, key: &str) -> Option<String> {
        let bold = format!("{}bold", key);
        if self.files.contains_key(&bold) {
            return Some(bold);
        }
        if self.files.contains_key(key) {
            return Some(key.to_string());
        }
        let faces: Vec<&String> = self.files.keys().filter(|k| k.starts_with(key)).collect();
        faces
            .iter()
            .find(|k| k.contains("bold") && !k.contains("italic") && !k.contains("oblique"))
            .or(faces.first())
            .map(|k| (*k).clone())
    }

    fn load_key(&self, key: &str) -> Option<FontArc> {
        if let Some(font) = self.cache().get(key) {
            return Some(font.clone());
        }
        let path = self.files.get(key)?;
        match std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|data| FontArc::try_from_vec(data).map_err(|e| e.to_string()))
        {
            Ok(font) => {
                debug!(path = %path.display(), "Loaded font");
                self.cache().insert(key.to_string(), font.clone());
                Some(font)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load font");
                None
            }
        }
    }

    fn cache(&self) -> MutexGuard<'_, BTreeMap<String, FontArc>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("files", &self.files.len())
            .field("loaded", &self.cache().keys().cloned().collect::<Vec<_>>())
            .finish()
    }
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(project) = ProjectDirs::from("", "ai-meme", "ai-meme") {
        dirs.push(project.data_dir().join("fonts"));
    }
    if let Some(base) = BaseDirs::new() {
        dirs.push(base.data_dir().join("fonts"));
        dirs.push(base.home_dir().join(".fonts"));
        dirs.push(base.home_dir().join("Library/Fonts"));
    }
    for system in [
        "/usr/share/fonts",
        "/usr/local/share/fonts",
        "/Library/Fonts",
        "/System/Library/Fonts",
        "C:\\Windows\\Fonts",
    ] {
        dirs.push(PathBuf::from(system));
    }
    dirs
}

/// Splits a CSS-style family stack into unquoted family names.
pub fn parse_family_stack(stack: &str) -> Vec<String> {
    stack
        .split(',')
        .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Lowercases and drops separators so `Arial Black`, `arial-black` and
/// `ArialBlack` compare equal.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
