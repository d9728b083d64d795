//! Item sources: logo directories and manifest files.
//!
//! A manifest lists one item per line:
//!
//! ```text
//! # alt            | src              | href                      | title
//! Acme Plumbing    | logos/acme.png   | https://acme.example      | Acme
//! Bolt HVAC        |                  | https://bolt.example
//! ```
//!
//! An empty `src` makes a text item.  Relative `src` paths resolve against
//! the manifest's directory.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;

use super::item::LoopItem;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: missing alt text")]
    MissingAlt { path: PathBuf, line: usize },

    #[error("{path}:{line}: expected at most 4 fields (alt | src | href | title), found {found}")]
    TooManyFields {
        path: PathBuf,
        line: usize,
        found: usize,
    },

    #[error("logo directory {0} does not exist or is not a directory")]
    NotADirectory(PathBuf),
}

/// Where the loop's items come from.  Kept around so the set can be
/// reloaded from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    Manifest(PathBuf),
    Directory { dir: PathBuf, show_hidden: bool },
    Inline(Vec<LoopItem>),
}

impl ItemSource {
    pub fn load(&self) -> Result<Vec<LoopItem>, ManifestError> {
        match self {
            ItemSource::Manifest(path) => load_manifest(path),
            ItemSource::Directory { dir, show_hidden } => discover_logos(dir, *show_hidden),
            ItemSource::Inline(items) => Ok(items.clone()),
        }
    }

    /// Short description for titles and logs.
    pub fn describe(&self) -> String {
        match self {
            ItemSource::Manifest(path) => path.display().to_string(),
            ItemSource::Directory { dir, .. } => dir.display().to_string(),
            ItemSource::Inline(items) => format!("{} items", items.len()),
        }
    }
}

/// Read and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<LoopItem>, ManifestError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manifest(&contents, base, path)
}

/// Parse manifest text.  `origin` is only used in error messages.
pub fn parse_manifest(
    contents: &str,
    base: &Path,
    origin: &Path,
) -> Result<Vec<LoopItem>, ManifestError> {
    let mut items = Vec::new();

    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() > 4 {
            return Err(ManifestError::TooManyFields {
                path: origin.to_path_buf(),
                line: idx + 1,
                found: fields.len(),
            });
        }
        let field = |i: usize| fields.get(i).copied().filter(|f| !f.is_empty());

        let Some(alt) = field(0) else {
            return Err(ManifestError::MissingAlt {
                path: origin.to_path_buf(),
                line: idx + 1,
            });
        };

        let mut item = match field(1) {
            Some(src) => {
                let src = Path::new(src);
                let src = if src.is_absolute() {
                    src.to_path_buf()
                } else {
                    base.join(src)
                };
                LoopItem::image(src, alt)
            }
            None => LoopItem::text(alt),
        };
        if let Some(href) = field(2) {
            item = item.with_href(href);
        }
        if let Some(title) = field(3) {
            item = item.with_title(title);
        }
        items.push(item);
    }

    Ok(items)
}

/// Collect every image directly inside `dir` (one level, `.gitignore` and
/// hidden files respected), sorted by name.  Alt text is the file stem.
pub fn discover_logos(dir: &Path, show_hidden: bool) -> Result<Vec<LoopItem>, ManifestError> {
    if !dir.is_dir() {
        return Err(ManifestError::NotADirectory(dir.to_path_buf()));
    }

    let walker = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .hidden(!show_hidden)
        .git_ignore(true)
        .build();

    let mut found: Vec<PathBuf> = walker
        .flatten()
        .map(|entry| entry.into_path())
        .filter(|path| path != dir && path.is_file() && is_image(path))
        .collect();
    found.sort_by_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });

    tracing::debug!(dir = %dir.display(), count = found.len(), "discovered logos");

    Ok(found
        .into_iter()
        .map(|path| {
            let alt = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(humanize_stem)
                .unwrap_or_else(|| path.display().to_string());
            LoopItem::image(path, alt)
        })
        .collect())
}

/// Sniff the content type; falls back to the extension for empty files.
fn is_image(path: &Path) -> bool {
    match tree_magic_mini::from_filepath(path) {
        Some(mime) if mime.starts_with("image/") => true,
        Some(_) => false,
        None => matches!(
            path.extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .as_deref(),
            Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "tiff" | "ico")
        ),
    }
}

/// `acme-plumbing_co` → `acme plumbing co`.
fn humanize_stem(stem: &str) -> String {
    stem.replace(['-', '_'], " ")
}
