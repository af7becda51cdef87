//! Local plugin directory operations: listing, unpacking and removal.
//!
//! Everything here is blocking file-system work; handlers run it on
//! `spawn_blocking`.

use crate::error::{MarketplaceError, MarketplaceErrorExt};
use crate::models::{InstalledPlugin, Manifest};
use mkt_domain::constants::PLUGIN_MANIFEST;
use mkt_kernel::security::PathGuard;
use rawzip::{CompressionMethod, ZipArchive, ZipFileHeaderRecord};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Query values a frontend sends for an unset `pluginDir` setting.
const UNSET_DIR_MARKERS: [&str; 2] = ["undefined", "null"];

#[derive(Debug, Clone)]
pub struct Installer {
    default_dir: PathBuf,
    max_unpacked_bytes: u64,
}

impl Installer {
    #[must_use]
    pub const fn new(default_dir: PathBuf, max_unpacked_bytes: u64) -> Self {
        Self { default_dir, max_unpacked_bytes }
    }

    /// The requested plugin directory, or the configured one when the
    /// request leaves it out, blank or unset.
    #[must_use]
    pub fn resolve_dir(&self, requested: Option<&str>) -> PathBuf {
        match requested
            .map(str::trim)
            .filter(|dir| !dir.is_empty() && !UNSET_DIR_MARKERS.contains(dir))
        {
            Some(dir) => PathBuf::from(dir),
            None => self.default_dir.clone(),
        }
    }

    /// Plugins installed directly under `dir`, sorted by id.
    ///
    /// A subdirectory counts as a plugin when it holds a manifest, either at
    /// its root or in `dist/`. A missing `dir` is an empty listing; entries
    /// that cannot be read are skipped.
    ///
    /// # Errors
    /// Returns an error when `dir` exists but cannot be read.
    pub fn list(dir: &Path) -> Result<Vec<InstalledPlugin>, MarketplaceError> {
        if !dir.exists() {
            debug!(dir = %dir.display(), "Plugin directory does not exist");
            return Ok(Vec::new());
        }

        let mut plugins = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() > 0 => {
                    warn!(dir = %dir.display(), "Skipping unreadable entry: {e}");
                    continue;
                },
                Err(source) => {
                    return Err(MarketplaceError::Walk {
                        source,
                        context: Some("Listing plugin directory".into()),
                    });
                },
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(path) = find_manifest(entry.path()) else { continue };

            match read_manifest(&path) {
                Ok(manifest) => plugins.push(InstalledPlugin::from(manifest)),
                Err(e) => warn!(manifest = %path.display(), "Skipping plugin: {e}"),
            }
        }

        plugins.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(plugins)
    }

    /// Unpacks a zip archive into `dir` and returns the top-level
    /// directories it created.
    ///
    /// Every entry is checked before anything is written: absolute paths,
    /// parent traversal, compression methods other than store and deflate,
    /// and declared sizes over the unpack cap reject the whole archive.
    /// Entries that inflate past their declared size are cut off at the cap
    /// and fail the install.
    ///
    /// # Errors
    /// [`MarketplaceError::Archive`] or [`MarketplaceError::Path`] for bad
    /// archives, [`MarketplaceError::Validation`] for oversized ones,
    /// [`MarketplaceError::Io`] when writing fails.
    pub fn unpack(&self, archive: &[u8], dir: &Path) -> Result<Vec<String>, MarketplaceError> {
        let archive = ZipArchive::from_slice(archive)
            .map_err(|e| MarketplaceError::archive(format!("invalid zip archive: {e:?}")))?;
        let limit = self.max_unpacked_bytes;

        let mut top_level = BTreeSet::new();
        let mut declared: u64 = 0;
        for entry in archive.entries() {
            let entry =
                entry.map_err(|e| MarketplaceError::archive(format!("zip entry error: {e:?}")))?;
            let relative = entry_path(&entry)?;

            let method = entry.compression_method();
            if !matches!(method, CompressionMethod::Store | CompressionMethod::Deflate) {
                return Err(MarketplaceError::archive(format!(
                    "unsupported compression method {method:?} for {}",
                    relative.display()
                )));
            }

            declared = declared.saturating_add(entry.uncompressed_size_hint());
            if declared > limit {
                return Err(unpacked_too_large(limit));
            }

            let mut components = relative.components();
            let first = components.next();
            let nested = components.next().is_some() || entry.is_dir();
            if let Some(Component::Normal(first)) = first.filter(|_| nested) {
                top_level.insert(first.to_string_lossy().into_owned());
            }
        }

        fs::create_dir_all(dir).context(format!("creating {}", dir.display()))?;

        let mut remaining = limit;
        for entry in archive.entries() {
            let entry =
                entry.map_err(|e| MarketplaceError::archive(format!("zip entry error: {e:?}")))?;
            let relative = entry_path(&entry)?;
            let out_path = dir.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&out_path).context(format!("creating {}", out_path.display()))?;
                continue;
            }
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).context(format!("creating {}", parent.display()))?;
            }

            let data = archive
                .get_entry(entry.wayfinder())
                .map_err(|e| MarketplaceError::archive(format!("entry data: {e:?}")))?
                .data();
            let mut out =
                File::create(&out_path).context(format!("creating {}", out_path.display()))?;

            let bound = remaining.saturating_add(1);
            let copied = match entry.compression_method() {
                CompressionMethod::Deflate => {
                    let mut decoder = flate2::read::DeflateDecoder::new(data).take(bound);
                    io::copy(&mut decoder, &mut out)
                },
                _ => io::copy(&mut Read::take(data, bound), &mut out),
            };
            let copied = copied.context(format!("extracting {}", relative.display()))?;

            if copied > remaining {
                drop(out);
                if let Err(e) = fs::remove_file(&out_path) {
                    warn!(path = %out_path.display(), "Removing truncated entry failed: {e}");
                }
                return Err(unpacked_too_large(limit));
            }
            remaining -= copied;
        }

        let installed: Vec<String> = top_level.into_iter().collect();
        info!(dir = %dir.display(), installed = ?installed, "Plugin archive unpacked");
        Ok(installed)
    }

    /// Removes `{dir}/{slug}` recursively.
    ///
    /// # Errors
    /// [`MarketplaceError::Path`] for unsafe slugs, [`MarketplaceError::NotFound`]
    /// when nothing is installed under that name.
    pub fn remove(dir: &Path, slug: &str) -> Result<(), MarketplaceError> {
        let slug = PathGuard::segment(slug)?;
        let target = dir.join(slug);

        let metadata = match fs::symlink_metadata(&target) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MarketplaceError::NotFound {
                    message: format!("plugin {slug:?} is not installed").into(),
                    context: Some(dir.display().to_string().into()),
                });
            },
            Err(source) => {
                return Err(MarketplaceError::Io {
                    source,
                    context: Some(format!("inspecting {}", target.display()).into()),
                });
            },
        };

        let removed =
            if metadata.is_dir() { fs::remove_dir_all(&target) } else { fs::remove_file(&target) };
        removed.context(format!("removing {}", target.display()))?;

        info!(slug, dir = %dir.display(), "Plugin uninstalled");
        Ok(())
    }
}

/// The entry's name as stored, validated as a relative path inside the
/// target directory.
///
/// Validated on the raw name, since `try_normalize` silently drops `..` and
/// leading `/` components.
fn entry_path(entry: &ZipFileHeaderRecord<'_>) -> Result<PathBuf, MarketplaceError> {
    let raw = entry.file_path();
    let name = std::str::from_utf8(raw.as_ref())
        .map_err(|e| MarketplaceError::archive(format!("zip entry path: {e}")))?;
    if name.contains('\\') {
        return Err(MarketplaceError::archive(format!("zip entry {name:?} uses backslashes")));
    }
    PathGuard::relative(name).context(name.to_owned())
}

fn unpacked_too_large(limit: u64) -> MarketplaceError {
    MarketplaceError::validation(format!("plugin archive unpacks to more than {limit} bytes"))
}

fn find_manifest(plugin_root: &Path) -> Option<PathBuf> {
    let direct = plugin_root.join(PLUGIN_MANIFEST);
    if direct.is_file() {
        return Some(direct);
    }

    WalkDir::new(plugin_root.join("dist"))
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == PLUGIN_MANIFEST)
        .map(walkdir::DirEntry::into_path)
}

fn read_manifest(path: &Path) -> Result<Manifest, MarketplaceError> {
    let raw = fs::read(path).context(format!("reading {}", path.display()))?;
    let manifest: Manifest = serde_json::from_slice(&raw)
        .map_err(|e| MarketplaceError::validation(format!("{}: {e}", path.display())))?;
    if manifest.id.is_empty() {
        return Err(MarketplaceError::validation(format!("{}: missing plugin id", path.display())));
    }
    Ok(manifest)
}
