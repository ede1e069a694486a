//! Maps a mount and a request sub-path onto the filesystem.
//!
//! Every call works on a fresh view of the disk: a target is classified
//! as a regular file, a directory (listed one level deep, sorted by name)
//! or not found. Nothing is cached between calls.

use crate::config::MountConfig;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    File { path: PathBuf },
    Listing { directories: Vec<Entry>, files: Vec<Entry> },
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Mount \"{mount}\" is missing source directory value.")]
    MissingSourceDir { mount: String },
    #[error("failed to list {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn resolve(mount: &MountConfig, sub_path: &str) -> Result<ResolvedTarget, ResolveError> {
    let Some(source_dir) = mount.source_dir.as_deref() else {
        return Err(ResolveError::MissingSourceDir {
            mount: mount.mount_id.clone(),
        });
    };

    if !stays_inside(sub_path) {
        debug!("Rejecting sub-path {:?} on mount {}", sub_path, mount.mount_id);
        return Ok(ResolvedTarget::NotFound);
    }

    let target = if sub_path.is_empty() {
        source_dir.to_path_buf()
    } else {
        source_dir.join(sub_path)
    };

    // Follows symlinks; a dangling link fails here and counts as missing.
    let metadata = match std::fs::metadata(&target) {
        Ok(m) => m,
        Err(_) => {
            debug!("Not found: {:?}", target);
            return Ok(ResolvedTarget::NotFound);
        }
    };

    if metadata.is_file() {
        debug!("File target: {:?}", target);
        return Ok(ResolvedTarget::File { path: target });
    }
    if !metadata.is_dir() {
        debug!("Unsupported file type, treating as not found: {:?}", target);
        return Ok(ResolvedTarget::NotFound);
    }

    let (directories, files) = list(&target)?;
    debug!(
        "Listing {:?}: {} directories, {} files",
        target,
        directories.len(),
        files.len()
    );
    Ok(ResolvedTarget::Listing { directories, files })
}

/// Immediate children of `dir`, split into directories and regular files,
/// each sorted by raw file name bytes. Hidden names (`.git`, `.env`, ...)
/// are left out.
fn list(dir: &Path) -> Result<(Vec<Entry>, Vec<Entry>), ResolveError> {
    let mut directories = Vec::new();
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                return Err(ResolveError::Io {
                    path: dir.to_path_buf(),
                    source: e.into_io_error().unwrap_or_else(|| {
                        std::io::Error::other("directory walk failed")
                    }),
                });
            }
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let item = Entry {
            name,
            path: entry.path().to_path_buf(),
        };
        let file_type = entry.file_type();
        if file_type.is_dir() {
            directories.push(item);
        } else if file_type.is_file() {
            files.push(item);
        }
    }

    Ok((directories, files))
}

/// Only plain names (and `.`) may appear in a sub-path.
fn stays_inside(sub_path: &str) -> bool {
    Path::new(sub_path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Relative link to the parent of `sub_path`, or `None` at the mount root.
pub fn parent_directory_name(mount_id: &str, sub_path: &str) -> Option<String> {
    if sub_path.is_empty() {
        return None;
    }

    let parent = match Path::new(sub_path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().to_string(),
        _ => mount_id.to_string(),
    };
    Some(format!("../{}", parent))
}
