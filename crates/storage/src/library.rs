use std::fs;
use std::path::{Path, PathBuf};

use brailleshelf_core::{Config, SUPPORTED_EXTENSIONS};
use log::{info, warn};

/// Tells whether a source root is currently available.
pub trait MountProbe {
    fn is_mounted(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemMounts {
    pub require_mount: bool,
}

impl SystemMounts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            require_mount: config.require_mount,
        }
    }
}

impl MountProbe for SystemMounts {
    fn is_mounted(&self, path: &Path) -> bool {
        if !path.is_dir() {
            return false;
        }
        !self.require_mount || is_mount_point(path)
    }
}

impl<F: Fn(&Path) -> bool> MountProbe for F {
    fn is_mounted(&self, path: &Path) -> bool {
        self(path)
    }
}

#[cfg(unix)]
fn is_mount_point(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt as _;

    let (Ok(meta), Ok(parent)) = (fs::metadata(path), fs::metadata(path.join(".."))) else {
        return false;
    };
    meta.dev() != parent.dev() || meta.ino() == parent.ino()
}

#[cfg(not(unix))]
fn is_mount_point(path: &Path) -> bool {
    path.is_dir()
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Book files on every mounted source root: SD card first, then the USB
/// slots, sorted within each root.
pub fn scan_books(config: &Config, mounts: &impl MountProbe) -> Vec<String> {
    let mut found = Vec::new();
    for root in config.source_roots() {
        if !mounts.is_mounted(&root.path) {
            info!("{} not mounted at {}", root.label, root.path.display());
            continue;
        }
        let mut books = walk(&root.path);
        books.sort();
        info!("{} books on {}", books.len(), root.label);
        found.extend(books.into_iter().map(|p| p.to_string_lossy().into_owned()));
    }
    found
}

fn walk(root: &Path) -> Vec<PathBuf> {
    let mut books = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("cannot read {}: {err}", dir.display());
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() && is_supported(&path) {
                books.push(path);
            }
        }
    }
    books
}
