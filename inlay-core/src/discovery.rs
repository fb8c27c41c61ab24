//! Asset discovery helpers for inlay-core (made by FontLab https://www.fontlab.com/)

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::Serialize;
use walkdir::WalkDir;

use crate::urls::mime_for;

/// An inlinable file under a base directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    pub path: PathBuf,
    /// Path relative to the root, as a stylesheet would write it in `url()`.
    pub url: String,
    pub mime: String,
    pub size: u64,
}

/// Trait for enumerating assets from some backing store.
pub trait AssetDiscovery {
    fn discover(&self) -> Result<Vec<AssetRef>>;
}

/// Recursive filesystem walker that collects font assets.
#[derive(Debug, Clone)]
pub struct PathDiscovery {
    root: PathBuf,
    follow_symlinks: bool,
}

impl PathDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
        }
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

impl AssetDiscovery for PathDiscovery {
    fn discover(&self) -> Result<Vec<AssetRef>> {
        if !self.root.is_dir() {
            return Err(anyhow!(
                "asset directory does not exist: {}",
                self.root.display()
            ));
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_font_asset(entry.path()) {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root)?;
            let url = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            found.push(AssetRef {
                path: entry.path().to_path_buf(),
                url,
                mime: mime_for(entry.path()),
                size: entry.metadata()?.len(),
            });
        }

        Ok(found)
    }
}

fn is_font_asset(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return false,
    };

    matches!(
        ext.as_str(),
        "woff2" | "woff" | "ttf" | "otf" | "eot" | "svg"
    )
}
