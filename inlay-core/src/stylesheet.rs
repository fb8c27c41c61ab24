//! In-memory stylesheet documents (made by FontLab https://www.fontlab.com/)

use std::fs;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{InlineError, Stage};

/// A stretch of text spliced in from another file, and that file's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub span: Range<usize>,
    pub dir: PathBuf,
}

impl Origin {
    pub fn shifted(self, by: usize) -> Self {
        Self {
            span: self.span.start + by..self.span.end + by,
            dir: self.dir,
        }
    }
}

/// CSS text plus the file it came from. Relative references resolve against `path`,
/// except inside `origins`, which resolve against the file they were imported from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub path: PathBuf,
    pub text: String,
    /// Outer regions come before the regions nested inside them.
    pub origins: Vec<Origin>,
}

impl Stylesheet {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            origins: Vec::new(),
        }
    }

    pub fn with_origins(mut self, origins: Vec<Origin>) -> Self {
        self.origins = origins;
        self
    }

    /// Directory of the imported file whose text covers `offset`, innermost first.
    /// `None` means the text is the document's own.
    pub fn origin_dir(&self, offset: usize) -> Option<&Path> {
        self.origins
            .iter()
            .rev()
            .find(|origin| origin.span.contains(&offset))
            .map(|origin| origin.dir.as_path())
    }

    /// Read a job's source stylesheet.
    pub fn load(path: &Path) -> Result<Self, InlineError> {
        let bytes = fs::read(path).map_err(|source| InlineError::InputNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|_| InlineError::InvalidUtf8 {
            path: path.to_path_buf(),
            stage: Stage::Read,
        })?;

        Ok(Self::new(path, text))
    }

    /// Directory relative imports and assets are resolved against.
    pub fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Write the text to `dest` through a sibling temp file and a rename, so a
    /// failed write never leaves a partial stylesheet behind.
    pub fn write_atomic(&self, dest: &Path) -> Result<usize, InlineError> {
        let write_err = |source| InlineError::OutputWrite {
            path: dest.to_path_buf(),
            source,
        };

        let parent = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(self.text.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(dest).map_err(|e| write_err(e.error))?;

        Ok(self.text.len())
    }
}
