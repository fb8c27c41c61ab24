//! Error taxonomy for the inlining pipeline (made by FontLab https://www.fontlab.com/)

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline step a job was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Read,
    ImportResolution,
    UrlInlining,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Read => write!(f, "read"),
            Stage::ImportResolution => write!(f, "import resolution"),
            Stage::UrlInlining => write!(f, "url inlining"),
            Stage::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Error)]
pub enum InlineError {
    #[error("input stylesheet not found or unreadable: {}", path.display())]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot resolve @import \"{}\" from {}", target.display(), importer.display())]
    ImportResolution {
        target: PathBuf,
        importer: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("circular @import chain: {}", render_chain(chain))]
    CircularImport { chain: Vec<PathBuf> },

    #[error("stylesheet is not valid UTF-8: {}", path.display())]
    InvalidUtf8 { path: PathBuf, stage: Stage },

    #[error("cannot read asset {}", path.display())]
    AssetRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write output {}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InlineError {
    pub fn stage(&self) -> Stage {
        match self {
            InlineError::InputNotFound { .. } => Stage::Read,
            InlineError::ImportResolution { .. } | InlineError::CircularImport { .. } => {
                Stage::ImportResolution
            }
            InlineError::InvalidUtf8 { stage, .. } => *stage,
            InlineError::AssetRead { .. } => Stage::UrlInlining,
            InlineError::OutputWrite { .. } => Stage::Write,
        }
    }

    /// The path the failure is about. For cycles this is the file that closed the loop.
    pub fn path(&self) -> Option<&Path> {
        match self {
            InlineError::InputNotFound { path, .. }
            | InlineError::InvalidUtf8 { path, .. }
            | InlineError::AssetRead { path, .. }
            | InlineError::OutputWrite { path, .. } => Some(path),
            InlineError::ImportResolution { target, .. } => Some(target),
            InlineError::CircularImport { chain } => chain.last().map(PathBuf::as_path),
        }
    }
}

fn render_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
