//! TOML job configuration (made by FontLab https://www.fontlab.com/)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::job::{CyclePolicy, InlineOptions, Job};

pub const DEFAULT_CONFIG: &str = "inlay.toml";

/// Jobs plus the settings they share.
///
/// ```toml
/// font_base_dir = "node_modules/reveal.js/dist/theme/fonts/source-sans-pro"
///
/// [[job]]
/// source = "node_modules/reveal.js/dist/theme/white.css"
/// dest = "src/html/res/white.out.css"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub font_base_dir: PathBuf,
    #[serde(default)]
    pub cycle_policy: CyclePolicy,
    #[serde(default)]
    pub max_inline_size: Option<u64>,
    #[serde(default, rename = "job")]
    pub jobs: Vec<Job>,
}

impl Config {
    /// Parse config text; relative paths are taken relative to `base_dir`.
    pub fn from_toml(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;

        if config.jobs.is_empty() {
            return Err(anyhow!("config defines no [[job]] entries"));
        }

        config.font_base_dir = anchor(base_dir, &config.font_base_dir);
        for job in &mut config.jobs {
            job.source = anchor(base_dir, &job.source);
            job.dest = anchor(base_dir, &job.dest);
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        Self::from_toml(&text, base_dir)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn options(&self) -> InlineOptions {
        InlineOptions::new(&self.font_base_dir)
            .cycle_policy(self.cycle_policy)
            .max_inline_size(self.max_inline_size)
    }
}

fn anchor(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
