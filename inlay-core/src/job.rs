//! Jobs, options and the batch runner (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{InlineError, Stage};
use crate::stylesheet::Stylesheet;
use crate::transform::Pipeline;

/// One source stylesheet and where its inlined form goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl Job {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }
}

/// What to do when an `@import` chain revisits a file it is already inside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    #[default]
    Fail,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineOptions {
    pub font_base_dir: PathBuf,
    pub cycle_policy: CyclePolicy,
    /// Assets larger than this many bytes keep their `url()` reference.
    pub max_inline_size: Option<u64>,
}

impl InlineOptions {
    pub fn new(font_base_dir: impl Into<PathBuf>) -> Self {
        Self {
            font_base_dir: font_base_dir.into(),
            cycle_policy: CyclePolicy::default(),
            max_inline_size: None,
        }
    }

    pub fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    pub fn max_inline_size(mut self, bytes: Option<u64>) -> Self {
        self.max_inline_size = bytes;
        self
    }
}

/// Per-transform rewrite counts and the size of the written stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub rewrites: BTreeMap<String, usize>,
    pub bytes_written: usize,
}

impl JobReport {
    /// Counts from [`Pipeline::run`]; transforms sharing a name are summed.
    pub fn from_counts(counts: Vec<(&'static str, usize)>, bytes_written: usize) -> Self {
        let mut rewrites = BTreeMap::new();
        for (name, count) in counts {
            *rewrites.entry(name.to_string()).or_insert(0) += count;
        }
        Self {
            rewrites,
            bytes_written,
        }
    }

    pub fn rewrites_for(&self, transform: &str) -> usize {
        self.rewrites.get(transform).copied().unwrap_or(0)
    }
}

/// Inline `source` into `dest`, resolving font urls against `font_base_dir`.
pub fn process(
    source: &Path,
    dest: &Path,
    font_base_dir: &Path,
) -> Result<JobReport, InlineError> {
    process_job(&Job::new(source, dest), &InlineOptions::new(font_base_dir))
}

pub fn process_job(job: &Job, opts: &InlineOptions) -> Result<JobReport, InlineError> {
    let doc = Stylesheet::load(&job.source)?;
    let pipeline = Pipeline::standard(opts, doc.dir());
    let (doc, counts) = pipeline.run(doc)?;
    let bytes_written = doc.write_atomic(&job.dest)?;

    info!(
        "{} -> {} ({bytes_written} bytes)",
        job.source.display(),
        job.dest.display()
    );

    Ok(JobReport::from_counts(counts, bytes_written))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Ok(JobReport),
    Failed { stage: Stage, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    #[serde(flatten)]
    pub job: Job,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl JobOutcome {
    fn from_result(job: &Job, result: Result<JobReport, InlineError>) -> Self {
        let status = match result {
            Ok(report) => JobStatus::Ok(report),
            Err(err) => {
                warn!("{} failed during {}: {err}", job.source.display(), err.stage());
                JobStatus::Failed {
                    stage: err.stage(),
                    message: render_error(&err),
                }
            }
        };

        Self {
            job: job.clone(),
            status,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, JobStatus::Ok(_))
    }
}

/// Error text with its `source()` chain appended.
fn render_error(err: &InlineError) -> String {
    let mut message = err.to_string();
    let mut cause = std::error::Error::source(err);
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    message
}

#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub jobs: Option<usize>,
}

/// Run every job; a failure is recorded in its outcome and never stops the others.
/// Outcomes come back in the order the jobs were given.
pub fn run_batch(
    jobs: &[Job],
    opts: &InlineOptions,
    run: &RunOptions,
) -> Result<Vec<JobOutcome>> {
    let run_all = || -> Vec<JobOutcome> {
        jobs.par_iter()
            .map(|job| JobOutcome::from_result(job, process_job(job, opts)))
            .collect()
    };

    if let Some(threads) = run.jobs {
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
        Ok(pool.install(run_all))
    } else {
        Ok(run_all())
    }
}
