//! inlay-core: turns a themed stylesheet into one self-contained file
//!
//! A presentation theme usually arrives as a small tree of files: an entry
//! stylesheet, a few `@import`ed partials, and a directory of web fonts. This
//! library folds that tree into a single CSS text with every local import
//! spliced in place and every font reference embedded as a `data:` URI, so the
//! result can be shipped inside a binary or an HTML page with nothing to fetch.
//!
//! ## The Pipeline
//!
//! **Read**: load the source stylesheet as UTF-8 text
//!
//! **Resolve imports**: replace `@import` statements with the imported text,
//! recursively, relative to the importing file
//! - Media, `supports()` and `layer()` conditions become wrapping at-rules
//! - Remote imports stay where they are
//! - Cycles fail the job, or are dropped when [`CyclePolicy::Skip`] is chosen
//!
//! **Inline urls**: swap `url()` references to files under the font directory
//! for `url("data:<mime>;base64,...")`
//! - `data:`, `http(s):` and fragment urls pass through untouched
//! - Missing files pass through untouched
//!
//! **Write**: temp file plus rename, so a failed job leaves nothing behind
//!
//! ## Example
//!
//! ```rust,no_run
//! use inlay_core::job::{run_batch, InlineOptions, Job, RunOptions};
//!
//! let jobs = vec![Job::new(
//!     "node_modules/reveal.js/dist/theme/white.css",
//!     "src/html/res/white.out.css",
//! )];
//! let opts = InlineOptions::new("node_modules/reveal.js/dist/theme/fonts/source-sans-pro");
//!
//! for outcome in run_batch(&jobs, &opts, &RunOptions::default())? {
//!     println!("{} ok={}", outcome.job.dest.display(), outcome.is_ok());
//! }
//! #
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`css`]: the scanner that finds `@import` rules and `url()` tokens
//! - [`transform`]: the [`Transform`] trait and the [`Pipeline`] that chains them
//! - [`imports`], [`urls`]: the two standard transforms
//! - [`job`]: jobs, options, the batch runner
//! - [`config`]: jobs described in `inlay.toml`
//! - [`discovery`]: list the assets a font directory can provide
//!
//! ---
//!
//! Crafted with care at FontLab https://www.fontlab.com/

pub mod config;
pub mod css;
pub mod discovery;
pub mod error;
pub mod imports;
pub mod job;
pub mod output;
pub mod stylesheet;
pub mod transform;
pub mod urls;

pub use error::{InlineError, Stage};
pub use job::{process, process_job, CyclePolicy, InlineOptions, Job, JobOutcome, JobReport};
pub use stylesheet::Stylesheet;
pub use transform::{Pipeline, Transform};
