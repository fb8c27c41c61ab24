//! Composable stylesheet transforms (made by FontLab https://www.fontlab.com/)

use std::path::Path;

use crate::error::{InlineError, Stage};
use crate::imports::ResolveImports;
use crate::job::InlineOptions;
use crate::stylesheet::Stylesheet;
use crate::urls::InlineUrls;

/// Result of one transform: the rewritten document and how many references it replaced.
#[derive(Debug, Clone)]
pub struct Applied {
    pub doc: Stylesheet,
    pub rewrites: usize,
}

/// A text-to-text rewrite over a stylesheet document.
pub trait Transform {
    fn name(&self) -> &'static str;
    fn stage(&self) -> Stage;
    fn apply(&self, doc: Stylesheet) -> Result<Applied, InlineError>;
}

/// Ordered chain of transforms. Each one sees the output of the previous.
#[derive(Default)]
pub struct Pipeline {
    transforms: Vec<Box<dyn Transform + Send + Sync>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, transform: impl Transform + Send + Sync + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Imports first, then urls, so assets referenced by imported sheets get inlined too.
    pub fn standard(opts: &InlineOptions, source_dir: &Path) -> Self {
        Self::new()
            .with(ResolveImports::new(opts.cycle_policy))
            .with(
                InlineUrls::new(&opts.font_base_dir)
                    .with_fallback_dir(source_dir)
                    .max_size(opts.max_inline_size),
            )
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run every transform in order, stopping at the first error.
    pub fn run(
        &self,
        mut doc: Stylesheet,
    ) -> Result<(Stylesheet, Vec<(&'static str, usize)>), InlineError> {
        let mut counts = Vec::with_capacity(self.transforms.len());
        for transform in &self.transforms {
            log::debug!(
                "{} ({}): {}",
                transform.name(),
                transform.stage(),
                doc.path.display()
            );
            let applied = transform.apply(doc)?;
            counts.push((transform.name(), applied.rewrites));
            doc = applied.doc;
        }
        Ok((doc, counts))
    }
}
