//! Recursive `@import` resolution (made by FontLab https://www.fontlab.com/)

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::css;
use crate::error::{InlineError, Stage};
use crate::job::CyclePolicy;
use crate::stylesheet::{Origin, Stylesheet};
use crate::transform::{Applied, Transform};
use crate::urls::strip_query_and_fragment;

/// Replaces local `@import` statements with the imported stylesheet's text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveImports {
    policy: CyclePolicy,
}

impl ResolveImports {
    pub const NAME: &'static str = "resolve-imports";

    pub fn new(policy: CyclePolicy) -> Self {
        Self { policy }
    }

    fn expand(
        &self,
        text: &str,
        importer: &Path,
        stack: &mut Vec<PathBuf>,
        count: &mut usize,
    ) -> Result<Expanded, InlineError> {
        let dir = importer.parent().unwrap_or_else(|| Path::new("."));
        let (leading, late) = css::partition_imports(text);
        let mut edits = Vec::new();
        let mut origins = Vec::new();
        let mut offset = Offset::default();

        for rule in late {
            warn!(
                "ignoring @import {} in {}: it follows other rules",
                rule.target,
                importer.display()
            );
        }

        for rule in leading {
            if is_remote(&rule.target) {
                warn!(
                    "leaving remote @import {} in {}",
                    rule.target,
                    importer.display()
                );
                continue;
            }

            let target = dir.join(strip_query_and_fragment(&rule.target));
            let resolve_err = |source| InlineError::ImportResolution {
                target: target.clone(),
                importer: importer.to_path_buf(),
                source,
            };
            let canonical = fs::canonicalize(&target).map_err(resolve_err)?;

            if stack.contains(&canonical) {
                match self.policy {
                    CyclePolicy::Fail => {
                        let mut chain = stack.clone();
                        chain.push(canonical);
                        return Err(InlineError::CircularImport { chain });
                    }
                    CyclePolicy::Skip => {
                        warn!(
                            "dropping circular @import of {} from {}",
                            canonical.display(),
                            importer.display()
                        );
                        offset.record(&rule.span, 0);
                        edits.push((rule.span, String::new()));
                        continue;
                    }
                }
            }

            let bytes = fs::read(&canonical).map_err(resolve_err)?;
            let child = String::from_utf8(bytes).map_err(|_| InlineError::InvalidUtf8 {
                path: canonical.clone(),
                stage: Stage::ImportResolution,
            })?;

            debug!("inlining @import {}", canonical.display());
            stack.push(canonical.clone());
            let expanded = self.expand(css::strip_charset(&child), &canonical, stack, count)?;
            stack.pop();

            let (wrapped, body_at) = wrap_conditions(&expanded.text, &rule.conditions);
            let start = offset.map(rule.span.start) + body_at;
            origins.push(Origin {
                span: start..start + expanded.text.len(),
                dir: canonical.parent().unwrap_or(dir).to_path_buf(),
            });
            origins.extend(expanded.origins.into_iter().map(|o| o.shifted(start)));

            *count += 1;
            offset.record(&rule.span, wrapped.len());
            edits.push((rule.span, wrapped));
        }

        Ok(Expanded {
            text: css::splice(text, edits),
            origins,
        })
    }
}

struct Expanded {
    text: String,
    origins: Vec<Origin>,
}

/// Where a position in the input lands once earlier edits are spliced in.
/// Edits must be recorded in text order.
#[derive(Default)]
struct Offset {
    grown: usize,
    shrunk: usize,
}

impl Offset {
    fn map(&self, pos: usize) -> usize {
        pos + self.grown - self.shrunk
    }

    fn record(&mut self, span: &Range<usize>, replacement_len: usize) {
        self.grown += replacement_len;
        self.shrunk += span.len();
    }
}

impl Transform for ResolveImports {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stage(&self) -> Stage {
        Stage::ImportResolution
    }

    fn apply(&self, doc: Stylesheet) -> Result<Applied, InlineError> {
        let root = fs::canonicalize(&doc.path).unwrap_or_else(|_| doc.path.clone());
        let mut stack = vec![root.clone()];
        let mut count = 0;

        let expanded = self.expand(&doc.text, &root, &mut stack, &mut count)?;

        Ok(Applied {
            doc: Stylesheet::new(doc.path, expanded.text).with_origins(expanded.origins),
            rewrites: count,
        })
    }
}

fn is_remote(target: &str) -> bool {
    let lower = target.trim_start().to_ascii_lowercase();
    lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("//")
}

/// Wrap imported text in the at-rules its import conditions imply:
/// `layer(..)` innermost, then `supports(..)`, then the media query list.
/// Returns the wrapped text and the offset of `body` inside it.
fn wrap_conditions(body: &str, conditions: &str) -> (String, usize) {
    let (layer, rest) = take_layer(conditions.trim());
    let (supports, media) = take_function(rest, "supports");

    let mut opened = Vec::new();
    if !media.is_empty() {
        opened.push(format!("@media {media}{{\n"));
    }
    if let Some(supports) = supports {
        opened.push(format!("@supports ({supports}){{\n"));
    }
    match layer {
        Some("") => opened.push("@layer{\n".to_string()),
        Some(layer) => opened.push(format!("@layer {layer}{{\n")),
        None => {}
    }

    let mut out = opened.concat();
    let body_at = out.len();
    out.push_str(body);
    out.push_str(&"\n}".repeat(opened.len()));
    (out, body_at)
}

fn take_layer(conditions: &str) -> (Option<&str>, &str) {
    if let (Some(name), rest) = take_function(conditions, "layer") {
        return (Some(name), rest);
    }

    let bytes = conditions.as_bytes();
    let bare = bytes.len() >= 5
        && bytes[..5].eq_ignore_ascii_case(b"layer")
        && bytes.get(5).map_or(true, u8::is_ascii_whitespace);
    if bare {
        (Some(""), conditions[5..].trim_start())
    } else {
        (None, conditions)
    }
}

/// Split `name(args) rest` into `(Some(args), rest)` with balanced parentheses.
fn take_function<'a>(text: &'a str, name: &str) -> (Option<&'a str>, &'a str) {
    let open = name.len();
    let bytes = text.as_bytes();
    if bytes.len() <= open
        || !bytes[..open].eq_ignore_ascii_case(name.as_bytes())
        || bytes[open] != b'('
    {
        return (None, text);
    }

    let mut depth = 0usize;
    for (idx, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    let inner = text[open + 1..idx].trim();
                    return (Some(inner), text[idx + 1..].trim_start());
                }
            }
            _ => {}
        }
    }
    (None, text)
}
