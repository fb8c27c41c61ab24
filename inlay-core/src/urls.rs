//! `url()` inlining as base64 data URIs (made by FontLab https://www.fontlab.com/)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use regex::Regex;

use crate::css;
use crate::error::{InlineError, Stage};
use crate::stylesheet::Stylesheet;
use crate::transform::{Applied, Transform};

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid scheme regex"));

/// How a `url()` value is treated. Only `Local` values are candidates for inlining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Empty,
    Data,
    /// Has a scheme (`http:`, `file:`, ...) or is protocol-relative.
    External,
    Fragment,
    Local,
}

pub fn classify(value: &str) -> UrlKind {
    let value = value.trim();
    if value.is_empty() {
        UrlKind::Empty
    } else if value.len() >= 5 && value.as_bytes()[..5].eq_ignore_ascii_case(b"data:") {
        UrlKind::Data
    } else if value.starts_with("//") || SCHEME.is_match(value) {
        UrlKind::External
    } else if value.starts_with('#') {
        UrlKind::Fragment
    } else {
        UrlKind::Local
    }
}

/// Drop `?query` and `#fragment` (e.g. the `?#iefix` EOT hack) from a path reference.
pub fn strip_query_and_fragment(value: &str) -> &str {
    let end = value.find(['?', '#']).unwrap_or(value.len());
    &value[..end]
}

/// MIME type for an asset, keyed on its extension.
pub fn mime_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let known = match ext.as_str() {
        "woff2" => Some("font/woff2"),
        "woff" => Some("font/woff"),
        "ttf" => Some("font/ttf"),
        "otf" => Some("font/otf"),
        "eot" => Some("application/vnd.ms-fontobject"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    };

    match known {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    let encoded_len = base64::encoded_len(bytes.len(), true).unwrap_or(0);
    let mut uri = String::with_capacity(encoded_len + mime.len() + 13);
    uri.push_str("data:");
    uri.push_str(mime);
    uri.push_str(";base64,");
    STANDARD.encode_string(bytes, &mut uri);
    uri
}

/// Rewrites `url()` references to existing local files as `url("data:...")`.
///
/// Paths are looked up in the font base directory first, then in the directory
/// of the file the reference was written in: the imported sheet for spliced-in
/// text, the fallback directory for the document's own text. References that
/// resolve nowhere, or to files above `max_size`, are kept.
#[derive(Debug, Clone)]
pub struct InlineUrls {
    font_dir: PathBuf,
    fallback: Option<PathBuf>,
    max_size: Option<u64>,
}

impl InlineUrls {
    pub const NAME: &'static str = "inline-urls";

    pub fn new(font_base_dir: impl Into<PathBuf>) -> Self {
        Self {
            font_dir: font_base_dir.into(),
            fallback: None,
            max_size: None,
        }
    }

    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback = Some(dir.into());
        self
    }

    pub fn max_size(mut self, bytes: Option<u64>) -> Self {
        self.max_size = bytes;
        self
    }

    /// First regular file the reference names, searching the font directory and
    /// then the fallback directory.
    pub fn resolve(&self, value: &str) -> Option<PathBuf> {
        self.resolve_from(value, self.fallback.as_deref())
    }

    /// Like [`resolve`](Self::resolve), with `origin` searched after the font directory.
    pub fn resolve_from(&self, value: &str, origin: Option<&Path>) -> Option<PathBuf> {
        let raw = strip_query_and_fragment(value.trim());
        let decoded = urlencoding::decode(raw).ok()?;
        let relative = decoded.trim_start_matches('/');
        if relative.is_empty() {
            return None;
        }

        std::iter::once(self.font_dir.as_path())
            .chain(origin)
            .map(|dir| dir.join(relative))
            .find(|candidate| candidate.is_file())
    }

    fn encode(&self, path: &Path) -> Result<Option<String>, InlineError> {
        let read_err = |source| InlineError::AssetRead {
            path: path.to_path_buf(),
            source,
        };

        if let Some(limit) = self.max_size {
            let len = fs::metadata(path).map_err(read_err)?.len();
            if len > limit {
                debug!(
                    "{} is {len} bytes (limit {limit}), keeping reference",
                    path.display()
                );
                return Ok(None);
            }
        }

        let bytes = fs::read(path).map_err(read_err)?;
        Ok(Some(data_uri(&mime_for(path), &bytes)))
    }
}

impl Transform for InlineUrls {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stage(&self) -> Stage {
        Stage::UrlInlining
    }

    fn apply(&self, doc: Stylesheet) -> Result<Applied, InlineError> {
        let mut encoded: HashMap<PathBuf, Option<String>> = HashMap::new();
        let mut edits = Vec::new();

        for token in css::scan_urls(&doc.text) {
            if classify(&token.value) != UrlKind::Local {
                continue;
            }

            let origin = doc
                .origin_dir(token.span.start)
                .or(self.fallback.as_deref());
            let Some(path) = self.resolve_from(&token.value, origin) else {
                debug!("no asset for url({}), passing through", token.value);
                continue;
            };

            if !encoded.contains_key(&path) {
                let uri = self.encode(&path)?;
                encoded.insert(path.clone(), uri);
            }

            if let Some(Some(uri)) = encoded.get(&path) {
                debug!("inlining {}", path.display());
                edits.push((token.span, format!("url(\"{uri}\")")));
            }
        }

        let rewrites = edits.len();
        let text = css::splice(&doc.text, edits);

        Ok(Applied {
            doc: Stylesheet::new(doc.path, text),
            rewrites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylesheet::Origin;
    use tempfile::tempdir;

    #[test]
    fn classifies_passthrough_schemes() {
        assert_eq!(classify("data:font/woff2;base64,AAAA"), UrlKind::Data);
        assert_eq!(classify("https://cdn.example.com/a.woff"), UrlKind::External);
        assert_eq!(classify("//cdn.example.com/a.woff"), UrlKind::External);
        assert_eq!(classify("#clip"), UrlKind::Fragment);
        assert_eq!(classify("  "), UrlKind::Empty);
        assert_eq!(classify("fonts/a.woff2"), UrlKind::Local);
        assert_eq!(classify("../a.ttf?v=2"), UrlKind::Local);
    }

    #[test]
    fn mime_table_covers_font_formats() {
        assert_eq!(mime_for(Path::new("a.woff2")), "font/woff2");
        assert_eq!(mime_for(Path::new("a.WOFF")), "font/woff");
        assert_eq!(mime_for(Path::new("a.ttf")), "font/ttf");
        assert_eq!(mime_for(Path::new("a.eot")), "application/vnd.ms-fontobject");
        assert_eq!(mime_for(Path::new("a.svg")), "image/svg+xml");
        assert_eq!(mime_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_for(Path::new("a")), "application/octet-stream");
    }

    #[test]
    fn strips_iefix_suffix() {
        assert_eq!(strip_query_and_fragment("a.eot?#iefix"), "a.eot");
        assert_eq!(strip_query_and_fragment("a.svg#font"), "a.svg");
        assert_eq!(strip_query_and_fragment("a.woff"), "a.woff");
    }

    #[test]
    fn data_uri_is_base64() {
        assert_eq!(data_uri("font/woff2", b"hi"), "data:font/woff2;base64,aGk=");
    }

    #[test]
    fn inlines_existing_and_keeps_missing() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("fonts")).unwrap();
        fs::write(tmp.path().join("fonts/a.woff"), b"abc").unwrap();

        let css = ".f{src:url(fonts/a.woff) format('woff'),url('fonts/b.woff')}";
        let applied = InlineUrls::new(tmp.path())
            .apply(Stylesheet::new("t.css", css))
            .expect("inline");

        assert_eq!(
            applied.doc.text,
            ".f{src:url(\"data:font/woff;base64,YWJj\") format('woff'),url('fonts/b.woff')}"
        );
        assert_eq!(applied.rewrites, 1);
    }

    #[test]
    fn fallback_dir_is_searched_after_base() {
        let base = tempdir().expect("base");
        let fallback = tempdir().expect("fallback");
        fs::write(base.path().join("a.ttf"), b"base").unwrap();
        fs::write(fallback.path().join("a.ttf"), b"fallback").unwrap();
        fs::write(fallback.path().join("b.ttf"), b"fallback").unwrap();

        let inliner = InlineUrls::new(base.path()).with_fallback_dir(fallback.path());
        assert_eq!(inliner.resolve("a.ttf"), Some(base.path().join("a.ttf")));
        assert_eq!(inliner.resolve("/b.ttf"), Some(fallback.path().join("b.ttf")));
        assert_eq!(inliner.resolve("c.ttf"), None);
    }

    #[test]
    fn imported_text_resolves_next_to_its_own_file() {
        let root = tempdir().expect("root");
        let fonts = tempdir().expect("fonts");
        let partials = root.path().join("partials");
        fs::create_dir_all(partials.join("img")).unwrap();
        fs::create_dir_all(root.path().join("img")).unwrap();
        fs::write(partials.join("img/a.svg"), b"<svg/>").unwrap();
        fs::write(root.path().join("img/b.svg"), b"<svg/>").unwrap();

        let css = ".p{background:url(img/a.svg)}.q{background:url(img/b.svg)}";
        let doc = Stylesheet::new(root.path().join("main.css"), css).with_origins(vec![
            Origin {
                span: 0..css.len(),
                dir: partials.clone(),
            },
        ]);

        let applied = InlineUrls::new(fonts.path())
            .with_fallback_dir(root.path())
            .apply(doc)
            .expect("inline");

        assert_eq!(applied.rewrites, 1);
        assert!(applied.doc.text.starts_with(".p{background:url(\"data:image/svg+xml;base64,"));
        assert!(applied.doc.text.ends_with(".q{background:url(img/b.svg)}"));
    }

    #[test]
    fn percent_encoded_names_resolve() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("Source Sans.woff2"), b"x").unwrap();

        let inliner = InlineUrls::new(tmp.path());
        assert!(inliner.resolve("Source%20Sans.woff2").is_some());
    }

    #[test]
    fn oversized_assets_are_kept() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("big.ttf"), vec![0u8; 64]).unwrap();

        let css = ".f{src:url(big.ttf)}";
        let applied = InlineUrls::new(tmp.path())
            .max_size(Some(16))
            .apply(Stylesheet::new("t.css", css))
            .expect("inline");

        assert_eq!(applied.doc.text, css);
        assert_eq!(applied.rewrites, 0);
    }

    #[test]
    fn directories_are_not_assets() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("fonts")).unwrap();

        assert_eq!(InlineUrls::new(tmp.path()).resolve("fonts"), None);
    }
}
