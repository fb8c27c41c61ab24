//! Minimal CSS scanning for `@import` rules and `url()` tokens (made by FontLab https://www.fontlab.com/)
//!
//! This is not a CSS parser. It walks the text once, steps over comments and
//! string literals, and reports the byte spans of the two constructs the
//! inliner rewrites. Everything else is opaque text that is copied verbatim.

use std::ops::Range;

/// An `@import` statement, from the `@` through its terminating `;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRule {
    pub span: Range<usize>,
    pub target: String,
    /// Media query / supports / layer text following the target, trimmed.
    pub conditions: String,
}

/// A `url(...)` function, from `url` through the closing `)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlToken {
    pub span: Range<usize>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Import(ImportRule),
    Url(UrlToken),
}

/// Scan the whole stylesheet. Urls inside an `@import` prelude belong to the import.
pub fn scan(css: &str) -> Vec<Token> {
    let bytes = css.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_comment(bytes, i);
            }
            b'"' | b'\'' => {
                i = skip_string(bytes, i).end;
            }
            b'@' if is_import_keyword(bytes, i) => match parse_import(css, i) {
                Some(rule) => {
                    i = rule.span.end;
                    tokens.push(Token::Import(rule));
                }
                None => i += 1,
            },
            b'u' | b'U' if is_url_start(bytes, i) => match parse_url(css, i) {
                Some(url) => {
                    i = url.span.end;
                    tokens.push(Token::Url(url));
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }

    tokens
}

pub fn scan_imports(css: &str) -> Vec<ImportRule> {
    scan(css)
        .into_iter()
        .filter_map(|t| match t {
            Token::Import(rule) => Some(rule),
            Token::Url(_) => None,
        })
        .collect()
}

pub fn scan_urls(css: &str) -> Vec<UrlToken> {
    scan(css)
        .into_iter()
        .filter_map(|t| match t {
            Token::Url(url) => Some(url),
            Token::Import(_) => None,
        })
        .collect()
}

/// Split imports into the leading ones and the rest. Only `@charset`, `@layer`
/// statements, comments and other imports may come before an `@import`; one
/// that follows a style rule or sits inside a block is ignored by browsers.
pub fn partition_imports(css: &str) -> (Vec<ImportRule>, Vec<ImportRule>) {
    let mut leading = Vec::new();
    let mut late = Vec::new();
    let bytes = css.as_bytes();
    let mut cursor = 0;
    let mut in_prelude = true;

    for rule in scan_imports(css) {
        in_prelude = in_prelude && only_prelude_statements(&bytes[cursor..rule.span.start]);
        cursor = rule.span.end;
        if in_prelude {
            leading.push(rule);
        } else {
            late.push(rule);
        }
    }
    (leading, late)
}

/// Drop a leading byte order mark and `@charset "...";` from an imported sheet.
pub fn strip_charset(css: &str) -> &str {
    let text = css.strip_prefix('\u{feff}').unwrap_or(css);
    let Some(rest) = text.strip_prefix("@charset \"") else {
        return text;
    };
    match rest.find("\";") {
        Some(end) => rest[end + 2..].trim_start(),
        None => text,
    }
}

/// Apply non-overlapping replacements. Edits may be given in any order.
pub fn splice(css: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);

    let mut out = String::with_capacity(css.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        out.push_str(&css[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&css[cursor..]);
    out
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    let mut j = start + 2;
    while j + 1 < bytes.len() {
        if bytes[j] == b'*' && bytes[j + 1] == b'/' {
            return j + 2;
        }
        j += 1;
    }
    bytes.len()
}

/// Span of a string literal starting at `start`, quotes included.
/// Unterminated strings stop at the newline, as CSS does.
fn skip_string(bytes: &[u8], start: usize) -> Range<usize> {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => break,
            b if b == quote => return start..j + 1,
            _ => j += 1,
        }
    }
    start..j.min(bytes.len())
}

fn is_import_keyword(bytes: &[u8], at: usize) -> bool {
    is_at_keyword(bytes, at, b"import")
}

fn is_at_keyword(bytes: &[u8], at: usize, name: &[u8]) -> bool {
    let end = at + 1 + name.len();
    if end > bytes.len()
        || bytes[at] != b'@'
        || !bytes[at + 1..end].eq_ignore_ascii_case(name)
    {
        return false;
    }
    bytes.get(end).map_or(true, |b| !is_ident_byte(*b))
}

/// True when `bytes` holds nothing but whitespace, comments, a byte order mark,
/// and `;`-terminated `@charset` / `@layer` statements.
fn only_prelude_statements(bytes: &[u8]) -> bool {
    let mut i = 0;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return true;
        }
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            i = skip_comment(bytes, i);
            continue;
        }
        if bytes[i..].starts_with(&[0xef, 0xbb, 0xbf]) {
            i += 3;
            continue;
        }
        if !is_at_keyword(bytes, i, b"charset") && !is_at_keyword(bytes, i, b"layer") {
            return false;
        }
        let end = find_statement_end(bytes, i);
        if end >= bytes.len() || bytes[end] != b';' {
            return false;
        }
        i = end + 1;
    }
}

fn is_url_start(bytes: &[u8], at: usize) -> bool {
    if at + 4 > bytes.len() || !bytes[at..at + 4].eq_ignore_ascii_case(b"url(") {
        return false;
    }
    at == 0 || !is_ident_byte(bytes[at - 1])
}

fn parse_import(css: &str, at: usize) -> Option<ImportRule> {
    let bytes = css.as_bytes();
    let prelude_start = at + 7;
    let end = find_statement_end(bytes, prelude_start);
    // A `{` or `}` before any `;` means the semicolon is missing.
    let terminated = end >= bytes.len() || bytes[end] == b';';

    let mut j = prelude_start;
    while j < end && bytes[j].is_ascii_whitespace() {
        j += 1;
    }

    let (target, rest_start) = match bytes.get(j)? {
        b'"' | b'\'' => {
            let span = skip_string(bytes, j);
            if span.end - span.start < 2 || bytes[span.end - 1] != bytes[j] {
                return None;
            }
            (css[span.start + 1..span.end - 1].to_string(), span.end)
        }
        b'u' | b'U' if is_url_start(bytes, j) => {
            let url = parse_url(css, j)?;
            (url.value, url.span.end)
        }
        _ => return None,
    };

    if !terminated || rest_start > end {
        return Some(ImportRule {
            span: at..rest_start,
            target,
            conditions: String::new(),
        });
    }

    let span_end = if end < bytes.len() { end + 1 } else { end };
    Some(ImportRule {
        span: at..span_end,
        target,
        conditions: css[rest_start..end].trim().to_string(),
    })
}

/// Index of the `;` ending the statement that starts at `from`, skipping strings,
/// comments and parentheses. Stops before a `{` or `}` so a missing semicolon
/// never swallows the following rule.
fn find_statement_end(bytes: &[u8], from: usize) -> usize {
    let mut depth = 0usize;
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'"' | b'\'' => {
                j = skip_string(bytes, j).end;
                continue;
            }
            b'/' if bytes.get(j + 1) == Some(&b'*') => {
                j = skip_comment(bytes, j);
                continue;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => return j,
            b'{' | b'}' if depth == 0 => return j,
            _ => {}
        }
        j += 1;
    }
    bytes.len()
}

fn parse_url(css: &str, at: usize) -> Option<UrlToken> {
    let bytes = css.as_bytes();
    let mut j = at + 4;
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }

    let value = match bytes.get(j)? {
        b'"' | b'\'' => {
            let span = skip_string(bytes, j);
            if span.end - span.start < 2 || bytes[span.end - 1] != bytes[j] {
                return None;
            }
            let inner = css[span.start + 1..span.end - 1].to_string();
            j = span.end;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if bytes.get(j) != Some(&b')') {
                return None;
            }
            inner
        }
        _ => {
            let start = j;
            while j < bytes.len() && bytes[j] != b')' {
                if bytes[j] == b'\\' {
                    j += 1;
                }
                j += 1;
            }
            if j >= bytes.len() {
                return None;
            }
            css[start..j].trim().to_string()
        }
    };

    Some(UrlToken {
        span: at..j + 1,
        value,
    })
}
