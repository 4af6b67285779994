//! Canonical URI form of a [`ContextReference`].
//!
//! ```text
//! claude-context://<kind>/<segment>[?param=value&...][#L<line>[:<col>]]
//! ```
//!
//! The primary segment (path, url, or qualified symbol name) is encoded
//! slash-preserving: every `/`-separated piece is percent-encoded on its own
//! and the pieces are joined back with a literal `/`, so `src/read.ts`
//! becomes `claude-context://file/src/read.ts` and `a b/c` becomes
//! `claude-context://file/a%20b/c`. Query values are percent-encoded whole.
//! Parameters are written in a fixed order but read in any order, and the
//! line fragment is accepted on either side of the query.
//!
//! Two legacy forms still decode: a bare `file://<path>` (taken verbatim) and
//! bare `http://` / `https://` URLs.

use std::collections::HashMap;

use crate::ContextReference;
use crate::ReferenceKind;

pub const REFERENCE_SCHEME: &str = "claude-context";

const SCHEME_PREFIX: &str = "claude-context://";
const LEGACY_FILE_PREFIX: &str = "file://";

const PARAM_TITLE: &str = "title";
const PARAM_NAME: &str = "name";
const PARAM_FILE: &str = "file";
const PARAM_MIME: &str = "mime";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceUriError {
    #[error("not a context reference uri")]
    UnknownScheme,

    #[error("unknown reference kind `{0}`")]
    UnknownKind(String),

    #[error("{0} reference is missing its primary segment")]
    MissingSegment(ReferenceKind),

    #[error("invalid percent encoding in `{0}`")]
    InvalidEncoding(String),

    #[error("invalid line fragment `{0}`")]
    InvalidFragment(String),
}

/// Encode `reference` into its canonical URI.
pub fn encode_reference(reference: &ContextReference) -> String {
    let kind = reference.kind();
    let mut out = String::with_capacity(64);
    out.push_str(SCHEME_PREFIX);
    out.push_str(kind.as_str());

    let mut params: Vec<(&str, &str)> = Vec::new();
    let mut fragment = None;
    match reference {
        ContextReference::File { path, line, column } => {
            push_segment(&mut out, path);
            fragment = line.map(|line| match column {
                Some(column) => format!("L{line}:{column}"),
                None => format!("L{line}"),
            });
        }
        ContextReference::Folder { path } => push_segment(&mut out, path),
        ContextReference::Web { url, title } => {
            push_segment(&mut out, url);
            push_param(&mut params, PARAM_TITLE, title.as_deref());
        }
        ContextReference::Symbol {
            name,
            qualified_name,
            file,
        } => {
            push_segment(&mut out, qualified_name);
            push_param(&mut params, PARAM_NAME, Some(name.as_str()));
            push_param(&mut params, PARAM_FILE, file.as_deref());
        }
        ContextReference::Image { path, mime } => {
            push_segment(&mut out, path);
            push_param(&mut params, PARAM_MIME, mime.as_deref());
        }
        ContextReference::Terminal
        | ContextReference::Problems
        | ContextReference::Git
        | ContextReference::Selection
        | ContextReference::Workspace => {}
    }

    for (idx, (key, value)) in params.iter().enumerate() {
        out.push(if idx == 0 { '?' } else { '&' });
        out.push_str(key);
        out.push('=');
        out.push_str(&urlencoding::encode(value));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(&fragment);
    }
    out
}

/// Decode a reference URI, returning `None` for anything that is not a
/// recognized reference. Callers render such text as plain text.
pub fn decode_reference(uri: &str) -> Option<ContextReference> {
    match parse_reference_uri(uri) {
        Ok(reference) => Some(reference),
        Err(err) => {
            tracing::debug!("ignoring unrecognized reference uri {uri:?}: {err}");
            None
        }
    }
}

/// Strict form of [`decode_reference`] that reports why decoding failed.
pub fn parse_reference_uri(uri: &str) -> Result<ContextReference, ReferenceUriError> {
    let uri = uri.trim();
    if let Some(rest) = uri.strip_prefix(SCHEME_PREFIX) {
        return parse_canonical(rest);
    }
    if let Some(path) = uri.strip_prefix(LEGACY_FILE_PREFIX) {
        if path.is_empty() {
            return Err(ReferenceUriError::MissingSegment(ReferenceKind::File));
        }
        return Ok(ContextReference::file(path));
    }
    if is_http_url(uri) {
        return Ok(ContextReference::web(uri));
    }
    Err(ReferenceUriError::UnknownScheme)
}

fn parse_canonical(rest: &str) -> Result<ContextReference, ReferenceUriError> {
    let UriParts {
        body,
        query,
        fragment,
    } = split_uri(rest);

    let (kind_raw, primary_raw) = match body.split_once('/') {
        Some((kind, primary)) => (kind, primary),
        None => (body, ""),
    };
    let kind: ReferenceKind = kind_raw
        .parse()
        .map_err(|_| ReferenceUriError::UnknownKind(kind_raw.to_string()))?;

    let primary = if kind.has_payload() {
        if primary_raw.is_empty() {
            return Err(ReferenceUriError::MissingSegment(kind));
        }
        decode_segments(primary_raw)?
    } else {
        String::new()
    };
    let mut params = parse_query(query)?;

    let reference = match kind {
        ReferenceKind::File => {
            let (line, column) = match fragment {
                Some(fragment) if !fragment.is_empty() => parse_line_fragment(fragment)?,
                _ => (None, None),
            };
            ContextReference::File {
                path: primary,
                line,
                column,
            }
        }
        ReferenceKind::Folder => ContextReference::Folder { path: primary },
        ReferenceKind::Web => ContextReference::Web {
            url: primary,
            title: params.remove(PARAM_TITLE),
        },
        ReferenceKind::Symbol => {
            let name = params
                .remove(PARAM_NAME)
                .unwrap_or_else(|| short_symbol_name(&primary).to_string());
            ContextReference::Symbol {
                name,
                qualified_name: primary,
                file: params.remove(PARAM_FILE),
            }
        }
        ReferenceKind::Image => ContextReference::Image {
            path: primary,
            mime: params.remove(PARAM_MIME),
        },
        ReferenceKind::Terminal => ContextReference::Terminal,
        ReferenceKind::Problems => ContextReference::Problems,
        ReferenceKind::Git => ContextReference::Git,
        ReferenceKind::Selection => ContextReference::Selection,
        ReferenceKind::Workspace => ContextReference::Workspace,
    };
    Ok(reference)
}

struct UriParts<'a> {
    body: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

/// Split `rest` into body, query and fragment. Encoded segments never contain
/// a literal `?` or `#`, so the first occurrence of each is a delimiter.
fn split_uri(rest: &str) -> UriParts<'_> {
    let query_at = rest.find('?');
    let fragment_at = rest.find('#');
    match (query_at, fragment_at) {
        (None, None) => UriParts {
            body: rest,
            query: None,
            fragment: None,
        },
        (Some(q), None) => UriParts {
            body: &rest[..q],
            query: Some(&rest[q + 1..]),
            fragment: None,
        },
        (None, Some(f)) => UriParts {
            body: &rest[..f],
            query: None,
            fragment: Some(&rest[f + 1..]),
        },
        (Some(q), Some(f)) if q < f => UriParts {
            body: &rest[..q],
            query: Some(&rest[q + 1..f]),
            fragment: Some(&rest[f + 1..]),
        },
        (Some(q), Some(f)) => UriParts {
            body: &rest[..f],
            query: Some(&rest[q + 1..]),
            fragment: Some(&rest[f + 1..q]),
        },
    }
}

fn push_segment(out: &mut String, primary: &str) {
    out.push('/');
    for (idx, piece) in primary.split('/').enumerate() {
        if idx > 0 {
            out.push('/');
        }
        out.push_str(&urlencoding::encode(piece));
    }
}

fn push_param<'a>(params: &mut Vec<(&'a str, &'a str)>, key: &'a str, value: Option<&'a str>) {
    if let Some(value) = value
        && !value.is_empty()
    {
        params.push((key, value));
    }
}

fn decode_segments(raw: &str) -> Result<String, ReferenceUriError> {
    let mut out = String::with_capacity(raw.len());
    for (idx, piece) in raw.split('/').enumerate() {
        if idx > 0 {
            out.push('/');
        }
        out.push_str(&decode_component(piece)?);
    }
    Ok(out)
}

fn decode_component(raw: &str) -> Result<String, ReferenceUriError> {
    // `urlencoding::decode` passes malformed escapes through untouched.
    let bytes = raw.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(idx, &byte)| {
        byte != b'%'
            || bytes
                .get(idx + 1..idx + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return Err(ReferenceUriError::InvalidEncoding(raw.to_string()));
    }
    urlencoding::decode(raw)
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| ReferenceUriError::InvalidEncoding(raw.to_string()))
}

fn parse_query(query: Option<&str>) -> Result<HashMap<String, String>, ReferenceUriError> {
    let mut params = HashMap::new();
    let Some(query) = query else {
        return Ok(params);
    };
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = decode_component(value)?;
        if !value.is_empty() {
            params.insert(decode_component(key)?, value);
        }
    }
    Ok(params)
}

fn parse_line_fragment(fragment: &str) -> Result<(Option<u32>, Option<u32>), ReferenceUriError> {
    let invalid = || ReferenceUriError::InvalidFragment(fragment.to_string());
    let location = fragment.strip_prefix('L').ok_or_else(invalid)?;
    let (line, column) = match location.split_once(':') {
        Some((line, column)) => (line, Some(column)),
        None => (location, None),
    };
    let line = line.parse::<u32>().map_err(|_| invalid())?;
    let column = column
        .map(|column| column.parse::<u32>().map_err(|_| invalid()))
        .transpose()?;
    Ok((Some(line), column))
}

fn short_symbol_name(qualified_name: &str) -> &str {
    qualified_name
        .rsplit(['.', ':', '/', '#'])
        .find(|piece| !piece.is_empty())
        .unwrap_or(qualified_name)
}

fn is_http_url(uri: &str) -> bool {
    let lower = uri
        .get(..8)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    lower.starts_with("http://") || lower.starts_with("https://")
}
