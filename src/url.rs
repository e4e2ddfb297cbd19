//! CDN URL construction: hostname stripping, percent-encoding, host
//! selection, query assembly, and MD5 token signing.
//!
//! The output format is pinned by markup snapshots in long-lived host
//! applications, so every rule here is byte-exact:
//!
//! - Paths with an `http(s)://` scheme whose host matches a configured strip
//!   candidate lose the scheme and host; non-matching fully-qualified URLs
//!   are percent-encoded whole into a single literal path segment
//!   (`/https%3A%2F%2F…`). The latter looks odd but is intentional
//!   passthrough behavior that existing markup depends on.
//! - Signed URLs carry `s=md5(token + path + "?" + query)` as the final
//!   parameter. The `?` is part of the signature base even when the query is
//!   empty, which also produces the historical `?&s=…` shape.
//! - Percent-encoding escapes everything outside the RFC 3986 unreserved
//!   set, with uppercase hex digits.

use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::ResolvedConfig;

/// Everything outside `A-Za-z0-9 - . _ ~` gets escaped.
const UNRESERVED_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a single path or query component.
pub(crate) fn encode_component(component: &str) -> String {
    utf8_percent_encode(component, UNRESERVED_ENCODE).to_string()
}

/// Split `http://…` / `https://…` into the scheme prefix and the remainder.
fn split_scheme(path: &str) -> Option<(&str, &str)> {
    for prefix in ["http://", "https://"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return Some((prefix, rest));
        }
    }
    None
}

/// Strip the scheme and hostname from a fully-qualified URL when the
/// hostname exactly matches one of the configured strip candidates.
///
/// Anything else — relative paths, URLs with unmatched hosts — is returned
/// unchanged.
pub(crate) fn strip_hostname(config: &ResolvedConfig, path: &str) -> String {
    if let Some((_, rest)) = split_scheme(path) {
        let (host, remainder) = match rest.find('/') {
            Some(slash) => (&rest[..slash], &rest[slash..]),
            None => (rest, ""),
        };
        if config.hostnames_to_replace.iter().any(|h| h == host) {
            return if remainder.is_empty() {
                "/".to_string()
            } else {
                remainder.to_string()
            };
        }
    }
    path.to_string()
}

/// Turn an input path into the path component of the final URL.
///
/// Fully-qualified URLs (still carrying a scheme after stripping) become a
/// single percent-encoded path segment under `/`; plain paths get a leading
/// slash ensured and are otherwise passed through verbatim.
pub(crate) fn encode_path(path: &str) -> String {
    if split_scheme(path).is_some() {
        format!("/{}", encode_component(path))
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Pick the source host for a path.
///
/// Deterministic: a stable hash of the encoded path modulo the host count,
/// so a given image always resolves to the same host (and thus stays warm in
/// that host's CDN cache) no matter which process builds the tag.
pub(crate) fn select_host<'a>(config: &'a ResolvedConfig, encoded_path: &str) -> &'a str {
    let index = (fxhash::hash64(encoded_path) % config.sources.len() as u64) as usize;
    &config.sources[index]
}

/// Serialize parameters into a query string, preserving the caller's order.
pub(crate) fn build_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn signature(token: &str, encoded_path: &str, query: &str) -> String {
    let digest = Md5::digest(format!("{token}{encoded_path}?{query}").as_bytes());
    format!("{digest:x}")
}

/// Build the final URL for a path and an ordered parameter list.
///
/// Applies hostname stripping, path encoding, host selection, query
/// assembly, and — when a token is configured — MD5 signing with `s`
/// appended as the last parameter.
pub(crate) fn build_url(config: &ResolvedConfig, path: &str, params: &[(String, String)]) -> String {
    let stripped = strip_hostname(config, path);
    let encoded_path = encode_path(&stripped);
    let host = select_host(config, &encoded_path);
    let query = build_query(params);
    let prefix = format!("{}://{host}{encoded_path}", config.scheme());

    match &config.secure_url_token {
        Some(token) => {
            let s = signature(token, &encoded_path, &query);
            format!("{prefix}?{query}&s={s}")
        }
        None if query.is_empty() => prefix,
        None => format!("{prefix}?{query}"),
    }
}
