//! Canonical request construction.
//!
//! ```text
//! METHOD\n
//! PATH\n
//! CANONICAL_QUERY\n
//! name:value\n ... (one line per header)\n
//! SIGNED_HEADERS\n
//! UNSIGNED-PAYLOAD
//! ```
//!
//! Duplicate query parameters and duplicate headers collapse to the LAST
//! value seen. This mirrors what the storage endpoint has been observed to
//! accept; multi-value semantics are intentionally not implemented.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};
use reqwest::{Request, header::HeaderMap};

use super::{AuthError, UNSIGNED_PAYLOAD};

/// Everything except RFC 3986 unreserved characters is escaped.
const QUERY_VALUE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Canonical header block plus the matching signed-headers list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHeaders {
    /// `name:value\n` for every header, sorted by lowercase name.
    pub canonical: String,
    /// Sorted lowercase names joined by `;`.
    pub signed: String,
}

/// Canonical request text together with the signed-headers list that the
/// `Authorization` header must repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    pub request: String,
    pub signed_headers: String,
}

/// Canonicalize an outbound request exactly as it will be sent.
pub fn canonicalize(request: &Request) -> Result<CanonicalRequest, AuthError> {
    let url = request.url();
    let headers = canonical_headers(header_pairs(request.headers())?);
    let text = canonical_request(request.method().as_str(), url.path(), url.query(), &headers);

    Ok(CanonicalRequest {
        request: text,
        signed_headers: headers.signed,
    })
}

/// Assemble the canonical request from already-canonical parts.
///
/// `path` is used verbatim; it must already be in its on-the-wire encoding.
pub fn canonical_request(
    method: &str,
    path: &str,
    query: Option<&str>,
    headers: &CanonicalHeaders,
) -> String {
    let query = canonical_query_string(query);
    format!(
        "{method}\n{path}\n{query}\n{}\n{}\n{UNSIGNED_PAYLOAD}",
        headers.canonical, headers.signed
    )
}

/// Sort query parameters by name and re-encode their values.
///
/// Values are percent-decoded once before encoding so a query that is already
/// escaped (as every `Url` query is) does not get double-encoded. Names are
/// emitted as-is.
pub fn canonical_query_string(query: Option<&str>) -> String {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return String::new();
    };

    let mut params: BTreeMap<&str, &str> = BTreeMap::new();
    for field in query.split('&').filter(|f| !f.is_empty()) {
        let (name, value) = field.split_once('=').unwrap_or((field, ""));
        params.insert(name, value);
    }

    params
        .iter()
        .map(|(name, value)| format!("{name}={}", encode_query_value(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical header block from `(name, value)` pairs.
///
/// Names are lowercased here rather than trusting the caller; values are kept
/// verbatim.
pub fn canonical_headers<'a, I>(headers: I) -> CanonicalHeaders
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut sorted: BTreeMap<String, &str> = BTreeMap::new();
    for (name, value) in headers {
        sorted.insert(name.to_ascii_lowercase(), value);
    }

    let canonical = sorted
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect::<String>();
    let signed = sorted.keys().map(String::as_str).collect::<Vec<_>>().join(";");

    CanonicalHeaders { canonical, signed }
}

/// Borrow every header of `headers` as text, in insertion order.
pub fn header_pairs(headers: &HeaderMap) -> Result<Vec<(&str, &str)>, AuthError> {
    headers
        .iter()
        .map(|(name, value)| {
            value
                .to_str()
                .map(|value| (name.as_str(), value))
                .map_err(|_| AuthError::InvalidHeaderValue {
                    name: name.as_str().to_string(),
                })
        })
        .collect()
}

fn encode_query_value(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let decoded: Vec<u8> = percent_decode_str(raw).collect();
    percent_encode(&decoded, QUERY_VALUE_ENCODE_SET).to_string()
}
