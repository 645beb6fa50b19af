//! Header handling shared by the request and response paths.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Headers that describe a single connection and must not be forwarded.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    HeaderName::from_static("keep-alive"),
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Pending header edits, applied on top of a header map in one step.
///
/// Filters write here instead of into the request or response itself, so
/// the inbound headers stay untouched and edits are applied in order.
#[derive(Debug, Clone, Default)]
pub struct HeaderOverlay {
    edits: Vec<HeaderEdit>,
}

#[derive(Debug, Clone)]
enum HeaderEdit {
    Append(HeaderName, HeaderValue),
    Insert(HeaderName, HeaderValue),
    Remove(HeaderName),
}

impl HeaderOverlay {
    /// Add a value, keeping existing values of the same header.
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.edits.push(HeaderEdit::Append(name, value));
    }

    /// Set a value, replacing existing values of the same header.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        self.edits.push(HeaderEdit::Insert(name, value));
    }

    pub fn remove(&mut self, name: HeaderName) {
        self.edits.push(HeaderEdit::Remove(name));
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Value of `name` once the overlay is applied on top of `base`.
    pub fn resolve<'a>(&'a self, base: Option<&'a HeaderMap>, name: &HeaderName) -> Option<&'a HeaderValue> {
        let mut current = base.and_then(|b| b.get(name));
        for edit in &self.edits {
            match edit {
                HeaderEdit::Append(n, v) if n == name && current.is_none() => current = Some(v),
                HeaderEdit::Insert(n, v) if n == name => current = Some(v),
                HeaderEdit::Remove(n) if n == name => current = None,
                _ => {}
            }
        }
        current
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        for edit in &self.edits {
            match edit {
                HeaderEdit::Append(name, value) => {
                    headers.append(name.clone(), value.clone());
                }
                HeaderEdit::Insert(name, value) => {
                    headers.insert(name.clone(), value.clone());
                }
                HeaderEdit::Remove(name) => {
                    headers.remove(name);
                }
            }
        }
    }
}
