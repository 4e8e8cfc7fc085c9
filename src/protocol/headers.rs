//! Header normalization and lookup.
//!
//! Callers may hand headers over as ordered pairs or as a mapping. The
//! pipeline normalizes once, early, into ordered pairs; everything after that
//! point only sees [`HeaderList`].
//!
//! # Examples
//!
//! ```
//! use hookwire::Headers;
//! use hookwire::protocol::{normalize_headers, header_value};
//! use indexmap::IndexMap;
//!
//! let mut map = IndexMap::new();
//! map.insert("Accept".to_string(), "text/plain".to_string());
//! let pairs = normalize_headers(&Headers::Map(map));
//! assert_eq!(pairs, vec![("Accept".to_string(), "text/plain".to_string())]);
//! assert_eq!(header_value(&pairs, "accept"), Some("text/plain"));
//! ```

use crate::types::{HeaderList, Headers};

/// Ordered pairs pass through unchanged; a mapping becomes pairs in insertion order.
pub fn normalize_headers(headers: &Headers) -> HeaderList {
    match headers {
        Headers::Pairs(pairs) => pairs.clone(),
        Headers::Map(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

/// First value whose name matches `name` case-insensitively.
pub fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub fn has_header(headers: &[(String, String)], name: &str) -> bool {
    header_value(headers, name).is_some()
}
