//! Query-string merging.
//!
//! Declared params are appended after whatever query the url already has.
//! Existing pairs are never rewritten: a key present in both ends up twice,
//! existing occurrence first.
//!
//! ```
//! use hookwire::Params;
//! use hookwire::protocol::merge_query;
//!
//! let params = Params::from([("foo", "second"), ("baz", "bong")]);
//! assert_eq!(
//!     merge_query("http://example.com/get?bar=zing&foo=first", &params),
//!     "http://example.com/get?bar=zing&foo=first&foo=second&baz=bong"
//! );
//! ```

use crate::types::Params;
use url::form_urlencoded;

/// Percent-encode params as `k=v&k=v` in their iteration order.
pub fn encode_params(params: &Params) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

/// Encode form fields for an `application/x-www-form-urlencoded` body.
pub fn encode_form(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

/// Produce the dispatch url from `url` and `params`.
///
/// Empty params leave the url untouched. Otherwise the encoded params follow
/// `&` when the url already has a `?`, and `?` when it does not.
pub fn merge_query(url: &str, params: &Params) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, encode_params(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_empty_params_leave_url_unchanged() {
        assert_eq!(merge_query("http://a/b", &Params::new()), "http://a/b");
        assert_eq!(merge_query("http://a/b?x=1", &Params::new()), "http://a/b?x=1");
        assert_eq!(
            merge_query("http://a/b", &Params::Map(IndexMap::new())),
            "http://a/b"
        );
    }

    #[test]
    fn test_params_start_a_query() {
        let params = Params::from([("foo", "bar"), ("baz", "bong")]);
        assert_eq!(
            merge_query("http://example.com/get", &params),
            "http://example.com/get?foo=bar&baz=bong"
        );
    }

    #[test]
    fn test_params_extend_existing_query_keeping_duplicates() {
        let params = Params::from(vec![("foo", "second"), ("baz", "bong")]);
        assert_eq!(
            merge_query("http://example.com/get?bar=zing&foo=first", &params),
            "http://example.com/get?bar=zing&foo=first&foo=second&baz=bong"
        );
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let params = Params::from([("q", "a b&c"), ("path", "/x")]);
        assert_eq!(encode_params(&params), "q=a+b%26c&path=%2Fx");
    }

    #[test]
    fn test_form_encoding() {
        let pairs = vec![("name".to_string(), "J Doe".to_string())];
        assert_eq!(encode_form(&pairs), "name=J+Doe");
    }
}
