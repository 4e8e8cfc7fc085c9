//! Url scheme handling.

use super::constants::schemes;

/// Whether `url` starts with `http://`, `https://` or `http+unix://`,
/// compared case-insensitively.
pub fn has_recognized_scheme(url: &str) -> bool {
    schemes::RECOGNIZED.iter().any(|scheme| {
        url.len() >= scheme.len()
            && url.as_bytes()[..scheme.len()].eq_ignore_ascii_case(scheme.as_bytes())
    })
}

/// Default url normalization.
///
/// A url with a recognized scheme is returned unchanged. A scheme-relative
/// url (`//host/path`) gets `http:`; anything else gets `http://`.
pub fn normalize_url(url: &str) -> String {
    if has_recognized_scheme(url) {
        url.to_string()
    } else if url.starts_with("//") {
        format!("http:{}", url)
    } else {
        format!("{}{}", schemes::HTTP, url)
    }
}

/// Lower-cased scheme of an absolute url, without `://`.
pub fn url_scheme(url: &str) -> Option<String> {
    url.find("://").map(|pos| url[..pos].to_ascii_lowercase())
}

/// Host of an absolute url, if it parses.
pub fn url_host(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_http() {
        assert_eq!(normalize_url("example.com/get"), "http://example.com/get");
        assert_eq!(normalize_url("localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn test_recognized_schemes_are_kept() {
        for url in [
            "http://example.com",
            "https://example.com",
            "HTTPS://EXAMPLE.COM",
            "Http://example.com",
            "http+unix://%2Fvar%2Frun%2Fd.sock/info",
            "HTTP+UNIX://%2Ftmp%2Fs/",
        ] {
            assert_eq!(normalize_url(url), url);
        }
    }

    #[test]
    fn test_scheme_relative_url() {
        assert_eq!(normalize_url("//example.com/a"), "http://example.com/a");
    }

    #[test]
    fn test_other_schemes_are_not_recognized() {
        assert!(!has_recognized_scheme("ftp://example.com"));
        assert!(!has_recognized_scheme("http:/example.com"));
        assert!(!has_recognized_scheme("htt"));
    }

    #[test]
    fn test_scheme_and_host_extraction() {
        assert_eq!(url_scheme("HTTPS://a.b/c").as_deref(), Some("https"));
        assert_eq!(url_scheme("a.b/c"), None);
        assert_eq!(url_host("http://API.example.com:81/x").as_deref(), Some("api.example.com"));
    }
}
