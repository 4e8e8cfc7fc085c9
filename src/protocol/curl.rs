//! Render a request as an equivalent `curl` invocation, for debugging.

use super::headers::normalize_headers;
use super::query::{encode_form, merge_query};
use crate::types::{Body, Request, Timeout};

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn seconds(timeout: &Timeout) -> Option<String> {
    match timeout {
        Timeout::Millis(ms) => Some(format!("{}", *ms as f64 / 1000.0)),
        Timeout::Infinite => None,
    }
}

/// Build a shell-quoted `curl` command line for `request`.
///
/// ```
/// use hookwire::Request;
///
/// let request = Request::post("http://example.com/post", "{\"a\":1}")
///     .unwrap()
///     .with_headers([("Content-Type", "application/json")]);
/// assert_eq!(
///     request.to_curl(),
///     "curl -X POST -H 'Content-Type: application/json' -d '{\"a\":1}' 'http://example.com/post'"
/// );
/// ```
pub fn to_curl(request: &Request) -> String {
    let mut parts = vec!["curl".to_string(), "-X".to_string(), request.method().to_string()];

    for (name, value) in normalize_headers(request.headers()) {
        parts.push("-H".to_string());
        parts.push(quote(&format!("{}: {}", name, value)));
    }

    match request.body() {
        Body::Empty => {}
        Body::Raw(bytes) => {
            if !bytes.is_empty() {
                parts.push("-d".to_string());
                parts.push(quote(&String::from_utf8_lossy(bytes)));
            }
        }
        Body::Form(pairs) => {
            parts.push("-d".to_string());
            parts.push(quote(&encode_form(pairs)));
        }
        Body::File(path) => {
            parts.push("--data-binary".to_string());
            parts.push(quote(&format!("@{}", path.display())));
        }
        Body::Stream(_) => {
            parts.push("-T".to_string());
            parts.push("-".to_string());
        }
    }

    let options = request.options();
    if let Some(proxy) = &options.proxy {
        parts.push("-x".to_string());
        parts.push(quote(proxy));
        if let Some((user, password)) = &options.proxy_auth {
            parts.push("-U".to_string());
            parts.push(quote(&format!("{}:{}", user, password)));
        }
    }
    if let Some(secs) = options.timeout.as_ref().and_then(seconds) {
        parts.push("--connect-timeout".to_string());
        parts.push(secs);
    }
    if let Some(secs) = options.recv_timeout.as_ref().and_then(seconds) {
        parts.push("--max-time".to_string());
        parts.push(secs);
    }
    if options.follow_redirect == Some(true) {
        parts.push("-L".to_string());
        if let Some(max) = options.max_redirect {
            parts.push("--max-redirs".to_string());
            parts.push(max.to_string());
        }
    }
    if options
        .tls_options
        .as_ref()
        .is_some_and(|tls| tls.accept_invalid_certs)
    {
        parts.push("-k".to_string());
    }

    parts.push(quote(&merge_query(request.url(), request.params())));
    parts.join(" ")
}
