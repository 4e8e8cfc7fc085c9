//! Proxy resolution.
//!
//! Precedence: an explicit proxy option, then the scheme-specific
//! environment variables (`HTTPS_PROXY`/`https_proxy` for https targets,
//! `HTTP_PROXY`/`http_proxy` for http targets), then no proxy. An
//! environment proxy is skipped when the target host is listed in
//! `NO_PROXY`/`no_proxy`.
//!
//! The environment is read through an injected lookup so callers and tests
//! never have to touch process state.

use super::constants::env;
use super::scheme::{url_host, url_scheme};

fn lookup_first(names: &[&str], lookup: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    names
        .iter()
        .filter_map(|name| lookup(*name))
        .find(|value| !value.trim().is_empty())
}

/// Whether `host` is excluded by a `no_proxy` list.
///
/// Entries are comma separated. `*` matches every host; an entry matches the
/// host itself and its subdomains, with or without a leading dot.
pub fn matches_no_proxy(host: &str, no_proxy: &str) -> bool {
    let host = host.to_ascii_lowercase();
    no_proxy
        .split(',')
        .map(|entry| entry.trim().to_ascii_lowercase())
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            if entry == "*" {
                return true;
            }
            let domain = entry.trim_start_matches('.');
            host == domain || host.ends_with(&format!(".{}", domain))
        })
}

/// Proxy to use for `url`, if any.
pub fn resolve_proxy(
    explicit: Option<&str>,
    url: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Option<String> {
    if let Some(proxy) = explicit {
        return Some(proxy.to_string());
    }

    let from_env = match url_scheme(url).as_deref() {
        Some("https") => lookup_first(&env::HTTPS_PROXY, lookup),
        Some("http") => lookup_first(&env::HTTP_PROXY, lookup),
        _ => None,
    }?;

    if let (Some(host), Some(no_proxy)) = (url_host(url), lookup_first(&env::NO_PROXY, lookup)) {
        if matches_no_proxy(&host, &no_proxy) {
            tracing::debug!(%host, "Skipping environment proxy (no_proxy)");
            return None;
        }
    }

    Some(from_env)
}
