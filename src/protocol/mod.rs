//! Pure request-shaping helpers.
//!
//! Nothing in this module performs I/O. The pipeline and the dispatcher call
//! these functions to normalize urls and headers, merge query parameters,
//! encode form bodies and resolve proxies.
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`normalize_url`] | Prepend `http://` to scheme-less urls |
//! | [`normalize_headers`] | Mapping or pairs to ordered pairs |
//! | [`merge_query`] | Append encoded params to a url |
//! | [`resolve_proxy`] | Explicit option, then scheme-specific env vars |
//! | [`to_curl`] | Render a request as a `curl` command |

pub mod constants;
mod curl;
mod headers;
mod proxy;
mod query;
mod scheme;

pub use curl::to_curl;
pub use headers::{has_header, header_value, normalize_headers};
pub use proxy::{matches_no_proxy, resolve_proxy};
pub use query::{encode_form, encode_params, merge_query};
pub use scheme::{has_recognized_scheme, normalize_url, url_host, url_scheme};
