//! The overridable hook set.
//!
//! A derived client implements [`Hooks`] and overrides only the methods it
//! cares about; every other method keeps its default. For one request the
//! pipeline calls them in this order:
//!
//! 1. [`process_request_params`](Hooks::process_request_params)
//! 2. [`process_request_url`](Hooks::process_request_url)
//! 3. the url and params are merged into the dispatch url
//! 4. [`process_request_headers`](Hooks::process_request_headers)
//! 5. [`process_request_body`](Hooks::process_request_body)
//! 6. [`process_request_options`](Hooks::process_request_options)
//! 7. dispatch
//! 8. [`process_response_status_code`](Hooks::process_response_status_code),
//!    [`process_response_headers`](Hooks::process_response_headers),
//!    [`process_response_body`](Hooks::process_response_body)
//! 9. [`process_response`](Hooks::process_response)
//!
//! Streamed exchanges run the status and header hooks plus
//! [`process_response_chunk`](Hooks::process_response_chunk) on each event;
//! `process_response` only applies to synchronous responses.
//!
//! Hooks may run more than once for the same logical request (a retrying
//! client sends the processed request through the pipeline again), so they
//! should be idempotent over their own output.
//!
//! # Examples
//!
//! ```
//! use hookwire::{Hooks, Request};
//!
//! struct Api;
//!
//! impl Hooks for Api {
//!     fn process_request_url(&self, request: &Request) -> String {
//!         if request.url().starts_with("https://") {
//!             request.url().to_string()
//!         } else {
//!             format!("https://api.example.com{}", request.url())
//!         }
//!     }
//! }
//! ```

use crate::error::Result;
use crate::protocol::{normalize_headers, normalize_url};
use crate::types::{Body, HeaderList, Outcome, Params, Request, RequestOptions, Response};
use async_trait::async_trait;
use bytes::Bytes;

/// Re-enters the pipeline from the first hook.
///
/// Handed to [`Hooks::process_response`] so a hook can send a request again,
/// for example to retry.
#[async_trait]
pub trait Resend: Send + Sync {
    async fn resend(&self, request: Request) -> Result<Outcome>;
}

/// Transformation points of the request/response pipeline.
#[async_trait]
pub trait Hooks: Send + Sync + 'static {
    fn process_request_params(&self, request: &Request) -> Params {
        request.params().clone()
    }

    /// Defaults to prepending `http://` when no scheme is present.
    fn process_request_url(&self, request: &Request) -> String {
        normalize_url(request.url())
    }

    /// Defaults to flattening a header mapping into ordered pairs.
    fn process_request_headers(&self, request: &Request) -> HeaderList {
        normalize_headers(request.headers())
    }

    fn process_request_body(&self, request: &Request) -> Body {
        request.body().clone()
    }

    fn process_request_options(&self, request: &Request) -> RequestOptions {
        request.options().clone()
    }

    fn process_response_status_code(&self, status_code: u16) -> u16 {
        status_code
    }

    fn process_response_headers(&self, headers: HeaderList) -> HeaderList {
        headers
    }

    fn process_response_body(&self, body: Bytes) -> Bytes {
        body
    }

    fn process_response_chunk(&self, chunk: Bytes) -> Bytes {
        chunk
    }

    /// Final transform of a synchronous response. What this returns is what
    /// the caller gets.
    async fn process_response(&self, response: Response, _resend: &dyn Resend) -> Result<Outcome> {
        Ok(Outcome::Response(response))
    }
}

/// Hooks with every default in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl Hooks for DefaultHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_defaults() {
        let mut map = BTreeMap::new();
        map.insert("Accept".to_string(), "*/*".to_string());
        let request = Request::get("example.com/x")
            .unwrap()
            .with_headers(map)
            .with_params([("a", "1")]);

        let hooks = DefaultHooks;
        assert_eq!(hooks.process_request_url(&request), "http://example.com/x");
        assert_eq!(
            hooks.process_request_headers(&request),
            vec![("Accept".to_string(), "*/*".to_string())]
        );
        assert_eq!(hooks.process_request_params(&request), Params::from([("a", "1")]));
        assert_eq!(hooks.process_response_status_code(418), 418);
        assert_eq!(hooks.process_response_body(Bytes::from("b")), Bytes::from("b"));
        assert_eq!(hooks.process_response_chunk(Bytes::from("c")), Bytes::from("c"));
    }
}
