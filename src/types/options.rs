//! Per-request options.

use super::event::EventSink;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// A timeout that may be disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Millis(u64),
    Infinite,
}

impl Timeout {
    /// `None` means wait forever.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Timeout::Millis(ms) => Some(Duration::from_millis(*ms)),
            Timeout::Infinite => None,
        }
    }
}

impl From<u64> for Timeout {
    fn from(ms: u64) -> Self {
        Timeout::Millis(ms)
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::Millis(d.as_millis() as u64)
    }
}

/// Delivery mode of a streamed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsyncMode {
    /// Events are pushed as soon as the transport has them.
    #[default]
    Continuous,
    /// After the first event, each event waits for an explicit `advance`.
    Once,
}

/// TLS settings handed to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// Skip certificate verification. Only for testing.
    pub accept_invalid_certs: bool,
    /// Additional PEM-encoded root certificates.
    pub root_certificates_pem: Vec<Vec<u8>>,
}

/// Options recognized by the pipeline and the dispatcher.
///
/// `transport` is passed through to the transport untouched. `custom` is
/// reserved for derived clients (for example a retry attempt counter); the
/// dispatcher ignores it.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Connect timeout.
    pub timeout: Option<Timeout>,
    /// Response timeout.
    pub recv_timeout: Option<Timeout>,
    /// Destination for streamed delivery; absent means a synchronous call.
    pub stream_to: Option<EventSink>,
    pub async_mode: AsyncMode,
    pub proxy: Option<String>,
    /// `(user, password)` for the proxy; ignored when no proxy is resolved.
    pub proxy_auth: Option<(String, String)>,
    pub tls_options: Option<TlsOptions>,
    pub follow_redirect: Option<bool>,
    pub max_redirect: Option<u32>,
    pub transport: BTreeMap<String, Value>,
    pub custom: BTreeMap<String, Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn with_recv_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.recv_timeout = Some(timeout.into());
        self
    }

    /// Stream the response to `sink` instead of returning it.
    pub fn stream_to(mut self, sink: EventSink) -> Self {
        self.stream_to = Some(sink);
        self
    }

    /// Pull-gated delivery: see [`AsyncMode::Once`].
    pub fn once(mut self) -> Self {
        self.async_mode = AsyncMode::Once;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_proxy_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.proxy_auth = Some((user.into(), password.into()));
        self
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls_options = Some(tls);
        self
    }

    /// Let the transport follow redirects, optionally bounded.
    pub fn follow_redirects(mut self, max_redirect: Option<u32>) -> Self {
        self.follow_redirect = Some(true);
        self.max_redirect = max_redirect;
        self
    }

    pub fn with_transport_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.transport.insert(key.into(), value.into());
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    pub fn custom(&self, key: &str) -> Option<&Value> {
        self.custom.get(key)
    }

    /// Unsigned integer custom option, if present and well typed.
    pub fn custom_u64(&self, key: &str) -> Option<u64> {
        self.custom.get(key).and_then(Value::as_u64)
    }

    pub fn is_streamed(&self) -> bool {
        self.stream_to.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_duration() {
        assert_eq!(Timeout::Millis(250).as_duration(), Some(Duration::from_millis(250)));
        assert_eq!(Timeout::Infinite.as_duration(), None);
    }

    #[test]
    fn test_defaults_are_synchronous_and_continuous() {
        let opts = RequestOptions::new();
        assert!(!opts.is_streamed());
        assert_eq!(opts.async_mode, AsyncMode::Continuous);
        assert!(opts.follow_redirect.is_none());
    }

    #[test]
    fn test_custom_options() {
        let opts = RequestOptions::new()
            .with_custom("max_tries", 3)
            .with_custom("label", "x");
        assert_eq!(opts.custom_u64("max_tries"), Some(3));
        assert_eq!(opts.custom_u64("label"), None);
        assert_eq!(opts.custom("label"), Some(&Value::from("x")));
    }
}
