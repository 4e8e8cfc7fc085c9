//! Client configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Environment lookup used for proxy resolution.
///
/// Defaults to the process environment. Tests and embedders can inject a
/// fixed table instead of mutating real process state.
#[derive(Clone)]
pub struct EnvLookup(Arc<dyn Fn(&str) -> Option<String> + Send + Sync>);

impl EnvLookup {
    /// Read from the process environment.
    pub fn process() -> Self {
        EnvLookup(Arc::new(|name| std::env::var(name).ok()))
    }

    pub fn from_fn<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        EnvLookup(Arc::new(lookup))
    }

    /// Fixed table; names not listed are unset.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let table: std::collections::HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_fn(move |name| table.get(name).cloned())
    }

    /// Nothing is set.
    pub fn empty() -> Self {
        Self::from_fn(|_| None)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
    }
}

impl Default for EnvLookup {
    fn default() -> Self {
        Self::process()
    }
}

impl fmt::Debug for EnvLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvLookup(..)")
    }
}

/// Configuration shared by every request a [`Client`](super::Client) sends.
///
/// # Examples
///
/// ```
/// use hookwire::client::ClientConfig;
///
/// let config = ClientConfig {
///     event_buffer: 16,
///     retry_delay_ms: 250,
///     ..Default::default()
/// };
/// assert!(config.enable_logging);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Capacity of channels created by `Client::event_channel`.
    pub event_buffer: usize,
    /// Log retries at `warn` level.
    pub enable_logging: bool,
    /// Base delay of the retry backoff, in milliseconds.
    pub retry_delay_ms: u64,
    #[serde(skip)]
    pub env: EnvLookup,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            event_buffer: 100,
            enable_logging: true,
            retry_delay_ms: 100,
            env: EnvLookup::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.event_buffer, 100);
        assert_eq!(config.retry_delay_ms, 100);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ClientConfig = serde_json::from_str(r#"{"event_buffer": 4}"#).unwrap();
        assert_eq!(config.event_buffer, 4);
        assert!(config.enable_logging);
    }

    #[test]
    fn test_env_from_pairs() {
        let env = EnvLookup::from_pairs([("HTTP_PROXY", "http://p:1")]);
        assert_eq!(env.get("HTTP_PROXY").as_deref(), Some("http://p:1"));
        assert_eq!(env.get("http_proxy"), None);
        assert_eq!(EnvLookup::empty().get("PATH"), None);
    }
}
