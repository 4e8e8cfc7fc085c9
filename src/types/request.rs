//! Request description and its field types.

use super::{HeaderList, Method, RequestOptions};
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Request headers as supplied by the caller.
///
/// Either ordered pairs (duplicates allowed) or a mapping with unique keys,
/// kept in insertion order.
/// The pipeline normalizes both to [`HeaderList`] before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Headers {
    Pairs(HeaderList),
    Map(IndexMap<String, String>),
}

impl Headers {
    pub fn new() -> Self {
        Headers::Pairs(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Headers::Pairs(pairs) => pairs.is_empty(),
            Headers::Map(map) => map.is_empty(),
        }
    }
}

impl Default for Headers {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for Headers {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Headers::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Headers {
    fn from(pairs: [(K, V); N]) -> Self {
        Headers::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<IndexMap<String, String>> for Headers {
    fn from(map: IndexMap<String, String>) -> Self {
        Headers::Map(map)
    }
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(map: BTreeMap<String, String>) -> Self {
        Headers::Map(map.into_iter().collect())
    }
}

impl From<HashMap<String, String>> for Headers {
    fn from(map: HashMap<String, String>) -> Self {
        Headers::Map(map.into_iter().collect())
    }
}

/// Query parameters, merged into the url at dispatch time.
///
/// Pairs and mappings are both encoded in the order they were built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    Pairs(Vec<(String, String)>),
    Map(IndexMap<String, String>),
}

impl Params {
    pub fn new() -> Self {
        Params::Pairs(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Params::Pairs(pairs) => pairs.is_empty(),
            Params::Map(map) => map.is_empty(),
        }
    }

    /// Borrowing iterator over `(key, value)` in encoding order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        match self {
            Params::Pairs(pairs) => Box::new(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            Params::Map(map) => Box::new(map.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for Params {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Params::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        Params::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<IndexMap<String, String>> for Params {
    fn from(map: IndexMap<String, String>) -> Self {
        Params::Map(map)
    }
}

impl From<BTreeMap<String, String>> for Params {
    fn from(map: BTreeMap<String, String>) -> Self {
        Params::Map(map.into_iter().collect())
    }
}

impl From<HashMap<String, String>> for Params {
    fn from(map: HashMap<String, String>) -> Self {
        Params::Map(map.into_iter().collect())
    }
}

/// A lazily produced sequence of body elements.
///
/// Holds a factory rather than a live stream so a request stays cloneable and
/// can be dispatched again (for example by a retrying client).
#[derive(Clone)]
pub struct ElementStream {
    factory: Arc<dyn Fn() -> BoxStream<'static, Bytes> + Send + Sync>,
}

impl ElementStream {
    pub fn new<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = Bytes> + Send + 'static,
    {
        ElementStream {
            factory: Arc::new(move || factory().boxed()),
        }
    }

    /// Stream over a fixed list of elements.
    pub fn from_elements<I>(elements: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        let elements: Vec<Bytes> = elements.into_iter().map(Into::into).collect();
        Self::new(move || stream::iter(elements.clone()))
    }

    /// Start producing elements from the beginning.
    pub fn open(&self) -> BoxStream<'static, Bytes> {
        (self.factory)()
    }
}

impl fmt::Debug for ElementStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ElementStream(..)")
    }
}

/// Request body.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Raw(Bytes),
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Path to a file whose contents are sent.
    File(PathBuf),
    Stream(ElementStream),
}

impl Body {
    pub fn form<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Body::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Raw(bytes) => bytes.is_empty(),
            Body::Form(pairs) => pairs.is_empty(),
            Body::File(_) | Body::Stream(_) => false,
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Raw(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Raw(bytes.into())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Raw(s.into())
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Raw(Bytes::from_static(s.as_bytes()))
    }
}

impl From<ElementStream> for Body {
    fn from(stream: ElementStream) -> Self {
        Body::Stream(stream)
    }
}

/// A request as described by the caller or produced by a hook.
///
/// The url is checked at construction: an empty url is rejected here, never
/// at dispatch. Fields are read through accessors and replaced through the
/// `with_*` builders, so a built request is never mutated in place.
///
/// # Examples
///
/// ```
/// use hookwire::{Method, Request, RequestOptions};
///
/// let request = Request::new(Method::Get, "example.com/get")
///     .unwrap()
///     .with_params([("foo", "bar")])
///     .with_headers([("accept", "text/plain")])
///     .with_options(RequestOptions::new().with_recv_timeout(5_000));
/// assert_eq!(request.url(), "example.com/get");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    headers: Headers,
    body: Body,
    params: Params,
    options: RequestOptions,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::Construction("url must not be empty".to_string()));
        }
        Ok(Request {
            method,
            url,
            headers: Headers::default(),
            body: Body::default(),
            params: Params::default(),
            options: RequestOptions::default(),
        })
    }

    pub fn get(url: impl Into<String>) -> Result<Self> {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<Body>) -> Result<Self> {
        Ok(Self::new(Method::Post, url)?.with_body(body))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Replace the url. Fails on an empty url, like [`Request::new`].
    pub fn with_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::Construction("url must not be empty".to_string()));
        }
        self.url = url;
        Ok(self)
    }

    pub fn with_headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Equivalent `curl` command line. See [`crate::protocol::to_curl`].
    pub fn to_curl(&self) -> String {
        crate::protocol::to_curl(self)
    }
}
