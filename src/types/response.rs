//! Response side of the model.

use super::{AsyncHandle, HeaderList, Request};
use crate::error::Result;
use crate::protocol::header_value;
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// A complete synchronous response.
///
/// `request` is the request as it looked after the request hooks ran, which
/// is what was actually sent. A hook can feed it back into the pipeline to
/// send an equivalent request again.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub headers: HeaderList,
    pub body: Bytes,
    pub request: Request,
}

impl Response {
    /// First header value matching `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A redirect the transport was allowed to follow but did not.
#[derive(Debug, Clone)]
pub struct MaybeRedirect {
    pub status_code: u16,
    pub redirect_url: String,
    pub headers: HeaderList,
    pub request: Request,
}

/// What a dispatched request produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    Response(Response),
    /// Streamed exchange; events go to the request's `stream_to` destination.
    Async(AsyncHandle),
    Redirect(MaybeRedirect),
}

impl Outcome {
    pub fn into_response(self) -> Option<Response> {
        match self {
            Outcome::Response(response) => Some(response),
            _ => None,
        }
    }

    pub fn into_async(self) -> Option<AsyncHandle> {
        match self {
            Outcome::Async(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn into_redirect(self) -> Option<MaybeRedirect> {
        match self {
            Outcome::Redirect(redirect) => Some(redirect),
            _ => None,
        }
    }
}
