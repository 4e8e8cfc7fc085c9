//! Protocol constants.

/// Schemes left untouched by url normalization.
pub mod schemes {
    pub const HTTP: &str = "http://";
    pub const HTTPS: &str = "https://";
    /// HTTP over a Unix domain socket.
    pub const HTTP_UNIX: &str = "http+unix://";

    pub const RECOGNIZED: [&str; 3] = [HTTP, HTTPS, HTTP_UNIX];
}

pub mod headers {
    pub const CONTENT_TYPE: &str = "content-type";
    pub const LOCATION: &str = "location";
}

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Environment variables consulted for proxy resolution, in lookup order.
pub mod env {
    pub const HTTP_PROXY: [&str; 2] = ["HTTP_PROXY", "http_proxy"];
    pub const HTTPS_PROXY: [&str; 2] = ["HTTPS_PROXY", "https_proxy"];
    pub const NO_PROXY: [&str; 2] = ["NO_PROXY", "no_proxy"];
}
