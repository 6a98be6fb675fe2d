//! Intercepted resource requests.

use reqwest::Method;
use url::Url;

use crate::fetch::url::{UrlError, resolve};

/// An outbound resource request as seen by the asset cache manager.
///
/// The request identity used for cache lookups is the method plus the
/// canonical URL; headers are forwarded to the network but never part of the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
}

impl AssetRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: Vec::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Build a request for `target`, resolving relative paths against `origin`.
    pub fn resolve(method: Method, origin: &Url, target: &str) -> Result<Self, UrlError> {
        Ok(Self::new(method, resolve(origin, target)?))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Only `GET` requests are looked up in or written to a cache generation.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == Method::GET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        let origin = Url::parse("http://localhost:8080/").unwrap();
        let request = AssetRequest::resolve(Method::GET, &origin, "manifest.json").unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/manifest.json");
        assert!(request.is_cacheable_method());
    }

    #[test]
    fn test_non_get_not_cacheable() {
        let request = AssetRequest::new(Method::POST, Url::parse("http://localhost:8080/upload").unwrap());
        assert!(!request.is_cacheable_method());
    }

    #[test]
    fn test_with_header() {
        let request = AssetRequest::get(Url::parse("http://localhost:8080/").unwrap()).with_header("accept", "text/html");
        assert_eq!(request.headers(), &[("accept".to_string(), "text/html".to_string())]);
    }
}
