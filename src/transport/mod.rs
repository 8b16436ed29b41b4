//! HTTP transport abstraction shared by captcha services and hoster plugins.
//!
//! Plugins never own a client of their own. They receive an
//! [`HttpTransport`] from the host so cookies, default headers and timeouts
//! stay under the host's control, and tests can swap in a stub.

mod reqwest_client;
#[cfg(test)]
pub(crate) mod stub;

pub use reqwest_client::ReqwestTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

/// Ordered list of form fields as sent on the wire.
pub type FormFields = Vec<(String, String)>;

/// Builds [`FormFields`] from borrowed pairs.
pub fn form_fields<'a, I>(pairs: I) -> FormFields
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// File attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

impl FilePart {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content,
        }
    }
}

/// Per-request overrides layered over the transport defaults.
///
/// Overrides only live for the request they are passed to; nothing leaks
/// into later calls on the same transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Minimal response representation returned by the transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub url: Url,
    pub body: Bytes,
}

impl TransportResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url '{0}': {1}")]
    InvalidUrl(String, #[source] url::ParseError),
    #[error("request to {0} timed out")]
    Timeout(String),
    #[error("http transport error: {0}")]
    Transport(String),
}

/// Contract every plugin uses to reach remote sites.
///
/// Implementations must keep cookies between calls so login flows and the
/// requests that follow them share one session.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        url: &Url,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError>;

    async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
        options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError>;

    async fn post_multipart(
        &self,
        url: &Url,
        fields: &[(String, String)],
        file: &FilePart,
        options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError>;

    /// Store a `Set-Cookie` style cookie string for `url`.
    fn add_cookie(&self, _url: &Url, _cookie: &str) {}
}

/// Parse a URL, mapping failures into [`TransportError::InvalidUrl`].
pub fn parse_url(raw: &str) -> Result<Url, TransportError> {
    Url::parse(raw).map_err(|err| TransportError::InvalidUrl(raw.to_string(), err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields_keeps_order() {
        let fields = form_fields([("b", "2"), ("a", "1")]);
        assert_eq!(
            fields,
            vec![("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn parse_url_reports_raw_input() {
        let err = parse_url("not a url").unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(ref raw, _) if raw == "not a url"));
    }

    #[test]
    fn response_text_is_lossy() {
        let response = TransportResponse {
            status: 200,
            url: Url::parse("https://example.com").unwrap(),
            body: Bytes::from_static(b"ok\xff"),
        };
        assert!(response.is_success());
        assert_eq!(response.text(), "ok\u{fffd}");
    }
}
