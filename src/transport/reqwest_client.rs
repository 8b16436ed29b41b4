//! Reqwest-based implementation of the [`HttpTransport`] trait.
//!
//! Thin adapter around `reqwest::Client` with a shared cookie jar, so a
//! plugin's login and the requests after it run in the same session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use url::Url;

use super::{FilePart, HttpTransport, RequestOptions, TransportError, TransportResponse};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Reqwest-backed transport handed to plugins by the host.
pub struct ReqwestTransport {
    client: Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh cookie jar and the default timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a transport whose requests time out after `timeout` unless a
    /// request overrides it.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Transport(err.to_string()))?;

        Ok(Self { client, jar })
    }

    /// Wrap an existing reqwest client. Cookies added through
    /// [`HttpTransport::add_cookie`] only reach the wire if `jar` is the
    /// client's cookie provider.
    pub fn from_client(client: Client, jar: Arc<Jar>) -> Self {
        Self { client, jar }
    }

    async fn send(
        &self,
        url: &Url,
        builder: RequestBuilder,
        options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        let builder = match options.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };

        let response = builder.send().await.map_err(|err| map_error(url, err))?;
        to_transport_response(url, response).await
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &Url,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        log::debug!("-> GET {url}");
        let builder = self.client.get(url.as_str()).query(query);
        self.send(url, builder, &RequestOptions::default()).await
    }

    async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
        options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        log::debug!("-> POST {url} (form, {} fields)", fields.len());
        let builder = self.client.post(url.as_str()).form(fields);
        self.send(url, builder, options).await
    }

    async fn post_multipart(
        &self,
        url: &Url,
        fields: &[(String, String)],
        file: &FilePart,
        options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        log::debug!(
            "-> POST {url} (multipart, {} fields + {} bytes)",
            fields.len(),
            file.content.len()
        );

        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name.clone(), value.clone());
        }
        let part = Part::bytes(file.content.clone()).file_name(file.file_name.clone());
        form = form.part(file.field.clone(), part);

        let builder = self.client.post(url.as_str()).multipart(form);
        self.send(url, builder, options).await
    }

    fn add_cookie(&self, url: &Url, cookie: &str) {
        self.jar.add_cookie_str(cookie, url);
    }
}

fn map_error(url: &Url, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(url.to_string())
    } else {
        TransportError::Transport(err.to_string())
    }
}

async fn to_transport_response(
    url: &Url,
    response: reqwest::Response,
) -> Result<TransportResponse, TransportError> {
    let status = response.status().as_u16();
    let final_url = response.url().clone();
    let body = response.bytes().await.map_err(|err| map_error(url, err))?;

    log::debug!("<- {final_url} -> {status} ({} bytes)", body.len());

    Ok(TransportResponse {
        status,
        url: final_url,
        body,
    })
}
