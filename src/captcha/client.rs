//! Client for plain-text captcha solving vendors such as ImageTyperz.
//!
//! Three independent request/response exchanges: balance, submit and
//! report-bad. The client never retries; callers own retry policy.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::{ImageTyperzConfig, ServiceEndpoints};
use crate::transport::{FilePart, FormFields, HttpTransport, RequestOptions, form_fields};

use super::{
    CaptchaError, CaptchaImage, CaptchaResult, CaptchaService, CaptchaSolution, PlainTextDecoder,
    RefundReply, ResponseDecoder,
};

const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 80;

const ACTION_BALANCE: &str = "REQUESTBALANCE";
const ACTION_UPLOAD: &str = "UPLOADCAPTCHA";
const ACTION_BAD_IMAGE: &str = "SETBADIMAGE";

/// Account credentials of a solving vendor.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both username and password are set.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Passwords made of ASCII word characters survive multipart encoding
    /// intact; anything else forces the base64 form fallback.
    pub fn has_simple_password(&self) -> bool {
        SIMPLE_PASSWORD_RE.is_match(&self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How the image travels in an upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitPayload {
    /// Raw bytes as a multipart file part.
    Multipart(FilePart),
    /// Base64 text in a regular url-encoded `file` field.
    Base64(String),
}

/// Fully built upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub fields: FormFields,
    pub payload: SubmitPayload,
}

impl SubmitRequest {
    pub fn is_multipart(&self) -> bool {
        matches!(self.payload, SubmitPayload::Multipart(_))
    }
}

struct Endpoints {
    balance: Url,
    submit: Url,
    report: Url,
}

impl Endpoints {
    fn parse(raw: &ServiceEndpoints) -> CaptchaResult<Self> {
        let parse = |value: &str| {
            Url::parse(value).map_err(|err| CaptchaError::InvalidEndpoint(value.to_string(), err))
        };

        Ok(Self {
            balance: parse(&raw.balance)?,
            submit: parse(&raw.submit)?,
            report: parse(&raw.report)?,
        })
    }
}

/// Talks to a captcha solving vendor over the host's transport.
pub struct CaptchaServiceClient {
    name: String,
    transport: Arc<dyn HttpTransport>,
    credentials: Credentials,
    endpoints: Endpoints,
    decoder: Arc<dyn ResponseDecoder>,
    submit_timeout: Duration,
}

impl CaptchaServiceClient {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        credentials: Credentials,
        endpoints: &ServiceEndpoints,
    ) -> CaptchaResult<Self> {
        Ok(Self {
            name: name.into(),
            transport,
            credentials,
            endpoints: Endpoints::parse(endpoints)?,
            decoder: Arc::new(PlainTextDecoder::default()),
            submit_timeout: Duration::from_secs(DEFAULT_SUBMIT_TIMEOUT_SECS),
        })
    }

    /// Client for ImageTyperz configured from the hook settings.
    pub fn imagetyperz(
        transport: Arc<dyn HttpTransport>,
        config: &ImageTyperzConfig,
    ) -> CaptchaResult<Self> {
        Ok(
            Self::new("ImageTyperz", transport, config.credentials(), &config.endpoints)?
                .with_decoder(Arc::new(PlainTextDecoder::imagetyperz()))
                .with_submit_timeout(config.submit_timeout()),
        )
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ResponseDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Timeout of upload requests, which include the time a worker needs
    /// to solve the image.
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn fields(&self, action: &str) -> FormFields {
        form_fields([
            ("action", action),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ])
    }

    /// Build the upload request for `image`, picking the encoding from the
    /// shape of the password.
    pub fn build_submit_request(&self, image: Vec<u8>, file_name: &str) -> SubmitRequest {
        let fields = self.fields(ACTION_UPLOAD);
        let payload = if self.credentials.has_simple_password() {
            SubmitPayload::Multipart(FilePart::new("file", file_name, image))
        } else {
            SubmitPayload::Base64(BASE64.encode(image))
        };

        SubmitRequest { fields, payload }
    }

    pub async fn get_balance(&self) -> CaptchaResult<f64> {
        let response = self
            .transport
            .post_form(
                &self.endpoints.balance,
                &self.fields(ACTION_BALANCE),
                &RequestOptions::default(),
            )
            .await?;

        let body = response.text();
        let balance = self.decoder.balance(&body)?;
        log::info!("{} account balance: ${} left", self.name, body.trim());
        Ok(balance)
    }

    pub async fn submit(&self, image: &CaptchaImage) -> CaptchaResult<CaptchaSolution> {
        let bytes = image.read().await?;
        let request = self.build_submit_request(bytes, &image.file_name());
        let options = RequestOptions::with_timeout(self.submit_timeout);

        log::debug!(
            "{} uploading captcha ({})",
            self.name,
            if request.is_multipart() { "multipart" } else { "base64" }
        );

        let response = match request.payload {
            SubmitPayload::Multipart(file) => {
                self.transport
                    .post_multipart(&self.endpoints.submit, &request.fields, &file, &options)
                    .await?
            }
            SubmitPayload::Base64(encoded) => {
                let mut fields = request.fields;
                fields.push(("file".to_string(), encoded));
                self.transport
                    .post_form(&self.endpoints.submit, &fields, &options)
                    .await?
            }
        };

        self.decoder.submission(&response.text())
    }

    pub async fn report_bad(&self, ticket: &str) -> bool {
        self.refund(ticket).await.accepted
    }

    /// Request a refund for `ticket` and return the vendor's verdict along
    /// with its raw answer.
    pub async fn refund(&self, ticket: &str) -> RefundReply {
        let mut fields = self.fields(ACTION_BAD_IMAGE);
        fields.push(("imageid".to_string(), ticket.to_string()));

        let response = match self
            .transport
            .post_form(&self.endpoints.report, &fields, &RequestOptions::default())
            .await
        {
            Ok(response) => response,
            Err(err) => {
                log::error!("{} refund request for ticket {ticket} failed: {err}", self.name);
                return RefundReply {
                    accepted: false,
                    response: None,
                };
            }
        };

        let body = response.text();
        RefundReply {
            accepted: self.decoder.refund_accepted(&body),
            response: Some(body),
        }
    }
}

#[async_trait]
impl CaptchaService for CaptchaServiceClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_balance(&self) -> CaptchaResult<f64> {
        CaptchaServiceClient::get_balance(self).await
    }

    async fn submit(&self, image: &CaptchaImage) -> CaptchaResult<CaptchaSolution> {
        CaptchaServiceClient::submit(self, image).await
    }

    async fn report_bad(&self, ticket: &str) -> bool {
        CaptchaServiceClient::report_bad(self, ticket).await
    }

    async fn refund(&self, ticket: &str) -> RefundReply {
        CaptchaServiceClient::refund(self, ticket).await
    }
}

static SIMPLE_PASSWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?-u:\w)*$").expect("invalid simple password regex"));
