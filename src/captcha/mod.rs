//! Captcha solving service integration.
//!
//! A [`CaptchaTaskController`] decides whether a host-created
//! [`CaptchaTask`] should be forwarded to a paid solving service, claims it,
//! and drives the submission on a background task. The wire protocol lives
//! in [`CaptchaServiceClient`]; vendor response formats are isolated behind
//! [`ResponseDecoder`] so another vendor only needs a decoder and a set of
//! endpoints.

mod client;
mod controller;
mod decoder;
mod task;

pub use client::{CaptchaServiceClient, Credentials, SubmitPayload, SubmitRequest};
pub use controller::{CaptchaTaskController, DeclineReason, HandleOutcome, HostState};
pub use decoder::{PlainTextDecoder, ResponseDecoder};
pub use task::{CaptchaImage, CaptchaTask, SERVICE_KEY, TICKET_KEY, TaskKind, TaskStatus};

use async_trait::async_trait;
use thiserror::Error;

use crate::transport::TransportError;

/// Ticket and text returned by a solving service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaSolution {
    pub ticket: String,
    pub text: String,
}

impl CaptchaSolution {
    pub fn new(ticket: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            ticket: ticket.into(),
            text: text.into(),
        }
    }
}

/// Vendor answer to a refund request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReply {
    pub accepted: bool,
    /// Raw response body, `None` when the request never got an answer.
    pub response: Option<String>,
}

/// Common result type returned by captcha services.
pub type CaptchaResult<T> = Result<T, CaptchaError>;

/// Shared interface implemented by captcha solving vendors.
#[async_trait]
pub trait CaptchaService: Send + Sync {
    /// Identifier written onto tasks this service claims.
    fn name(&self) -> &str;

    /// Remaining account credit.
    async fn get_balance(&self) -> CaptchaResult<f64>;

    /// Upload an image and wait for its solution.
    async fn submit(&self, image: &CaptchaImage) -> CaptchaResult<CaptchaSolution>;

    /// Ask for a refund of a wrong solution. Best effort: failures are
    /// logged and reported as `false`.
    async fn report_bad(&self, ticket: &str) -> bool;

    /// Same request as [`Self::report_bad`], keeping the vendor's answer.
    async fn refund(&self, ticket: &str) -> RefundReply {
        RefundReply {
            accepted: self.report_bad(ticket).await,
            response: None,
        }
    }
}

/// Errors surfaced by captcha services.
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// The vendor answered with an error marker or an unknown response.
    #[error("captcha service error: {0}")]
    Service(String),
    #[error("captcha transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("failed to read captcha image: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid captcha service endpoint '{0}': {1}")]
    InvalidEndpoint(String, #[source] url::ParseError),
}

impl CaptchaError {
    /// Code stored on a failed task: the raw vendor message for service
    /// errors, the display text for everything else.
    pub fn code(&self) -> String {
        match self {
            CaptchaError::Service(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_code_is_raw_message() {
        let err = CaptchaError::Service("ERROR: INVALID_LOGIN".into());
        assert_eq!(err.code(), "ERROR: INVALID_LOGIN");
    }

    #[test]
    fn transport_error_code_is_display_text() {
        let err = CaptchaError::from(TransportError::Timeout("http://x/".into()));
        assert_eq!(
            err.code(),
            "captcha transport failed: request to http://x/ timed out"
        );
    }
}
