//! Vendor response decoding.
//!
//! Solving services answer with short plain-text bodies. Decoding is kept
//! apart from the request logic in [`super::CaptchaServiceClient`].

use super::{CaptchaError, CaptchaResult, CaptchaSolution};

/// Turns raw vendor response bodies into typed results.
pub trait ResponseDecoder: Send + Sync {
    fn balance(&self, body: &str) -> CaptchaResult<f64>;

    fn submission(&self, body: &str) -> CaptchaResult<CaptchaSolution>;

    fn refund_accepted(&self, body: &str) -> bool;
}

/// Decoder for `ERROR...` / `ticket|text` / `SUCCESS` style vendors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainTextDecoder {
    error_prefix: &'static str,
    success_marker: &'static str,
    separator: char,
}

impl PlainTextDecoder {
    pub const fn new(
        error_prefix: &'static str,
        success_marker: &'static str,
        separator: char,
    ) -> Self {
        Self {
            error_prefix,
            success_marker,
            separator,
        }
    }

    /// Markers used by ImageTyperz (captchatypers.com).
    pub const fn imagetyperz() -> Self {
        Self::new("ERROR", "SUCCESS", '|')
    }

    fn reject_error(&self, body: &str) -> CaptchaResult<()> {
        if body.starts_with(self.error_prefix) {
            return Err(CaptchaError::Service(body.to_string()));
        }
        Ok(())
    }
}

impl Default for PlainTextDecoder {
    fn default() -> Self {
        Self::imagetyperz()
    }
}

impl ResponseDecoder for PlainTextDecoder {
    fn balance(&self, body: &str) -> CaptchaResult<f64> {
        self.reject_error(body)?;
        body.trim()
            .parse::<f64>()
            .map_err(|_| CaptchaError::Service("Invalid response".into()))
    }

    fn submission(&self, body: &str) -> CaptchaResult<CaptchaSolution> {
        self.reject_error(body)?;
        let parts: Vec<&str> = body.split(self.separator).collect();
        match parts.as_slice() {
            [ticket, text] => Ok(CaptchaSolution::new(*ticket, *text)),
            _ => Err(CaptchaError::Service(format!("Unknown response: {body}"))),
        }
    }

    fn refund_accepted(&self, body: &str) -> bool {
        body == self.success_marker
    }
}
