//! Per-site plugins.
//!
//! Each plugin is a stateless strategy object for one website. Account
//! plugins log in and scrape quota pages, hoster plugins turn a file page
//! into a direct link, and multi-hoster plugins report which hosts an
//! aggregator can download from. The host hands every call the transport
//! (session) to use.

pub mod alldebrid;
pub mod filesmailru;
pub mod forms;
pub mod megarapid;
mod registry;
pub mod rockfile;

pub use alldebrid::{AlldebridPlugin, MultiHosterHook};
pub use filesmailru::FilesMailRuAccount;
pub use forms::{HtmlForm, parse_html_form};
pub use megarapid::MegaRapidAccount;
pub use registry::PluginRegistry;
pub use rockfile::RockfileHoster;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::transport::{HttpTransport, TransportError};

/// Remaining download traffic of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traffic {
    Unknown,
    Unlimited,
    Bytes(u64),
}

/// How long an account stays premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Unknown,
    Unlimited,
    /// Site-local wall clock time.
    Until(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub premium: bool,
    pub traffic_left: Traffic,
    pub valid_until: Validity,
    pub max_parallel_downloads: Option<u32>,
}

impl AccountInfo {
    /// Free account with nothing known about quota or validity.
    pub fn free() -> Self {
        Self {
            premium: false,
            traffic_left: Traffic::Unknown,
            valid_until: Validity::Unknown,
            max_parallel_downloads: None,
        }
    }
}

/// Direct download resolved by a hoster plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub url: Url,
    pub name: Option<String>,
    pub size: Option<u64>,
}

pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("wrong username or password")]
    WrongPassword,
    #[error("invalid username '{0}'")]
    InvalidUsername(String),
    #[error("{0}")]
    Failed(String),
    #[error("download limit reached, wait {0}")]
    DownloadLimit(String),
    #[error("hoster is temporarily offline")]
    TempOffline,
    #[error("waiting time of {0:?} exceeds the configured maximum")]
    WaitTooLong(Duration),
    #[error("{0} captchas are not supported")]
    CaptchaUnsupported(&'static str),
    #[error("captcha solution was rejected")]
    CaptchaRejected,
    #[error("{0} does not support this operation")]
    NotSupported(&'static str),
}

impl PluginError {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        PluginError::Failed(message.into())
    }
}

/// Login and account status scraping for one site.
#[async_trait]
pub trait AccountPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    async fn login(
        &self,
        transport: &dyn HttpTransport,
        user: &str,
        password: &str,
    ) -> PluginResult<()>;

    async fn load_account_info(
        &self,
        transport: &dyn HttpTransport,
        user: &str,
    ) -> PluginResult<AccountInfo>;
}

/// Turns file pages of one site into direct download links.
#[async_trait]
pub trait HosterPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pattern matched against file page URLs.
    fn pattern(&self) -> &Regex;

    fn can_handle(&self, url: &str) -> bool {
        self.pattern().is_match(url)
    }

    async fn handle_free(
        &self,
        transport: &dyn HttpTransport,
        url: &Url,
    ) -> PluginResult<DownloadLink>;

    async fn handle_premium(
        &self,
        _transport: &dyn HttpTransport,
        _url: &Url,
    ) -> PluginResult<DownloadLink> {
        Err(PluginError::NotSupported(self.name()))
    }
}

/// Aggregator that downloads from other hosters on the user's behalf.
#[async_trait]
pub trait MultiHosterPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    async fn hoster_list(&self, transport: &dyn HttpTransport) -> PluginResult<Vec<String>>;
}
