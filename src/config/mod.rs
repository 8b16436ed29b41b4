//! Settings and configuration module
//!
//! Every plugin reads its settings from a plain struct with serde defaults,
//! so the host can keep them in a JSON file, build them in code, or mix
//! both through the `with_*` setters.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::captcha::Credentials;

pub const IMAGETYPERZ_BALANCE_URL: &str = "http://captchatypers.com/Forms/RequestBalance.ashx";
pub const IMAGETYPERZ_SUBMIT_URL: &str =
    "http://captchatypers.com/Forms/UploadFileAndGetTextNEW.ashx";
pub const IMAGETYPERZ_REPORT_URL: &str = "http://captchatypers.com/Forms/SetBadImage.ashx";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level configuration for all bundled plugins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    pub imagetyperz: ImageTyperzConfig,
    pub alldebrid: AlldebridConfig,
    pub rockfile: RockfileConfig,
}

impl HookConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Endpoint family of a captcha solving vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    pub balance: String,
    pub submit: String,
    pub report: String,
}

impl ServiceEndpoints {
    pub fn imagetyperz() -> Self {
        Self {
            balance: IMAGETYPERZ_BALANCE_URL.into(),
            submit: IMAGETYPERZ_SUBMIT_URL.into(),
            report: IMAGETYPERZ_REPORT_URL.into(),
        }
    }

    /// Same paths as the ImageTyperz endpoints, rooted at `base`.
    pub fn imagetyperz_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            balance: format!("{base}/Forms/RequestBalance.ashx"),
            submit: format!("{base}/Forms/UploadFileAndGetTextNEW.ashx"),
            report: format!("{base}/Forms/SetBadImage.ashx"),
        }
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self::imagetyperz()
    }
}

/// Settings of the ImageTyperz captcha hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageTyperzConfig {
    pub username: String,
    pub password: String,
    /// Leave captchas to the user while a client is connected.
    pub check_client: bool,
    pub endpoints: ServiceEndpoints,
    pub submit_timeout_secs: u64,
    pub wait_hint_secs: u64,
}

impl Default for ImageTyperzConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            check_client: true,
            endpoints: ServiceEndpoints::default(),
            submit_timeout_secs: 80,
            wait_hint_secs: 100,
        }
    }
}

impl ImageTyperzConfig {
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_check_client(mut self, check_client: bool) -> Self {
        self.check_client = check_client;
        self
    }

    pub fn with_endpoints(mut self, endpoints: ServiceEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn wait_hint(&self) -> Duration {
        Duration::from_secs(self.wait_hint_secs)
    }
}

/// Which of a multi-hoster's supported hosts should be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HosterListMode {
    #[default]
    All,
    Listed,
    Unlisted,
}

/// Settings of the AllDebrid multi-hoster hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlldebridConfig {
    pub https: bool,
    pub hoster_list_mode: HosterListMode,
    /// Comma separated host names used by the listed/unlisted modes.
    pub hoster_list: String,
    /// Fall back to the regular hoster plugin when a download fails.
    pub unload_failing: bool,
    /// Hours between host list reloads, 0 loads the list once.
    pub reload_interval_hours: u64,
}

impl Default for AlldebridConfig {
    fn default() -> Self {
        Self {
            https: false,
            hoster_list_mode: HosterListMode::All,
            hoster_list: String::new(),
            unload_failing: false,
            reload_interval_hours: 24,
        }
    }
}

impl AlldebridConfig {
    pub fn configured_hosters(&self) -> Vec<String> {
        self.hoster_list
            .split(',')
            .map(|host| host.trim().to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect()
    }

    /// `None` when periodic reloading is disabled.
    pub fn reload_interval(&self) -> Option<Duration> {
        (self.reload_interval_hours > 0)
            .then(|| Duration::from_secs(self.reload_interval_hours * 3600))
    }
}

/// Settings of the Rockfile.eu hoster plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RockfileConfig {
    /// Longest countdown, in minutes, the plugin sits through before
    /// handing the download back to the host.
    pub max_wait_minutes: u64,
}

impl Default for RockfileConfig {
    fn default() -> Self {
        Self {
            max_wait_minutes: 10,
        }
    }
}

impl RockfileConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_minutes * 60)
    }
}
