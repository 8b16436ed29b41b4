//! AllDebrid.com multi-hoster plugin and the hook that keeps its host list.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;

use crate::config::{AlldebridConfig, HosterListMode};
use crate::events::{EventDispatcher, HookEvent, HosterListEvent};
use crate::transport::{HttpTransport, form_fields, parse_url};

use super::{MultiHosterPlugin, PluginResult};

const API_HOST: &str = "www.alldebrid.com";
const API_PATH: &str = "/api.php";

pub struct AlldebridPlugin {
    https: bool,
    api_url: Option<String>,
}

impl AlldebridPlugin {
    pub fn new(https: bool) -> Self {
        Self {
            https,
            api_url: None,
        }
    }

    /// Query a different API endpoint instead of the public one.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn api_url(&self) -> String {
        match &self.api_url {
            Some(url) => url.clone(),
            None => {
                let scheme = if self.https { "https" } else { "http" };
                format!("{scheme}://{API_HOST}{API_PATH}")
            }
        }
    }

    /// Parse the comma separated, quoted host list returned by `get_host`.
    pub fn parse_host_list(body: &str) -> Vec<String> {
        body.replace('"', "")
            .trim()
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl MultiHosterPlugin for AlldebridPlugin {
    fn name(&self) -> &'static str {
        "AlldebridCom"
    }

    async fn hoster_list(&self, transport: &dyn HttpTransport) -> PluginResult<Vec<String>> {
        let url = parse_url(&self.api_url())?;
        let body = transport
            .get(&url, &form_fields([("action", "get_host")]))
            .await?
            .text();
        Ok(Self::parse_host_list(&body))
    }
}

struct CachedList {
    hosters: Vec<String>,
    loaded_at: Instant,
}

/// Applies the user's host selection to a multi-hoster and caches the
/// result until the reload interval elapses.
pub struct MultiHosterHook {
    plugin: Arc<dyn MultiHosterPlugin>,
    config: AlldebridConfig,
    events: Arc<EventDispatcher>,
    cache: Mutex<Option<CachedList>>,
}

impl MultiHosterHook {
    pub fn new(plugin: Arc<dyn MultiHosterPlugin>, config: AlldebridConfig) -> Self {
        Self {
            plugin,
            config,
            events: Arc::new(EventDispatcher::with_logging()),
            cache: Mutex::new(None),
        }
    }

    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    pub fn plugin_name(&self) -> &'static str {
        self.plugin.name()
    }

    /// Whether the host should hand a link back to the site's own hoster
    /// plugin after the multi-hoster failed to download it. The hook only
    /// reports the setting; retry scheduling belongs to the host.
    pub fn unload_failing(&self) -> bool {
        self.config.unload_failing
    }

    /// Restrict `hosters` to the configured selection, lowercasing names.
    pub fn filter(&self, hosters: Vec<String>) -> Vec<String> {
        let hosters = hosters
            .into_iter()
            .map(|host| host.trim().to_ascii_lowercase())
            .filter(|host| !host.is_empty());

        match self.config.hoster_list_mode {
            HosterListMode::All => hosters.collect(),
            mode => {
                let configured = self.config.configured_hosters();
                let listed = mode == HosterListMode::Listed;
                hosters
                    .filter(|host| configured.contains(host) == listed)
                    .collect()
            }
        }
    }

    /// Current host selection, fetched again once the cached copy is stale.
    pub async fn hosters(&self, transport: &dyn HttpTransport) -> PluginResult<Vec<String>> {
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }

        let hosters = self.filter(self.plugin.hoster_list(transport).await?);
        self.events.dispatch(HookEvent::HosterListLoaded(HosterListEvent {
            plugin: self.plugin.name().to_string(),
            hosters: hosters.len(),
            timestamp: Utc::now(),
        }));

        *self.lock() = Some(CachedList {
            hosters: hosters.clone(),
            loaded_at: Instant::now(),
        });
        Ok(hosters)
    }

    pub async fn supports(&self, transport: &dyn HttpTransport, host: &str) -> PluginResult<bool> {
        let host = host.trim().to_ascii_lowercase();
        Ok(self.hosters(transport).await?.contains(&host))
    }

    /// Drop the cached list so the next call reloads it.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn cached(&self) -> Option<Vec<String>> {
        let guard = self.lock();
        let cached = guard.as_ref()?;
        match self.config.reload_interval() {
            Some(interval) if cached.loaded_at.elapsed() >= interval => None,
            _ => Some(cached.hosters.clone()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedList>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
