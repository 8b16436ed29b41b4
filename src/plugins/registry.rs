//! Lookup of plugins by URL pattern or name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::HookConfig;

use super::{
    AccountPlugin, AlldebridPlugin, FilesMailRuAccount, HosterPlugin, MegaRapidAccount,
    MultiHosterPlugin, RockfileHoster,
};

/// Collection of the plugins available to the host.
///
/// Hosters are matched in registration order; the first whose pattern
/// matches a URL wins.
#[derive(Default)]
pub struct PluginRegistry {
    hosters: Vec<Arc<dyn HosterPlugin>>,
    accounts: HashMap<&'static str, Arc<dyn AccountPlugin>>,
    multi_hosters: Vec<Arc<dyn MultiHosterPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every bundled plugin.
    pub fn with_defaults(config: &HookConfig) -> Self {
        let mut registry = Self::new();
        registry.register_hoster(Arc::new(RockfileHoster::new(config.rockfile.max_wait())));
        registry.register_account(Arc::new(MegaRapidAccount::new()));
        registry.register_account(Arc::new(FilesMailRuAccount::new()));
        registry.register_multi_hoster(Arc::new(AlldebridPlugin::new(config.alldebrid.https)));
        registry
    }

    pub fn register_hoster(&mut self, hoster: Arc<dyn HosterPlugin>) {
        log::debug!("registering hoster plugin {}", hoster.name());
        self.hosters.push(hoster);
    }

    /// Registers `account`, replacing a previous plugin with the same name.
    pub fn register_account(&mut self, account: Arc<dyn AccountPlugin>) {
        log::debug!("registering account plugin {}", account.name());
        self.accounts.insert(account.name(), account);
    }

    pub fn register_multi_hoster(&mut self, plugin: Arc<dyn MultiHosterPlugin>) {
        log::debug!("registering multi-hoster plugin {}", plugin.name());
        self.multi_hosters.push(plugin);
    }

    pub fn find_hoster(&self, url: &str) -> Option<Arc<dyn HosterPlugin>> {
        self.hosters
            .iter()
            .find(|hoster| hoster.can_handle(url))
            .cloned()
    }

    pub fn account(&self, name: &str) -> Option<Arc<dyn AccountPlugin>> {
        self.accounts.get(name).cloned()
    }

    pub fn multi_hosters(&self) -> &[Arc<dyn MultiHosterPlugin>] {
        &self.multi_hosters
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hosters: Vec<&str> = self.hosters.iter().map(|h| h.name()).collect();
        let mut accounts: Vec<&str> = self.accounts.keys().copied().collect();
        accounts.sort_unstable();
        let multi: Vec<&str> = self.multi_hosters.iter().map(|m| m.name()).collect();
        f.debug_struct("PluginRegistry")
            .field("hosters", &hosters)
            .field("accounts", &accounts)
            .field("multi_hosters", &multi)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_by_url_and_name() {
        let registry = PluginRegistry::with_defaults(&HookConfig::default());

        let hoster = registry
            .find_hoster("http://www.rockfile.eu/abcdef123456.html")
            .expect("rockfile should match");
        assert_eq!(hoster.name(), "RockfileEu");
        assert!(registry.find_hoster("https://example.com/file.zip").is_none());

        assert_eq!(registry.account("MegaRapidCz").unwrap().name(), "MegaRapidCz");
        assert_eq!(registry.account("FilesMailRu").unwrap().name(), "FilesMailRu");
        assert!(registry.account("Unknown").is_none());

        assert_eq!(registry.multi_hosters().len(), 1);
        assert_eq!(registry.multi_hosters()[0].name(), "AlldebridCom");
    }

    #[test]
    fn debug_lists_plugin_names() {
        let registry = PluginRegistry::with_defaults(&HookConfig::default());
        let rendered = format!("{registry:?}");
        assert!(rendered.contains("RockfileEu"));
        assert!(rendered.contains("FilesMailRu"));
        assert!(rendered.contains("AlldebridCom"));
    }
}
