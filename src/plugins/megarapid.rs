//! MegaRapid.cz account plugin.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::transport::{HttpTransport, RequestOptions, form_fields, parse_url};

use super::{AccountInfo, AccountPlugin, PluginError, PluginResult, Traffic, Validity};

const ACCOUNT_URL: &str = "http://megarapid.cz/mujucet/";
const LOGIN_PAGE_URL: &str = "http://megarapid.cz/prihlaseni/";
const LOGIN_POST_URL: &str = "https://megarapid.cz/prihlaseni/";

const LOGIN_FORM_MARKER: &str = "Heslo:";
const HASH_MARKER: &str = r#"id="inp_hash" name="hash" value=""#;
const HASH_LEN: usize = 32;
const VALID_UNTIL_FORMAT: &str = "%d.%m.%Y - %H:%M";
const GIB: f64 = (1u64 << 30) as f64;

/// Scrapes the MegaRapid.cz account page.
#[derive(Debug, Clone, Default)]
pub struct MegaRapidAccount;

impl MegaRapidAccount {
    pub fn new() -> Self {
        Self
    }

    /// Account status from the "my account" page.
    pub fn parse_account_page(html: &str) -> PluginResult<AccountInfo> {
        let max_parallel_downloads = LIMIT_DL_RE
            .captures(html)
            .and_then(|caps| caps[1].parse::<u32>().ok());

        if let Some(caps) = VALID_UNTIL_RE.captures(html) {
            let raw = caps[1].trim();
            let until = NaiveDateTime::parse_from_str(raw, VALID_UNTIL_FORMAT)
                .map_err(|err| PluginError::failed(format!("invalid expiry date '{raw}': {err}")))?;
            return Ok(AccountInfo {
                premium: true,
                traffic_left: Traffic::Unlimited,
                valid_until: Validity::Until(until),
                max_parallel_downloads,
            });
        }

        if let Some(caps) = TRAFFIC_LEFT_RE.captures(html) {
            let raw = caps[1].trim();
            let gib = raw
                .replace(',', ".")
                .replace(char::is_whitespace, "")
                .parse::<f64>()
                .map_err(|_| PluginError::failed(format!("invalid credit '{raw}'")))?;
            return Ok(AccountInfo {
                premium: true,
                traffic_left: Traffic::Bytes((gib * GIB) as u64),
                valid_until: Validity::Unlimited,
                max_parallel_downloads,
            });
        }

        Ok(AccountInfo {
            max_parallel_downloads,
            ..AccountInfo::free()
        })
    }

    /// Login hash embedded in the login page, if the page shows a form.
    fn login_hash(html: &str) -> PluginResult<Option<String>> {
        if !html.contains(LOGIN_FORM_MARKER) {
            return Ok(None);
        }

        let start = html
            .find(HASH_MARKER)
            .map(|index| index + HASH_MARKER.len())
            .ok_or_else(|| PluginError::failed("login hash not found"))?;
        let hash = html
            .get(start..start + HASH_LEN)
            .ok_or_else(|| PluginError::failed("login hash truncated"))?;

        Ok(Some(hash.to_string()))
    }
}

#[async_trait]
impl AccountPlugin for MegaRapidAccount {
    fn name(&self) -> &'static str {
        "MegaRapidCz"
    }

    async fn login(
        &self,
        transport: &dyn HttpTransport,
        user: &str,
        password: &str,
    ) -> PluginResult<()> {
        let page = transport.get(&parse_url(LOGIN_PAGE_URL)?, &[]).await?.text();

        let Some(hash) = Self::login_hash(&page)? else {
            log::debug!("MegaRapidCz session already logged in");
            return Ok(());
        };

        let fields = form_fields([
            ("hash", hash.as_str()),
            ("login", user),
            ("pass1", password),
            ("remember", "1"),
            ("sbmt", "Přihlásit"),
        ]);
        transport
            .post_form(&parse_url(LOGIN_POST_URL)?, &fields, &RequestOptions::default())
            .await?;
        Ok(())
    }

    async fn load_account_info(
        &self,
        transport: &dyn HttpTransport,
        _user: &str,
    ) -> PluginResult<AccountInfo> {
        let page = transport.get(&parse_url(ACCOUNT_URL)?, &[]).await?.text();
        Self::parse_account_page(&page)
    }
}

static LIMIT_DL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<td>Max. počet paralelních stahování: </td><td>(\d+)")
        .expect("invalid parallel download regex")
});

static VALID_UNTIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<td>Paušální stahování aktivní. Vyprší </td><td><strong>(.*?)</strong>")
        .expect("invalid valid-until regex")
});

static TRAFFIC_LEFT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<tr><td>Kredit</td><td>(.*?) GiB").expect("invalid traffic regex")
});
