//! Rockfile.eu hoster plugin.
//!
//! Free downloads go through two forms. The second one is protected by a
//! text captcha rendered as individually positioned `<span>` digits, which
//! is decoded locally; pages showing a ReCaptcha instead are rejected.

use std::time::Duration;

use async_trait::async_trait;
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use url::Url;

use crate::transport::{HttpTransport, RequestOptions, parse_url};

use super::{
    DownloadLink, HosterPlugin, HtmlForm, PluginError, PluginResult, parse_html_form,
};

const COOKIE_URL: &str = "http://rockfile.eu/";
const LANGUAGE_COOKIE: &str = "lang=english; Domain=rockfile.eu; Path=/";
const LINK_READY_MARKER: &str = "> Preparing download link ...<";
/// Upper bound of leading `0` characters dropped from a decoded captcha.
const MAX_LEADING_ZEROS: usize = 2;

pub struct RockfileHoster {
    max_wait: Duration,
}

impl RockfileHoster {
    pub fn new(max_wait: Duration) -> Self {
        Self { max_wait }
    }

    /// Decode the span captcha: characters ordered by their `padding-left`
    /// offset, entity-encoded digits resolved, up to two leading zeros
    /// dropped. `None` when the page carries no such captcha.
    pub fn decode_span_captcha(html: &str) -> Option<String> {
        let mut glyphs: Vec<(u32, String)> = CAPTCHA_SPAN_RE
            .captures_iter(html)
            .filter_map(|caps| {
                let offset = caps[1].parse::<u32>().ok()?;
                Some((offset, decode_html_entities(&caps[2]).into_owned()))
            })
            .collect();
        glyphs.sort_by_key(|(offset, _)| *offset);

        let code: String = glyphs.into_iter().map(|(_, glyph)| glyph).collect();
        if code.is_empty() {
            return None;
        }

        Some(strip_leading_zeros(&code, MAX_LEADING_ZEROS).to_string())
    }

    /// Pull the file identifier out of a page URL.
    pub fn file_id(url: &str) -> Option<String> {
        FILE_URL_RE
            .captures(url)
            .and_then(|caps| caps.name("ID"))
            .map(|m| m.as_str().to_string())
    }

    async fn check_errors(&self, html: &str) -> PluginResult<()> {
        if let Some(caps) = DL_LIMIT_RE.captures(html) {
            return Err(PluginError::DownloadLimit(caps[1].trim().to_string()));
        }

        if TEMP_OFFLINE_RE.is_match(html) {
            return Err(PluginError::TempOffline);
        }

        if let Some(seconds) = WAIT_RE
            .captures(html)
            .and_then(|caps| caps[1].parse::<u64>().ok())
        {
            let wait = Duration::from_secs(seconds);
            if wait > self.max_wait {
                return Err(PluginError::WaitTooLong(wait));
            }
            log::info!("RockfileEu countdown, waiting {seconds}s");
            tokio::time::sleep(wait).await;
        }

        Ok(())
    }

    async fn submit_form(
        transport: &dyn HttpTransport,
        url: &Url,
        form: &HtmlForm,
    ) -> PluginResult<String> {
        Ok(transport
            .post_form(url, &form.inputs, &RequestOptions::default())
            .await?
            .text())
    }
}

impl Default for RockfileHoster {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

#[async_trait]
impl HosterPlugin for RockfileHoster {
    fn name(&self) -> &'static str {
        "RockfileEu"
    }

    fn pattern(&self) -> &Regex {
        &FILE_URL_RE
    }

    async fn handle_free(
        &self,
        transport: &dyn HttpTransport,
        url: &Url,
    ) -> PluginResult<DownloadLink> {
        transport.add_cookie(&parse_url(COOKIE_URL)?, LANGUAGE_COOKIE);

        let page = transport.get(url, &[]).await?.text();
        let name = NAME_RE.captures(&page).map(|caps| caps[1].to_string());
        let size = SIZE_RE
            .captures(&page)
            .and_then(|caps| caps[1].parse::<u64>().ok());

        let free_form = parse_html_form(&page, "action=''")
            .filter(|form| !form.is_empty())
            .ok_or_else(|| PluginError::failed("Free download form not found"))?;
        let page = Self::submit_form(transport, url, &free_form).await?;
        self.check_errors(&page).await?;

        let mut captcha_form = parse_html_form(&page, r#"name="F1""#)
            .filter(|form| !form.is_empty())
            .ok_or_else(|| PluginError::failed("Form F1 not found"))?;

        if RECAPTCHA_KEY_RE.is_match(&page) {
            return Err(PluginError::CaptchaUnsupported("ReCaptcha"));
        }

        let code = Self::decode_span_captcha(&page)
            .ok_or_else(|| PluginError::failed("Captcha not found"))?;
        log::debug!("RockfileEu decoded captcha {code}");
        captcha_form.insert("code", code);

        let page = Self::submit_form(transport, url, &captcha_form).await?;
        if !page.contains(LINK_READY_MARKER) {
            return Err(PluginError::CaptchaRejected);
        }

        let link = LINK_FREE_RE
            .captures(&page)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| PluginError::failed("Free download link not found"))?;
        let link = parse_url(&link)?;

        let name = name.or_else(|| {
            link.path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .and_then(|segment| urlencoding::decode(segment).ok())
                .map(|decoded| decoded.into_owned())
        });

        Ok(DownloadLink {
            url: link,
            name,
            size,
        })
    }
}

fn strip_leading_zeros(code: &str, max: usize) -> &str {
    let mut rest = code;
    for _ in 0..max {
        match rest.strip_prefix('0') {
            Some(stripped) => rest = stripped,
            None => break,
        }
    }
    rest
}

static FILE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?rockfile\.eu/(?P<ID>\w{12}).html")
        .expect("invalid rockfile url regex")
});

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="fname" value="(.+?)""#).expect("invalid name regex"));

static SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var iniFileSize = (\d+)").expect("invalid size regex"));

static WAIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div id="countdown_str".+?>\s*.+?<span id=".+?">(\d+)</span>"#)
        .expect("invalid countdown regex")
});

static DL_LIMIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"You have to wait (?:<b>)?(.+?)(?:</b>)? until you can start another download")
        .expect("invalid download limit regex")
});

static TEMP_OFFLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Connection limit reached|Server error").expect("invalid offline regex")
});

static LINK_FREE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(http://.+?\.rfservers\.eu.+?)""#).expect("invalid free link regex")
});

static CAPTCHA_SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<span style=['"]color:#5d5d5d; text-shadow: 1px 1px #f2f2f2;.+?padding-left:(\d+)px;.+?['"]>(.+?)</span>"#,
    )
    .expect("invalid captcha span regex")
});

static RECAPTCHA_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r#"(?:data-sitekey=["']|recaptcha(?:/api|\.net)/(?:challenge|noscript)\?k=|Recaptcha\.create\s*\(\s*["'])[\w-]+"#,
    )
    .case_insensitive(true)
    .build()
    .expect("invalid recaptcha key regex")
});
