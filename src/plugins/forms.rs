//! HTML form extraction shared by hoster and account plugins.

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};

use crate::transport::FormFields;

/// Action and fields of a form found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlForm {
    pub action: Option<String>,
    pub inputs: FormFields,
}

impl HtmlForm {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set `name` to `value`, replacing an existing field of that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.inputs.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.inputs.push((name, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Find the first `<form>` whose opening tag contains `attr_fragment`
/// verbatim (e.g. `name="F1"`) and collect its fields.
///
/// Unchecked checkboxes and radio buttons are skipped; selects contribute
/// their selected option, or the first one.
pub fn parse_html_form(html: &str, attr_fragment: &str) -> Option<HtmlForm> {
    let pattern = format!(
        r"<form(?P<attrs>[^>]*{}[^>]*)>(?P<body>.*?)</form",
        regex::escape(attr_fragment)
    );
    let form_re = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .ok()?;

    let captures = form_re.captures(html)?;
    let attrs = captures.name("attrs").map(|m| m.as_str()).unwrap_or("");
    let body = captures.name("body").map(|m| m.as_str()).unwrap_or("");

    let action = ACTION_RE.captures(attrs).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| decode_html_entities(m.as_str()).into_owned())
    });

    Some(HtmlForm {
        action,
        inputs: collect_inputs(body),
    })
}

fn collect_inputs(fragment: &str) -> FormFields {
    let document = Html::parse_fragment(fragment);
    let mut inputs = FormFields::new();

    for element in document.select(&FIELD_SELECTOR) {
        let Some(name) = element.value().attr("name") else {
            continue;
        };

        let value = match element.value().name() {
            "textarea" => element.text().collect::<String>(),
            "select" => selected_option(element),
            _ => {
                let kind = element
                    .value()
                    .attr("type")
                    .unwrap_or("text")
                    .to_ascii_lowercase();
                if matches!(kind.as_str(), "checkbox" | "radio")
                    && element.value().attr("checked").is_none()
                {
                    continue;
                }
                element.value().attr("value").unwrap_or("").to_string()
            }
        };

        inputs.push((name.to_string(), value));
    }

    inputs
}

fn selected_option(select: ElementRef<'_>) -> String {
    let mut options = select.select(&OPTION_SELECTOR).peekable();
    let first = options.peek().copied();
    options
        .find(|option| option.value().attr("selected").is_some())
        .or(first)
        .map(|option| {
            option
                .value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| option.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

static ACTION_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r#"action\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .case_insensitive(true)
        .build()
        .expect("invalid form action regex")
});

static FIELD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("input[name], textarea[name], select[name]").expect("invalid field selector")
});

static OPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("option").expect("invalid option selector"));

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <form method="POST" action="/search"><input name="q" value="x"></form>
          <form name="F1" method="POST" action=''>
            <input type="hidden" name="op" value="download2">
            <input type="hidden" name="id" value="abcdef123456">
            <input type="hidden" name="rand" value="a&amp;b">
            <input type="checkbox" name="adblock" value="1">
            <input type="radio" name="mode" value="free" checked>
            <textarea name="note">hi</textarea>
            <select name="lang"><option value="de">DE</option><option value="en" selected>EN</option></select>
            <input type="submit" value="Go">
          </form>
        </body></html>
    "#;

    #[test]
    fn picks_form_by_attribute_fragment() {
        let form = parse_html_form(PAGE, r#"name="F1""#).expect("form F1");
        assert_eq!(form.action.as_deref(), Some(""));
        assert_eq!(form.get("op"), Some("download2"));
        assert_eq!(form.get("id"), Some("abcdef123456"));
        assert_eq!(form.get("rand"), Some("a&b"));
        assert_eq!(form.get("adblock"), None);
        assert_eq!(form.get("mode"), Some("free"));
        assert_eq!(form.get("note"), Some("hi"));
        assert_eq!(form.get("lang"), Some("en"));
        assert_eq!(form.inputs.len(), 6);
    }

    #[test]
    fn matches_empty_action_literal() {
        let form = parse_html_form(PAGE, "action=''").expect("form with empty action");
        assert_eq!(form.get("op"), Some("download2"));
    }

    #[test]
    fn missing_form_yields_none() {
        assert!(parse_html_form(PAGE, r#"name="F2""#).is_none());
    }

    #[test]
    fn insert_replaces_existing_field() {
        let mut form = parse_html_form(PAGE, r#"name="F1""#).unwrap();
        form.insert("op", "download3");
        form.insert("code", "1234");
        assert_eq!(form.get("op"), Some("download3"));
        assert_eq!(form.get("code"), Some("1234"));
        assert_eq!(form.inputs.last().map(|(k, _)| k.as_str()), Some("code"));
    }
}
