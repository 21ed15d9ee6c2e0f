//! Minimal HTML scanning for pages that offer no API.
//!
//! Only what the screen-scraping fetchers and the refresh-tag check need:
//! anchors with their attributes and text, table rows, and meta tags in
//! the document head. Not a general HTML parser.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap());
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static ROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<tr\b.*?</tr\s*>").unwrap());
static TH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<th\b[^>]*>(.*?)</th\s*>").unwrap());
static HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<head\b[^>]*>(.*?)(?:</head\s*>|<body\b|$)").unwrap());
static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").unwrap());

/// An `<a>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub attrs: HashMap<String, String>,
    pub text: String,
}

impl Anchor {
    pub fn href(&self) -> Option<&str> {
        self.attrs.get("href").map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attrs
            .get("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }
}

/// Parse the attributes of a tag body into lowercase keys.
pub fn parse_attrs(tag_body: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(tag_body)
        .map(|caps| {
            let key = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| unescape(m.as_str()))
                .unwrap_or_default();
            (key, value)
        })
        .collect()
}

/// All anchors in document order.
pub fn anchors(html: &str) -> Vec<Anchor> {
    ANCHOR_RE
        .captures_iter(html)
        .map(|caps| Anchor {
            attrs: parse_attrs(&caps[1]),
            text: text_content(&caps[2]),
        })
        .collect()
}

/// Text of an HTML fragment with tags removed and whitespace collapsed.
pub fn text_content(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    unescape(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Table rows as (header text, anchors in the row).
pub fn table_rows(html: &str) -> Vec<(String, Vec<Anchor>)> {
    ROW_RE
        .find_iter(html)
        .filter_map(|row| {
            let row = row.as_str();
            let header = TH_RE.captures(row)?;
            Some((text_content(&header[1]), anchors(row)))
        })
        .collect()
}

/// Attributes of every `<meta>` tag inside `<head>`.
pub fn head_meta(html: &str) -> Vec<HashMap<String, String>> {
    let Some(head) = HEAD_RE.captures(html) else {
        return Vec::new();
    };
    META_RE
        .captures_iter(&head[1])
        .map(|caps| parse_attrs(&caps[1]))
        .collect()
}

fn unescape(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors_with_classes() {
        let html = r#"<p><a class="tabs selected" href="https://example.org/">
            Homepage </a><a href='/other'>Other <b>page</b></a></p>"#;
        let found = anchors(html);
        assert_eq!(found.len(), 2);
        assert!(found[0].has_class("tabs"));
        assert_eq!(found[0].href(), Some("https://example.org/"));
        assert_eq!(found[0].text, "Homepage");
        assert!(!found[1].has_class("tabs"));
        assert_eq!(found[1].text, "Other page");
    }

    #[test]
    fn test_table_rows() {
        let html = r#"<table>
            <tr><th>Homepage</th><td><a href="https://x.example/">x</a></td></tr>
            <tr><td>no header</td></tr>
            <tr><th>Source  [http]</th><td><a href="https://x.example/x.tgz">tgz</a></td></tr>
        </table>"#;
        let rows = table_rows(html);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "Homepage");
        assert_eq!(rows[1].0, "Source [http]");
        assert_eq!(rows[1].1[0].href(), Some("https://x.example/x.tgz"));
    }

    #[test]
    fn test_head_meta_ignores_body() {
        let html = r#"<html><head><META HTTP-EQUIV="Refresh" content="0; url=/new"></head>
            <body><meta http-equiv="refresh" content="0; url=/wrong"></body></html>"#;
        let metas = head_meta(html);
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0]["http-equiv"], "Refresh");
        assert_eq!(metas[0]["content"], "0; url=/new");
    }

    #[test]
    fn test_unescape_attr() {
        let attrs = parse_attrs(r#"href="/a?x=1&amp;y=2" data-x=plain"#);
        assert_eq!(attrs["href"], "/a?x=1&y=2");
        assert_eq!(attrs["data-x"], "plain");
    }
}
