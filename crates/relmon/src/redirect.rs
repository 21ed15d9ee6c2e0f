//! Redirect resolution for input URLs.
//!
//! Redirects are followed by hand so that the hop count stays bounded and
//! `<meta http-equiv="refresh">` pages count as redirects too. Resolution
//! is best effort: any failure yields the input URL unchanged.

use regex::Regex;
use relmon_hosting::{HostingError, HttpClient, html};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};
use tracing::{debug, warn};
use url::Url;

/// Most redirects followed for one URL.
pub const MAX_HOPS: usize = 5;

/// Largest page fetched to look for a refresh tag.
pub const REFRESH_SIZE_MAX: u64 = 2000;

static REFRESH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*\d+\s*;\s*url\s*=\s*(.*?)\s*$").unwrap());

/// Maps a URL to where it finally leads.
pub trait RedirectResolver: Send + Sync {
    fn resolve(&self, url: &str) -> String;
}

/// Resolver for when redirect checking is disabled.
pub struct NoRedirects;

impl RedirectResolver for NoRedirects {
    fn resolve(&self, url: &str) -> String {
        url.to_string()
    }
}

/// Resolver that asks the web server, caching answers for the run.
pub struct HttpRedirectResolver {
    http: Arc<HttpClient>,
    cache: RwLock<HashMap<String, String>>,
}

impl HttpRedirectResolver {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The URL this one redirects to, if any.
    fn next_hop(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }

        let response = match self.http.head(url) {
            Ok(response) => response,
            Err(err) => {
                debug!(%url, error = %err, "redirect check failed");
                return None;
            }
        };
        if response.is_redirect() {
            return join(&parsed, response.location.as_deref()?);
        }
        if response.status != 200 {
            debug!(%url, status = response.status, "unexpected redirect check status");
            return None;
        }

        // A small page might hold a meta refresh.
        if response.content_length? > REFRESH_SIZE_MAX {
            return None;
        }
        debug!(%url, "downloading page to look for a refresh tag");
        let page = self.http.get_raw(url).ok().filter(|r| r.status == 200)?;
        join(&parsed, &refresh_target(&page.body)?)
    }
}

impl RedirectResolver for HttpRedirectResolver {
    fn resolve(&self, url: &str) -> String {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned();
        if let Some(resolved) = cached {
            return resolved;
        }
        let resolved = follow_redirects(url, |current| self.next_hop(current));
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), resolved.clone());
        resolved
    }
}

/// Follow `next_hop` from `url` until it stops, giving up after
/// [`MAX_HOPS`]. Loops and long chains resolve to `url` itself.
fn follow_redirects(url: &str, mut next_hop: impl FnMut(&str) -> Option<String>) -> String {
    let mut current = url.to_string();
    let mut hops = 0;
    while let Some(next) = next_hop(&current) {
        if hops == MAX_HOPS {
            warn!(%url, hops, "too many redirects, using the original URL");
            return url.to_string();
        }
        debug!(from = %current, to = %next, "redirected");
        current = next;
        hops += 1;
    }
    current
}

fn join(base: &Url, location: &str) -> Option<String> {
    match base.join(location) {
        Ok(url) => Some(url.to_string()),
        Err(err) => {
            debug!(%base, location, error = %err, "bad redirect location");
            None
        }
    }
}

/// Target of a `<meta http-equiv="refresh">` tag in the document head.
pub fn refresh_target(page: &str) -> Option<String> {
    html::head_meta(page).into_iter().find_map(|meta| {
        let is_refresh = meta
            .get("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("refresh"));
        if !is_refresh {
            return None;
        }
        let content = meta.get("content")?;
        let target = REFRESH_RE.captures(content)?.get(1)?.as_str();
        (!target.is_empty()).then(|| target.to_string())
    })
}

/// Whether a URL answers with a non-error status.
pub fn check_reachable(http: &HttpClient, url: &str) -> bool {
    answers(
        url,
        || http.head(url).map(|r| r.status),
        || http.get_raw(url).map(|r| r.status),
    )
}

/// HEAD first, falling back to GET for servers that refuse HEAD.
fn answers(
    url: &str,
    head: impl FnOnce() -> Result<u16, HostingError>,
    get: impl FnOnce() -> Result<u16, HostingError>,
) -> bool {
    let status = match head() {
        Err(HostingError::Status { code: 405, .. }) => {
            debug!(%url, "HEAD not allowed, trying GET");
            get()
        }
        other => other,
    };
    match status {
        Ok(status) => status < 400,
        Err(err) => {
            debug!(%url, error = %err, "URL is not reachable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_target() {
        let page = r#"<html><head><title>Moved</title>
            <meta http-equiv="Refresh" content="0; url=https://new.example/proj/">
            </head><body>moved</body></html>"#;
        assert_eq!(refresh_target(page).as_deref(), Some("https://new.example/proj/"));
    }

    #[test]
    fn test_refresh_target_relative_and_spacing() {
        let page = r#"<head><meta http-equiv=refresh content=" 5 ; URL = /elsewhere "></head>"#;
        assert_eq!(refresh_target(page).as_deref(), Some("/elsewhere"));
    }

    #[test]
    fn test_refresh_outside_head_is_ignored() {
        let page = r#"<html><head></head><body>
            <meta http-equiv="refresh" content="0; url=https://x.example/"></body></html>"#;
        assert_eq!(refresh_target(page), None);
        assert_eq!(refresh_target("<head><meta charset=utf-8></head>"), None);
    }

    #[test]
    fn test_join_relative_location() {
        let base = Url::parse("https://example.org/a/b").unwrap();
        assert_eq!(join(&base, "/c").as_deref(), Some("https://example.org/c"));
        assert_eq!(
            join(&base, "https://other.example/").as_deref(),
            Some("https://other.example/")
        );
    }

    #[test]
    fn test_no_redirects_is_identity() {
        assert_eq!(NoRedirects.resolve("https://x.example/"), "https://x.example/");
    }

    #[test]
    fn test_non_http_urls_resolve_to_themselves() {
        let resolver = HttpRedirectResolver::new(Arc::new(HttpClient::new()));
        assert_eq!(resolver.resolve("ftp://ftp.example.org/pub/"), "ftp://ftp.example.org/pub/");
        assert_eq!(resolver.resolve("not a url"), "not a url");
    }

    #[test]
    fn test_redirect_chain_is_followed() {
        let hops = HashMap::from([
            ("https://a.example/", "https://b.example/"),
            ("https://b.example/", "https://c.example/"),
        ]);
        let resolved = follow_redirects("https://a.example/", |u| hops.get(u).map(|n| n.to_string()));
        assert_eq!(resolved, "https://c.example/");
    }

    #[test]
    fn test_redirect_loop_gives_up() {
        let mut calls = 0;
        let resolved = follow_redirects("https://a.example/", |u| {
            calls += 1;
            let next = match u {
                "https://a.example/" => "https://b.example/",
                _ => "https://a.example/",
            };
            Some(next.to_string())
        });
        assert_eq!(resolved, "https://a.example/");
        assert_eq!(calls, MAX_HOPS + 1);
    }

    #[test]
    fn test_redirect_hop_limit() {
        let chain = |len: usize| {
            follow_redirects("https://x.example/0", move |u| {
                let n: usize = u.rsplit('/').next()?.parse().ok()?;
                (n < len).then(|| format!("https://x.example/{}", n + 1))
            })
        };
        assert_eq!(chain(MAX_HOPS), format!("https://x.example/{}", MAX_HOPS));
        assert_eq!(chain(MAX_HOPS + 1), "https://x.example/0");
    }

    #[test]
    fn test_head_refused_falls_back_to_get() {
        let refused = || -> Result<u16, HostingError> {
            Err(HostingError::Status {
                url: "https://x.example/".into(),
                code: 405,
            })
        };
        assert!(answers("https://x.example/", refused, || Ok(200)));
        assert!(!answers("https://x.example/", refused, || Ok(500)));

        let missing = || -> Result<u16, HostingError> {
            Err(HostingError::NotFound {
                url: "https://x.example/".into(),
            })
        };
        assert!(!answers("https://x.example/", missing, || panic!("GET after a 404")));
        assert!(answers("https://x.example/", || Ok(204), || panic!("GET after a good HEAD")));
    }

    #[cfg(feature = "test-network")]
    #[test]
    fn test_real_redirect() {
        let resolver = HttpRedirectResolver::new(Arc::new(HttpClient::new()));
        let resolved = resolver.resolve("http://github.com/curl/curl");
        assert_eq!(resolved, "https://github.com/curl/curl");
    }
}
