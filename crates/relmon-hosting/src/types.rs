//! Core types for project metadata lookups.

use crate::http::HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Project links declared by an external site.
///
/// This is the raw result of a single lookup on one site. It is never fed
/// back into another lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMetadata {
    /// Site identifier of the fetcher that produced this (e.g. "github").
    pub site: String,
    /// Homepage the site claims for the project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Source repository the site claims for the project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Other project links (documentation, downloads, pages sites).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

impl ExternalMetadata {
    pub fn new(site: &str) -> Self {
        Self {
            site: site.to_string(),
            ..Default::default()
        }
    }

    /// Build from an unordered list of links; blank entries are dropped.
    pub fn from_links<I, S>(site: &str, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut meta = Self::new(site);
        for link in links {
            meta.push_link(link.into());
        }
        meta
    }

    pub fn with_homepage(mut self, homepage: Option<&str>) -> Self {
        self.homepage = non_blank(homepage);
        self
    }

    pub fn with_repository(mut self, repository: Option<&str>) -> Self {
        self.repository = non_blank(repository);
        self
    }

    /// Add a link unless it is blank or already present.
    pub fn push_link(&mut self, link: String) {
        let link = link.trim().to_string();
        if link.is_empty() || link == "UNKNOWN" || self.links.contains(&link) {
            return;
        }
        self.links.push(link);
    }

    /// All claimed URLs: homepage, repository, then other links, deduplicated.
    pub fn urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        let all = self
            .homepage
            .iter()
            .chain(self.repository.iter())
            .chain(self.links.iter());
        for url in all {
            if !urls.contains(&url.as_str()) {
                urls.push(url);
            }
        }
        urls
    }

    pub fn is_empty(&self) -> bool {
        self.homepage.is_none() && self.repository.is_none() && self.links.is_empty()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "UNKNOWN")
        .map(String::from)
}

/// Errors that can occur while talking to external sites.
#[derive(Debug, Error)]
pub enum HostingError {
    /// Network failure or timeout.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },
    /// The site kept answering 429 after all retries.
    #[error("rate limited by {host}")]
    RateLimited { host: String },
    /// Credentials missing or rejected.
    #[error("authentication failed for {url} (HTTP {code})")]
    Auth { url: String, code: u16 },
    /// The resource does not exist.
    #[error("not found: {url}")]
    NotFound { url: String },
    /// Any other unexpected HTTP status.
    #[error("HTTP {code} from {url}")]
    Status { url: String, code: u16 },
    /// The response body could not be understood.
    #[error("parse error: {0}")]
    Parse(String),
    /// A URL path component contains characters we refuse to forward.
    #[error("unsafe path component {0:?}")]
    UnsafePath(String),
    /// The URL could not be parsed or lacks the expected parts.
    #[error("unsupported URL {0:?}")]
    InvalidUrl(String),
}

impl HostingError {
    /// Whether this error is a rate-limit condition rather than a failure.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl From<serde_json::Error> for HostingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<quick_xml::DeError> for HostingError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Trait for site-specific metadata fetchers.
///
/// Each implementation knows how to turn a project page URL on one site
/// into the homepage and repository links that site declares.
pub trait SiteFetcher: Send + Sync {
    /// Site identifier (e.g. "github", "pypi").
    fn site(&self) -> &'static str;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// Whether this fetcher understands the given canonical project URL.
    fn can_handle(&self, url: &Url) -> bool;

    /// Fetch the project links for a URL this fetcher can handle.
    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError>;
}
