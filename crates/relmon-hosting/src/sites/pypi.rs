//! PyPI project metadata.
//!
//! See <https://docs.pypi.org/api/json/>.

use super::{JSON_HEADERS, host, project_path};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

/// PyPI project fetcher.
pub struct Pypi;

impl Pypi {
    const API: &'static str = "https://pypi.org/pypi";

    /// `project_urls` keys seen in the wild, in preference order.
    const PROJECT_URL_KEYS: &'static [&'static str] = &[
        "home_page",
        "homepage",
        "Home-page",
        "Home",
        "download_url",
        "documentation",
        "download",
        "Homepage",
        "Download",
        "Docs",
        "Documentation",
        "Source Code",
        "Source",
        "Sources",
        "source",
        "GitHub: repo",
        "repository",
        "Repository",
        "Code",
    ];

    fn parse(site: &str, data: &serde_json::Value) -> ExternalMetadata {
        let info = &data["info"];
        let mut meta = ExternalMetadata::new(site).with_homepage(info["home_page"].as_str());
        if let Some(download) = info["download_url"].as_str() {
            meta.push_link(download.to_string());
        }
        if let Some(project_urls) = info["project_urls"].as_object() {
            for key in Self::PROJECT_URL_KEYS {
                if let Some(link) = project_urls.get(*key).and_then(|v| v.as_str()) {
                    meta.push_link(link.to_string());
                }
            }
        }
        meta
    }
}

impl SiteFetcher for Pypi {
    fn site(&self) -> &'static str {
        "pypi"
    }

    fn display_name(&self) -> &'static str {
        "PyPI (Python)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "pypi.org"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let (_, project) = project_path(url)?;
        let data = http.get_json(&format!("{}/{}/json", Self::API, project), JSON_HEADERS)?;
        Ok(Self::parse(self.site(), &data))
    }
}
