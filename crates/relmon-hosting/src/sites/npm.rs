//! npm registry package metadata.
//!
//! The registry answers under both npmjs.org and npmjs.com, and projects on
//! the tracking service use either form.
//! See <https://github.com/npm/registry/blob/main/docs/REGISTRY-API.md>.

use super::{JSON_HEADERS, host, project_path};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

fn fetch_package(
    site: &str,
    api: &str,
    http: &HttpClient,
    url: &Url,
) -> Result<ExternalMetadata, HostingError> {
    let (_, package) = project_path(url)?;
    let data = http.get_json(&format!("{}/{}", api, package), JSON_HEADERS)?;
    let repository = data["repository"]["url"]
        .as_str()
        .or_else(|| data["repository"].as_str());
    Ok(ExternalMetadata::new(site)
        .with_homepage(data["homepage"].as_str())
        .with_repository(repository))
}

/// npmjs.org fetcher.
pub struct NpmOrg;

impl NpmOrg {
    const API: &'static str = "https://registry.npmjs.org";
}

impl SiteFetcher for NpmOrg {
    fn site(&self) -> &'static str {
        "npm"
    }

    fn display_name(&self) -> &'static str {
        "npm (npmjs.org)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "npmjs.org"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        fetch_package(self.site(), Self::API, http, url)
    }
}

/// npmjs.com fetcher.
pub struct NpmCom;

impl NpmCom {
    const API: &'static str = "https://registry.npmjs.com";
}

impl SiteFetcher for NpmCom {
    fn site(&self) -> &'static str {
        "npmjs"
    }

    fn display_name(&self) -> &'static str {
        "npm (npmjs.com)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "npmjs.com"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        fetch_package(self.site(), Self::API, http, url)
    }
}
