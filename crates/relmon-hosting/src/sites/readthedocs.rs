//! Read the Docs project metadata.
//!
//! See <https://docs.readthedocs.com/platform/stable/api/v3.html>.

use super::{JSON_HEADERS, host, safe_segment};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

/// `<project>.readthedocs.(io|org)` fetcher.
pub struct ReadTheDocs;

impl ReadTheDocs {
    const API: &'static str = "https://app.readthedocs.org/api/v3";

    fn project(url: &Url) -> Result<String, HostingError> {
        let domain = host(url);
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() != 3 {
            return Err(HostingError::InvalidUrl(url.to_string()));
        }
        Ok(safe_segment(labels[0])?.to_string())
    }
}

impl SiteFetcher for ReadTheDocs {
    fn site(&self) -> &'static str {
        "readthedocs"
    }

    fn display_name(&self) -> &'static str {
        "Read the Docs"
    }

    fn can_handle(&self, url: &Url) -> bool {
        let domain = host(url);
        domain.ends_with(".readthedocs.io") || domain.ends_with(".readthedocs.org")
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let project = Self::project(url)?;
        let data = http.get_json(&format!("{}/projects/{}/", Self::API, project), JSON_HEADERS)?;
        let repository = data["repository"]["url"]
            .as_str()
            .map(|r| r.strip_suffix(".git").unwrap_or(r));
        Ok(ExternalMetadata::new(self.site())
            .with_homepage(data["homepage"].as_str())
            .with_repository(repository))
    }
}
