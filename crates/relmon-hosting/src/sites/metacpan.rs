//! MetaCPAN distribution metadata.
//!
//! See <https://github.com/metacpan/metacpan-api/blob/master/docs/API-docs.md>.

use super::{JSON_HEADERS, host, project_path};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

/// MetaCPAN fetcher.
pub struct MetaCpan;

impl MetaCpan {
    const API: &'static str = "https://fastapi.metacpan.org/v1";
}

impl SiteFetcher for MetaCpan {
    fn site(&self) -> &'static str {
        "metacpan"
    }

    fn display_name(&self) -> &'static str {
        "MetaCPAN (Perl)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "metacpan.org"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let (_, dist) = project_path(url)?;
        let data = http.get_json(&format!("{}/release/{}", Self::API, dist), JSON_HEADERS)?;
        let resources = &data["resources"];
        Ok(ExternalMetadata::new(self.site())
            .with_homepage(resources["homepage"].as_str())
            .with_repository(resources["repository"]["web"].as_str()))
    }
}
