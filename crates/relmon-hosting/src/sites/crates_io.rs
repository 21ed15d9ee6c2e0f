//! crates.io crate metadata.

use super::{JSON_HEADERS, host, project_path};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

/// crates.io fetcher.
pub struct CratesIo;

impl CratesIo {
    const API: &'static str = "https://crates.io/api/v1";
}

impl SiteFetcher for CratesIo {
    fn site(&self) -> &'static str {
        "crates.io"
    }

    fn display_name(&self) -> &'static str {
        "Crates.io (Rust)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "crates.io"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let (_, name) = project_path(url)?;
        let data = http.get_json(&format!("{}/crates/{}", Self::API, name), JSON_HEADERS)?;
        let krate = &data["crate"];

        let mut meta = ExternalMetadata::new(self.site())
            .with_homepage(krate["homepage"].as_str())
            .with_repository(krate["repository"].as_str());
        if let Some(docs) = krate["documentation"].as_str() {
            meta.push_link(docs.to_string());
        }
        Ok(meta)
    }
}
