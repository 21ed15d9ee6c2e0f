//! RubyGems gem metadata.
//!
//! See <https://guides.rubygems.org/rubygems-org-api/#gem-methods>.

use super::{JSON_HEADERS, host, project_path};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

/// RubyGems fetcher.
pub struct RubyGems;

impl RubyGems {
    const API: &'static str = "https://rubygems.org/api/v1";
}

impl SiteFetcher for RubyGems {
    fn site(&self) -> &'static str {
        "rubygems"
    }

    fn display_name(&self) -> &'static str {
        "RubyGems (Ruby)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "rubygems.org"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let (_, gem) = project_path(url)?;
        let data = http.get_json(&format!("{}/gems/{}.json", Self::API, gem), JSON_HEADERS)?;
        let metadata = &data["metadata"];

        let mut meta = ExternalMetadata::new(self.site())
            .with_homepage(data["homepage_uri"].as_str())
            .with_repository(data["source_code_uri"].as_str());
        for key in ["homepage_uri", "source_code_uri", "documentation_uri"] {
            if let Some(link) = metadata[key].as_str() {
                meta.push_link(link.to_string());
            }
        }
        Ok(meta)
    }
}
