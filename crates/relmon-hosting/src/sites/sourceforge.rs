//! SourceForge project metadata.
//!
//! See <https://sourceforge.net/api-docs/>.

use super::{JSON_HEADERS, host, project_path};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

/// SourceForge fetcher.
pub struct SourceForge;

impl SourceForge {
    const API: &'static str = "https://sourceforge.net/rest";
}

impl SiteFetcher for SourceForge {
    fn site(&self) -> &'static str {
        "sourceforge"
    }

    fn display_name(&self) -> &'static str {
        "SourceForge"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "sourceforge.net"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        // Canonical form is sourceforge.net/projects/<name>
        let (_, project) = project_path(url)?;
        let data = http.get_json(&format!("{}/p/{}", Self::API, project), JSON_HEADERS)?;

        // Hosted CVS/SVN/Git links are ignored; there is no telling whether they are live.
        let mut meta =
            ExternalMetadata::new(self.site()).with_homepage(data["external_homepage"].as_str());
        if let Some(moved) = data["moved_to_url"].as_str() {
            meta.push_link(moved.to_string());
        }
        Ok(meta)
    }
}
