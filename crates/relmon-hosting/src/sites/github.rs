//! GitHub repository metadata.
//!
//! See <https://docs.github.com/en/rest/repos/repos#get-a-repository>.

use super::{host, project_path};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

/// GitHub repository fetcher.
pub struct GitHub;

impl GitHub {
    pub const API: &'static str = "https://api.github.com";
    pub const API_HOST: &'static str = "api.github.com";
    const API_VERSION: &'static str = "2022-11-28";
    const MEDIA_TYPE: &'static str = "application/vnd.github+json";

    /// Headers every GitHub REST call sends.
    pub(crate) fn headers() -> [(&'static str, &'static str); 2] {
        [
            ("Accept", Self::MEDIA_TYPE),
            ("X-GitHub-Api-Version", Self::API_VERSION),
        ]
    }

    pub(crate) fn repo_api(owner: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}", Self::API, owner, repo)
    }
}

impl SiteFetcher for GitHub {
    fn site(&self) -> &'static str {
        "github"
    }

    fn display_name(&self) -> &'static str {
        "GitHub"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "github.com"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let (owner, repo) = project_path(url)?;
        let data = http.get_json(&Self::repo_api(owner, repo), &Self::headers())?;
        Ok(ExternalMetadata::new(self.site()).with_homepage(data["homepage"].as_str()))
    }
}
