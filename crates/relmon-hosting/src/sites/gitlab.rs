//! GitLab project metadata, for gitlab.com and self-hosted instances.
//!
//! GitLab has no homepage field. A link in the project description is the
//! closest thing, and the GitLab Pages site is always offered as well since
//! its existence can't be detected from the API.
//!
//! Pages URL forms:
//! - gitlab.com: `https://{namespace}.gitlab.io/{project}`
//! - standard instances: `https://{namespace}.pages.{domain}/{project}`
//! - short-pages instances: as above with `gitlab.` removed from the domain

use super::{JSON_HEADERS, extract_link, host, project_path};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use tracing::info;
use url::Url;

/// Instances whose pages live under `pages.<instance domain>`.
///
/// invent.kde.org and salsa.debian.org are GitLab too but have no
/// consistent pages URLs, so they are left out.
pub const STANDARD_PAGES_INSTANCES: &[&str] = &[
    "gitlab.gnome.org",
    "gitlab.matrix.org",
    "gitlab.xiph.org",
    "gitlab.inria.fr",
    "gitlab.dkrz.de",
    "gitlab.cern.ch",
    "gitlab.haskell.org",
];

/// Instances whose pages domain drops the `gitlab.` label.
pub const SHORT_PAGES_INSTANCES: &[&str] = &["gitlab.freedesktop.org", "gitlab.xfce.org"];

/// API base of a GitLab instance.
pub fn api_base(domain: &str) -> String {
    format!("https://{}/api/v4", domain)
}

/// API URL of one project; the path separator is escaped as GitLab requires.
pub fn project_api(domain: &str, namespace: &str, project: &str) -> String {
    format!("{}/projects/{}%2F{}", api_base(domain), namespace, project)
}

fn fetch_project(
    site: &str,
    http: &HttpClient,
    url: &Url,
    pages: impl Fn(&str, &str) -> String,
) -> Result<ExternalMetadata, HostingError> {
    let domain = host(url);
    let (namespace, project) = project_path(url)?;
    let mut meta = ExternalMetadata::new(site);

    match http.get_json(&project_api(&domain, namespace, project), JSON_HEADERS) {
        Ok(data) => {
            if let Some(link) = data["description"].as_str().and_then(extract_link) {
                meta.homepage = Some(link.to_string());
            }
        }
        // The pages link is still worth returning when the API refuses us.
        Err(err) if !err.is_rate_limit() => {
            info!(%url, error = %err, "error retrieving GitLab project data");
        }
        Err(err) => return Err(err),
    }

    meta.push_link(pages(namespace, project));
    Ok(meta)
}

/// gitlab.com projects.
pub struct GitLabCom;

impl SiteFetcher for GitLabCom {
    fn site(&self) -> &'static str {
        "gitlab"
    }

    fn display_name(&self) -> &'static str {
        "GitLab.com"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "gitlab.com"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        fetch_project(self.site(), http, url, |namespace, project| {
            format!("https://{}.gitlab.io/{}", namespace, project)
        })
    }
}

/// Self-hosted GitLab instances with standard pages domains.
pub struct GitLabInstance;

impl SiteFetcher for GitLabInstance {
    fn site(&self) -> &'static str {
        "gitlab-instance"
    }

    fn display_name(&self) -> &'static str {
        "GitLab (self-hosted)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        STANDARD_PAGES_INSTANCES.contains(&host(url).as_str())
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let domain = host(url);
        fetch_project(self.site(), http, url, |namespace, project| {
            format!("https://{}.pages.{}/{}", namespace, domain, project)
        })
    }
}

/// Self-hosted GitLab instances whose pages domain omits `gitlab.`.
pub struct GitLabShortPages;

impl SiteFetcher for GitLabShortPages {
    fn site(&self) -> &'static str {
        "gitlab-shortpages"
    }

    fn display_name(&self) -> &'static str {
        "GitLab (self-hosted, short pages)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        SHORT_PAGES_INSTANCES.contains(&host(url).as_str())
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let bare = host(url).replacen("gitlab.", "", 1);
        fetch_project(self.site(), http, url, |namespace, project| {
            format!("https://{}.pages.{}/{}", namespace, bare, project)
        })
    }
}
