//! Release tag listing for code forges.
//!
//! Used when creating a project, to check that the forge's tags can be
//! turned into versions before the tracking service is asked to follow it.

use crate::sites::github::GitHub;
use crate::sites::{gitlab, safe_segment};
use crate::{HostingError, HttpClient};
use tracing::debug;

const PER_PAGE: u32 = 100;

fn names(data: &serde_json::Value, key: &str) -> Result<Vec<String>, HostingError> {
    let entries = data
        .as_array()
        .ok_or_else(|| HostingError::Parse("expected a JSON array".into()))?;
    Ok(entries
        .iter()
        .filter_map(|e| e[key].as_str().map(String::from))
        .collect())
}

/// Tag names of a GitHub repository's releases.
pub fn github_releases(
    http: &HttpClient,
    owner: &str,
    repo: &str,
) -> Result<Vec<String>, HostingError> {
    let (owner, repo) = (safe_segment(owner)?, safe_segment(repo)?);
    let url = format!("{}/releases?per_page={}", GitHub::repo_api(owner, repo), PER_PAGE);
    names(&http.get_json(&url, &GitHub::headers())?, "tag_name")
}

/// Tag names of a GitHub repository.
pub fn github_tags(
    http: &HttpClient,
    owner: &str,
    repo: &str,
) -> Result<Vec<String>, HostingError> {
    let (owner, repo) = (safe_segment(owner)?, safe_segment(repo)?);
    let url = format!("{}/tags?per_page={}", GitHub::repo_api(owner, repo), PER_PAGE);
    names(&http.get_json(&url, &GitHub::headers())?, "name")
}

/// GitHub release tags, falling back to plain tags when there are no releases.
///
/// The flag is true when the list came from releases.
pub fn github_release_or_tags(
    http: &HttpClient,
    owner: &str,
    repo: &str,
) -> Result<(Vec<String>, bool), HostingError> {
    let releases = github_releases(http, owner, repo)?;
    if !releases.is_empty() {
        return Ok((releases, true));
    }
    debug!(owner, repo, "no releases, falling back to tags");
    Ok((github_tags(http, owner, repo)?, false))
}

/// Tag names of a project on a GitLab instance.
pub fn gitlab_tags(
    http: &HttpClient,
    domain: &str,
    namespace: &str,
    project: &str,
) -> Result<Vec<String>, HostingError> {
    let (namespace, project) = (safe_segment(namespace)?, safe_segment(project)?);
    let url = format!(
        "{}/repository/tags?per_page={}",
        gitlab::project_api(domain, namespace, project),
        PER_PAGE
    );
    names(
        &http.get_json(&url, &[("Accept", "application/json")])?,
        "name",
    )
}
