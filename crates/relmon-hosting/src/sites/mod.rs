//! Site fetchers for project metadata.
//!
//! Each fetcher handles one kind of hosting site or package registry and
//! returns the homepage and repository links that site declares for a
//! project. The registry is consulted in a fixed order; the first fetcher
//! whose `can_handle` accepts a URL is the only one used for it.

mod common;

#[cfg(test)]
mod tests;

pub mod crates_io;
pub mod github;
pub mod gitlab;
pub mod launchpad;
pub mod maven;
pub mod metacpan;
pub mod npm;
pub mod opam;
pub mod pypi;
pub mod readthedocs;
pub mod rubygems;
pub mod savannah;
pub mod sourceforge;

pub use common::{extract_link, is_unsafe_path, project_path, safe_segment};

use crate::SiteFetcher;
use std::sync::OnceLock;
use url::Url;

pub(crate) const JSON_HEADERS: &[(&str, &str)] = &[("Accept", "application/json")];
pub(crate) const XML_HEADERS: &[(&str, &str)] = &[("Accept", "application/xml")];
pub(crate) const HTML_HEADERS: &[(&str, &str)] = &[("Accept", "text/html")];

static SITE_REGISTRY: OnceLock<Vec<&'static dyn SiteFetcher>> = OnceLock::new();

fn init_builtin() -> Vec<&'static dyn SiteFetcher> {
    vec![
        // Code forges
        &github::GitHub,
        &gitlab::GitLabCom,
        &gitlab::GitLabInstance,
        &gitlab::GitLabShortPages,
        // Language registries
        &pypi::Pypi,
        &crates_io::CratesIo,
        &metacpan::MetaCpan,
        &sourceforge::SourceForge,
        &npm::NpmOrg,
        &npm::NpmCom,
        &rubygems::RubyGems,
        &maven::MavenCentral,
        // Project directories
        &launchpad::Launchpad,
        &savannah::GnuSavannah,
        &savannah::NonGnuSavannah,
        &opam::Opam,
        &readthedocs::ReadTheDocs,
    ]
}

/// All registered fetchers in dispatch order.
pub fn all_sites() -> &'static [&'static dyn SiteFetcher] {
    SITE_REGISTRY.get_or_init(init_builtin)
}

/// The fetcher responsible for a URL, if any site supports it.
pub fn find_site(url: &Url) -> Option<&'static dyn SiteFetcher> {
    all_sites().iter().find(|site| site.can_handle(url)).copied()
}

/// Lowercase host of a parsed URL.
pub(crate) fn host(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_ascii_lowercase()
}
