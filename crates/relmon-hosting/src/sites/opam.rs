//! opam package pages.
//!
//! opam2web has no API, so the package page table is screen-scraped for the
//! "Homepage" and "Source [http]" rows.

use super::{HTML_HEADERS, host, project_path};
use crate::html;
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

/// opam.ocaml.org fetcher.
pub struct Opam;

impl Opam {
    const BASE: &'static str = "https://opam.ocaml.org/packages";
    const ROWS: &'static [&'static str] = &["Homepage", "Source [http]"];
}

/// Links in the interesting rows of an opam package page.
pub fn parse_package_page(page: &str) -> Vec<String> {
    html::table_rows(page)
        .into_iter()
        .filter(|(header, _)| Opam::ROWS.contains(&header.as_str()))
        .flat_map(|(_, anchors)| anchors.into_iter().filter_map(|a| a.href().map(String::from)))
        .collect()
}

impl SiteFetcher for Opam {
    fn site(&self) -> &'static str {
        "opam"
    }

    fn display_name(&self) -> &'static str {
        "opam (OCaml)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "opam.ocaml.org"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let (_, package) = project_path(url)?;
        let page = http.get_text(&format!("{}/{}/", Self::BASE, package), HTML_HEADERS)?;
        Ok(ExternalMetadata::from_links(self.site(), parse_package_page(&page)))
    }
}
