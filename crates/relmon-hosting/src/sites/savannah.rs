//! GNU Savannah project pages (gnu and nongnu).
//!
//! Savannah has no API for this, so the project page is screen-scraped for
//! the "Homepage" navigation tab.

use super::{HTML_HEADERS, host, project_path};
use crate::html;
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use url::Url;

fn fetch_project(
    site: &str,
    base: &str,
    http: &HttpClient,
    url: &Url,
) -> Result<ExternalMetadata, HostingError> {
    let (_, project) = project_path(url)?;
    let page = http.get_text(&format!("{}/projects/{}", base, project), HTML_HEADERS)?;
    Ok(ExternalMetadata::from_links(site, parse_homepage_tabs(&page)))
}

/// Links of `<a class="tabs">` anchors labelled "Homepage".
pub fn parse_homepage_tabs(page: &str) -> Vec<String> {
    html::anchors(page)
        .into_iter()
        .filter(|a| a.has_class("tabs") && a.text == "Homepage")
        .filter_map(|a| a.href().map(String::from))
        .collect()
}

/// savannah.gnu.org fetcher.
pub struct GnuSavannah;

impl SiteFetcher for GnuSavannah {
    fn site(&self) -> &'static str {
        "savannah"
    }

    fn display_name(&self) -> &'static str {
        "GNU Savannah"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "savannah.gnu.org"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        fetch_project(self.site(), "https://savannah.gnu.org", http, url)
    }
}

/// savannah.nongnu.org fetcher.
pub struct NonGnuSavannah;

impl SiteFetcher for NonGnuSavannah {
    fn site(&self) -> &'static str {
        "savannah-nongnu"
    }

    fn display_name(&self) -> &'static str {
        "Savannah (non-GNU)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "savannah.nongnu.org"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        fetch_project(self.site(), "https://savannah.nongnu.org", http, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_homepage_tabs() {
        let page = r#"<ul>
<li><a href="/projects/make/" class="tabs">Main</a></li>
<li><a href="https://www.gnu.org/software/make/" class="tabs">Homepage</a></li>
<li><a href="https://www.gnu.org/software/make/" class="other">Homepage</a></li>
<li><a href="/bugs/?group=make" class="tabs">Bugs</a></li>
</ul>"#;
        assert_eq!(
            parse_homepage_tabs(page),
            vec!["https://www.gnu.org/software/make/"]
        );
    }
}
