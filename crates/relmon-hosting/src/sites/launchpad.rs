//! Launchpad project metadata from the project RDF document.

use super::{XML_HEADERS, host, safe_segment};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use serde::Deserialize;
use url::Url;

/// Launchpad fetcher.
pub struct Launchpad;

impl Launchpad {
    const BASE: &'static str = "https://launchpad.net";
}

impl SiteFetcher for Launchpad {
    fn site(&self) -> &'static str {
        "launchpad"
    }

    fn display_name(&self) -> &'static str {
        "Launchpad"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "launchpad.net"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let project = url
            .path_segments()
            .and_then(|mut s| s.next())
            .ok_or_else(|| HostingError::InvalidUrl(url.to_string()))?;
        let project = safe_segment(project)?;
        let xml = http.get_text(&format!("{}/{}/+rdf", Self::BASE, project), XML_HEADERS)?;
        Ok(ExternalMetadata::new(self.site()).with_homepage(parse_rdf(&xml)?.as_deref()))
    }
}

// quick_xml serde sees namespace prefixes as literal element names
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "lp:Product", alias = "Product", default)]
    product: Option<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(rename = "lp:homepage", alias = "homepage", default)]
    homepage: Option<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(rename = "@rdf:resource", alias = "@resource", default)]
    resource: Option<String>,
}

/// The homepage declared in a Launchpad project RDF document.
pub fn parse_rdf(xml: &str) -> Result<Option<String>, HostingError> {
    let rdf: Rdf = quick_xml::de::from_str(xml)?;
    Ok(rdf
        .product
        .and_then(|p| p.homepage)
        .and_then(|h| h.resource)
        .filter(|r| !r.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rdf() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:lp="https://launchpad.net/rdf/launchpad#">
  <lp:Product>
    <lp:specifiedAt rdf:resource="/widget/+rdf"/>
    <lp:name>widget</lp:name>
    <lp:homepage rdf:resource="https://widget.example.org/"/>
  </lp:Product>
</rdf:RDF>"#;
        assert_eq!(
            parse_rdf(xml).unwrap().as_deref(),
            Some("https://widget.example.org/")
        );
    }

    #[test]
    fn test_parse_rdf_without_homepage() {
        let xml = r#"<rdf:RDF xmlns:rdf="x" xmlns:lp="y"><lp:Product><lp:name>w</lp:name></lp:Product></rdf:RDF>"#;
        assert_eq!(parse_rdf(xml).unwrap(), None);
    }
}
