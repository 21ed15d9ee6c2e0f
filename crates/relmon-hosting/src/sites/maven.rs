//! Maven Central artifact metadata.
//!
//! Two steps: the search API gives the latest version of `group:artifact`
//! (it is fresher than `maven-metadata.xml`), then that version's POM
//! gives the project and SCM URLs.
//!
//! ## POM templates
//! POM URLs often contain `${...}` expressions. Only plain property
//! substitution is done, from `<properties>` plus `project.url`,
//! `project.scm.tag`, `project.artifactId` and `project.version`.
//! Unknown properties become empty strings.

use super::{JSON_HEADERS, XML_HEADERS, host, safe_segment};
use crate::{ExternalMetadata, HostingError, HttpClient, SiteFetcher};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::info;
use url::Url;

static EL_EXPRESSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").unwrap());

/// Maven Central fetcher.
pub struct MavenCentral;

impl MavenCentral {
    const REPO: &'static str = "https://repo1.maven.org/maven2";
    const SEARCH: &'static str = "https://search.maven.org/solrsearch/select";

    fn coordinates(url: &Url) -> Result<(&str, &str), HostingError> {
        let mut segments = url
            .path_segments()
            .ok_or_else(|| HostingError::InvalidUrl(url.to_string()))?;
        match (segments.next(), segments.next(), segments.next()) {
            (Some("artifact"), Some(group), Some(artifact)) => {
                Ok((safe_segment(group)?, safe_segment(artifact)?))
            }
            _ => Err(HostingError::InvalidUrl(url.to_string())),
        }
    }

    fn latest_version(
        http: &HttpClient,
        group: &str,
        artifact: &str,
    ) -> Result<String, HostingError> {
        let url = format!(
            "{}?q=g:{}%20AND%20a:{}&rows=9&wt=json",
            Self::SEARCH,
            group,
            artifact
        );
        let data = http.get_json(&url, JSON_HEADERS)?;
        let response = &data["response"];
        if response["numFound"].as_u64() != Some(1) {
            return Err(HostingError::NotFound { url });
        }
        let doc = &response["docs"][0];
        if doc["g"].as_str() != Some(group) || doc["a"].as_str() != Some(artifact) {
            info!(
                g = doc["g"].as_str().unwrap_or_default(),
                a = doc["a"].as_str().unwrap_or_default(),
                "mismatch in requested Maven group and artifact"
            );
            return Err(HostingError::NotFound { url });
        }
        doc["latestVersion"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| HostingError::Parse("missing latestVersion".into()))
    }
}

impl SiteFetcher for MavenCentral {
    fn site(&self) -> &'static str {
        "maven"
    }

    fn display_name(&self) -> &'static str {
        "Maven Central (Java)"
    }

    fn can_handle(&self, url: &Url) -> bool {
        host(url) == "central.sonatype.com"
    }

    fn fetch(&self, http: &HttpClient, url: &Url) -> Result<ExternalMetadata, HostingError> {
        let (group, artifact) = Self::coordinates(url)?;
        let version = Self::latest_version(http, group, artifact)?;
        let pom_url = format!(
            "{}/{}/{}/{}/{}-{}.pom",
            Self::REPO,
            group.replace('.', "/"),
            artifact,
            version,
            artifact,
            version
        );
        let xml = http.get_text(&pom_url, XML_HEADERS)?;
        Ok(ExternalMetadata::from_links(self.site(), parse_pom(&xml)?))
    }
}

#[derive(Debug, Default, Deserialize)]
struct Pom {
    #[serde(rename = "artifactId", default)]
    artifact_id: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    scm: Option<Scm>,
    #[serde(default)]
    properties: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct Scm {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    tag: Option<String>,
}

/// Extract the project and SCM URLs from a POM, with properties substituted.
pub fn parse_pom(xml: &str) -> Result<Vec<String>, HostingError> {
    let pom: Pom = quick_xml::de::from_str(xml)?;

    let mut properties = pom.properties.unwrap_or_default();
    let mut urls = Vec::new();
    if let Some(url) = pom.url {
        properties.insert("project.url".into(), url.clone());
        urls.push(url);
    }
    if let Some(scm) = pom.scm {
        if let Some(url) = scm.url {
            urls.push(url);
        }
        if let Some(tag) = scm.tag {
            properties.insert("project.scm.tag".into(), tag);
        }
    }
    if let Some(artifact_id) = pom.artifact_id {
        properties.insert("project.artifactId".into(), artifact_id);
    }
    if let Some(version) = pom.version {
        properties.insert("project.version".into(), version);
    }

    Ok(urls
        .iter()
        .map(|url| substitute_properties(url, &properties))
        .collect())
}

/// Replace `${name}` expressions; unknown names become empty.
pub fn substitute_properties(text: &str, properties: &HashMap<String, String>) -> String {
    EL_EXPRESSION_RE
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            properties.get(name).cloned().unwrap_or_else(|| {
                info!(property = name, "cannot find POM property");
                String::new()
            })
        })
        .into_owned()
}
