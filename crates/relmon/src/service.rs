//! Client for the release tracking service (Anitya).
//!
//! See <https://release-monitoring.org/static/docs/api.html>. Searches page
//! through results lazily; writes need an API token.

use crate::error::{Error, Result, ServiceError};
use relmon_hosting::HttpClient;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// Items requested per page; Anitya allows at most 250.
pub const ITEMS_PER_PAGE: u32 = 250;

/// Page requests after which a listing is cut off.
pub const MAX_PAGE_FAILSAFE: u32 = 1000;

/// Schemes a version check URL must use to be treated as a URL.
const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

/// A project as recorded by the tracking service. Never modified locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectCandidate {
    pub id: u64,
    pub name: String,
    pub ecosystem: String,
    pub homepage: String,
    pub backend: String,
    pub version_url: String,
    /// Distribution name to the package names it maps to this project.
    pub packages: BTreeMap<String, BTreeSet<String>>,
}

impl ProjectCandidate {
    /// Build from one item of a project listing.
    pub fn from_json(data: &Value) -> Result<Self> {
        let id = data["id"]
            .as_u64()
            .ok_or_else(|| Error::Service(format!("project without an id: {}", data)))?;
        let text = |key: &str| data[key].as_str().unwrap_or_default().to_string();

        let mut packages: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for package in data["packages"].as_array().into_iter().flatten() {
            if let (Some(distro), Some(name)) =
                (package["distro"].as_str(), package["package_name"].as_str())
            {
                packages
                    .entry(distro.to_string())
                    .or_default()
                    .insert(name.to_string());
            }
        }

        Ok(Self {
            id,
            name: text("name"),
            ecosystem: text("ecosystem"),
            homepage: text("homepage"),
            backend: text("backend"),
            version_url: text("version_url"),
            packages,
        })
    }

    /// Canonical URL of the project in its ecosystem, if it has one.
    pub fn ecosystem_url(&self) -> Option<String> {
        let name = &self.name;
        let url = match self.ecosystem.as_str() {
            "pypi" => format!("https://pypi.org/project/{}", name),
            "npm" => format!("https://npmjs.org/package/{}", name),
            "npmjs" => format!("https://npmjs.com/package/{}", name),
            "crates.io" => format!("https://crates.io/crates/{}", name),
            "rubygems" => format!("https://rubygems.org/gems/{}", name),
            eco if eco.starts_with("https://") || eco.starts_with("http://") => eco.to_string(),
            // maven URLs don't always carry the name
            _ => return None,
        };
        Some(url)
    }

    /// URL implied by the version check backend, if it has one.
    pub fn backend_url(&self) -> Option<String> {
        let version_url = self.version_url.as_str();
        if version_url.is_empty() {
            return None;
        }
        let url = match self.backend.as_str() {
            "GitHub" if version_url.contains("://") => version_url.to_string(),
            "GitHub" => format!("https://github.com/{}", version_url),
            "BitBucket" => format!("https://bitbucket.org/{}", version_url),
            "Sourceforge" => format!("https://sourceforge.net/projects/{}", version_url),
            "SourceHut" => format!("https://git.sr.ht/~{}", version_url),
            "Maven Central" => format!(
                "https://central.sonatype.com/artifact/{}",
                version_url.replace(':', "/")
            ),
            "Packagist" => format!("https://packagist.org/packages/{}/{}", version_url, self.name),
            "gitlab" | "GitLab" | "pagure" | "Gitea" | "Cgit" | "custom" => {
                version_url.to_string()
            }
            // CPAN, CRAN, Debian, GNU, Hackage, PECL and Stackage add nothing
            _ => return None,
        };
        Some(url)
    }

    /// The version check URL when it is a complete URL rather than a fragment.
    pub fn version_check_url(&self) -> Option<&str> {
        valid_version_check_url(&self.version_url)
    }

    /// Declared URLs other than the homepage, without duplicates.
    pub fn other_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        let found = [
            self.version_check_url().map(String::from),
            self.ecosystem_url(),
            self.backend_url(),
        ];
        for url in found.into_iter().flatten() {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    /// The homepage followed by [`Self::other_urls`].
    pub fn urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        if !self.homepage.is_empty() {
            urls.push(self.homepage.clone());
        }
        for url in self.other_urls() {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    /// Whether the project already lists a package for this distribution.
    pub fn has_package_for(&self, distro: &str) -> bool {
        self.packages.get(distro).is_some_and(|p| !p.is_empty())
    }
}

/// `url` if it is an absolute URL with a known scheme.
pub fn valid_version_check_url(url: &str) -> Option<&str> {
    let parsed = url::Url::parse(url).ok()?;
    let has_host = parsed.host_str().is_some_and(|h| !h.is_empty());
    (has_host && URL_SCHEMES.contains(&parsed.scheme())).then_some(url)
}

/// Lazily fetched search results. Finite, and not restartable once consumed.
pub type Candidates<'a> = Box<dyn Iterator<Item = std::result::Result<ProjectCandidate, ServiceError>> + 'a>;

/// Read access to the tracking service.
pub trait ProjectSearch: Send + Sync {
    /// Projects with this exact name.
    fn search_by_name(&self, name: &str) -> Candidates<'_>;

    /// Projects whose ecosystem is this URL.
    fn search_by_url(&self, url: &str) -> Candidates<'_>;

    /// Projects with this name in a named ecosystem.
    fn search_by_ecosystem_name(&self, ecosystem: &str, name: &str) -> Candidates<'_>;

    /// Names of all packages recorded for a distribution.
    fn distro_packages(&self, distro: &str) -> Result<HashSet<String>>;
}

/// A project to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProject {
    pub name: String,
    pub homepage: String,
    pub backend: String,
    pub version_url: Option<String>,
    pub version_prefix: String,
    pub pre_release_filter: String,
}

/// Write access to the tracking service.
pub trait ProjectWriter: Send + Sync {
    fn add_package(&self, distro: &str, project: &str, ecosystem: &str, package: &str) -> Result<()>;

    fn create_project(&self, project: &NewProject) -> Result<()>;

    /// Ask for a version scan, which also records the releases-only flag.
    fn scan_versions(&self, name: &str, homepage: &str, releases_only: bool) -> Result<()>;
}

/// Anitya API v2 client.
pub struct AnityaClient {
    http: Arc<HttpClient>,
    base_url: String,
    token: Option<String>,
    dry_run: bool,
}

impl AnityaClient {
    pub fn new(http: Arc<HttpClient>, base_url: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            http,
            base_url,
            token: None,
            dry_run: false,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Log writes instead of sending them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}/", self.base_url, path)
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Token {}", t))
    }

    fn get(&self, url: &str) -> Result<Value> {
        let auth = self.auth_header();
        let mut headers = vec![("Accept", "application/json")];
        if let Some(auth) = &auth {
            headers.push(("Authorization", auth.as_str()));
        }
        Ok(self.http.get_json(url, &headers)?)
    }

    fn post(&self, path: &str, body: Value) -> Result<()> {
        let auth = self
            .auth_header()
            .ok_or_else(|| Error::Auth("an API token is required for changes".into()))?;
        if self.dry_run {
            info!(path, %body, "dry run: not sending");
            return Ok(());
        }
        let headers = [
            ("Accept", "application/json"),
            ("Authorization", auth.as_str()),
        ];
        self.http.post_json(&self.endpoint(path), &headers, &body)?;
        Ok(())
    }

    fn fetch_page(&self, path: &str, params: &[(String, String)], page: u32) -> Result<Value> {
        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .chain([
                format!("items_per_page={}", ITEMS_PER_PAGE),
                format!("page={}", page),
            ])
            .collect();
        let url = format!("{}?{}", self.endpoint(path), query.join("&"));
        debug!(path, page, "requesting page");
        self.get(&url)
    }

    fn paged(&self, path: &'static str, params: &[(&str, &str)]) -> PagedItems<'_> {
        PagedItems {
            client: self,
            path,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            page: 1,
            buffer: VecDeque::new(),
            fetched: 0,
            done: false,
        }
    }

    fn projects(&self, params: &[(&str, &str)]) -> Candidates<'_> {
        Box::new(
            self.paged("projects", params)
                .map(|item| item.and_then(|v| ProjectCandidate::from_json(&v))),
        )
    }
}

impl ProjectSearch for AnityaClient {
    fn search_by_name(&self, name: &str) -> Candidates<'_> {
        self.projects(&[("name", name)])
    }

    fn search_by_url(&self, url: &str) -> Candidates<'_> {
        self.projects(&[("ecosystem", url)])
    }

    fn search_by_ecosystem_name(&self, ecosystem: &str, name: &str) -> Candidates<'_> {
        self.projects(&[("name", name), ("ecosystem", ecosystem)])
    }

    fn distro_packages(&self, distro: &str) -> Result<HashSet<String>> {
        self.paged("packages", &[("distribution", distro)])
            .map(|item| item.map(|v| v["name"].as_str().unwrap_or_default().to_string()))
            .filter(|name| !matches!(name, Ok(n) if n.is_empty()))
            .collect()
    }
}

impl ProjectWriter for AnityaClient {
    fn add_package(&self, distro: &str, project: &str, ecosystem: &str, package: &str) -> Result<()> {
        self.post(
            "packages",
            json!({
                "distribution": distro,
                "package_name": package,
                "project_name": project,
                "project_ecosystem": ecosystem,
            }),
        )
    }

    fn create_project(&self, project: &NewProject) -> Result<()> {
        self.post(
            "projects",
            json!({
                "name": project.name,
                "homepage": project.homepage,
                "backend": project.backend,
                "version_url": project.version_url,
                "version_prefix": project.version_prefix,
                "pre_release_filter": project.pre_release_filter,
            }),
        )
    }

    fn scan_versions(&self, name: &str, homepage: &str, releases_only: bool) -> Result<()> {
        self.post(
            "versions",
            json!({
                "name": name,
                "homepage": homepage,
                "releases_only": releases_only,
            }),
        )
    }
}

/// Items of a paged listing, fetched one page at a time.
struct PagedItems<'a> {
    client: &'a AnityaClient,
    path: &'static str,
    params: Vec<(String, String)>,
    page: u32,
    buffer: VecDeque<Value>,
    fetched: u64,
    done: bool,
}

impl Iterator for PagedItems<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if self.page >= MAX_PAGE_FAILSAFE {
                info!(path = self.path, "page limit reached, stopping");
                self.done = true;
                return None;
            }
            let data = match self.client.fetch_page(self.path, &self.params, self.page) {
                Ok(data) => data,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            let Some(items) = data["items"].as_array() else {
                self.done = true;
                return Some(Err(Error::Service(format!(
                    "listing {} has no items",
                    self.path
                ))));
            };
            self.fetched += items.len() as u64;
            let total = data["total_items"].as_u64();
            if items.is_empty() || total.is_none_or(|t| self.fetched >= t) {
                if let Some(total) = total.filter(|t| *t != self.fetched) {
                    info!(path = self.path, wanted = total, got = self.fetched, "short listing");
                }
                self.done = true;
            }
            self.buffer.extend(items.iter().cloned());
            self.page += 1;
        }
    }
}
