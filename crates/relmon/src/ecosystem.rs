//! Hosting ecosystems a new project can be created for.
//!
//! Each supported host has exactly one [`EcosystemRule`]. Forge rules need
//! release tags that turn into plain numeric versions once a common prefix
//! and prerelease suffix are removed; registries and SourceForge are left
//! to the tracking service's own version handling.

use crate::canon::{CanonicalUrl, canonicalize, registry_name};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// A version made only of dot-separated numbers.
static NUMERIC_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.)*\d+$").unwrap());

/// A version that starts with a plausible year. Needs updating after 2039.
static YEAR_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((19[89])|20[0-3])\d").unwrap());

static ALPHA_BETA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-.]?(alpha|beta)(\.)?\d*$").unwrap());
const ALPHA_BETA_FILTER: &str = "alpha;beta";

static RC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]?(rc|RC)(\.)?(\d)*$").unwrap());
const RC_FILTER: &str = "rc;RC";

/// Some PEP 440 prerelease suffixes. `.postN` and developmental
/// prereleases are not handled.
static PEP440_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)(((a|b|rc)\d+)|([-._]?dev(\d+)?))$").unwrap());
const PEP440_FILTER: &str = "a;b;rc;dev";

/// Tag prefixes tried, in order, before any project-specific ones.
pub const VERSION_PREFIXES: &[&str] = &[
    "", "v", "V", "ver-", "release-", "Release-", "ver", "Ver", "version-", "Version-", "v-", "V-",
    "Ver-",
];

/// How project coordinates are read from a URL on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Registry,
    Cpan,
    GitHub,
    GitLab,
    SourceForge,
}

/// What the tracking service needs to follow projects on some hosts.
#[derive(Debug)]
pub struct EcosystemRule {
    pub hosts: &'static [&'static str],
    /// Ecosystem the project is filed under, when it isn't its homepage.
    pub ecosystem: Option<&'static str>,
    /// Version check backend name.
    pub backend: &'static str,
    pub kind: RuleKind,
    /// Whether a prefix-stripped tag reads as a version.
    pub tag_to_version: fn(&str) -> bool,
}

fn numeric_version(tag: &str) -> bool {
    NUMERIC_VERSION_RE.is_match(tag)
}

fn any_version(tag: &str) -> bool {
    !tag.is_empty()
}

pub static RULES: &[EcosystemRule] = &[
    EcosystemRule {
        hosts: &["crates.io"],
        ecosystem: Some("crates.io"),
        backend: "crates.io",
        kind: RuleKind::Registry,
        tag_to_version: any_version,
    },
    EcosystemRule {
        hosts: &["github.com"],
        ecosystem: None,
        backend: "GitHub",
        kind: RuleKind::GitHub,
        tag_to_version: numeric_version,
    },
    EcosystemRule {
        hosts: &["gitlab.com"],
        ecosystem: None,
        backend: "GitLab",
        kind: RuleKind::GitLab,
        tag_to_version: numeric_version,
    },
    EcosystemRule {
        hosts: &["metacpan.org"],
        ecosystem: None,
        backend: "CPAN (perl)",
        kind: RuleKind::Cpan,
        tag_to_version: any_version,
    },
    EcosystemRule {
        hosts: &["npmjs.com", "npmjs.org"],
        ecosystem: Some("npmjs"),
        backend: "npmjs",
        kind: RuleKind::Registry,
        tag_to_version: any_version,
    },
    EcosystemRule {
        hosts: &["pypi.org"],
        ecosystem: Some("pypi"),
        backend: "PyPI",
        kind: RuleKind::Registry,
        tag_to_version: any_version,
    },
    EcosystemRule {
        hosts: &["rubygems.org"],
        ecosystem: Some("rubygems"),
        backend: "Rubygems",
        kind: RuleKind::Registry,
        tag_to_version: any_version,
    },
    EcosystemRule {
        hosts: &["sourceforge.net"],
        ecosystem: None,
        backend: "Sourceforge",
        kind: RuleKind::SourceForge,
        tag_to_version: any_version,
    },
];

/// The rule for a host, if the host is supported.
pub fn rule_for_host(host: &str) -> Option<&'static EcosystemRule> {
    let host = host.to_ascii_lowercase();
    RULES.iter().find(|rule| rule.hosts.contains(&host.as_str()))
}

/// Where a project lives within its ecosystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coordinates {
    Registry { ecosystem: String, name: String },
    Dist { name: String },
    Forge { owner: String, repo: String },
    SourceForge { project: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported URL {url}: {reason}")]
pub struct Unsupported {
    pub url: String,
    pub reason: String,
}

/// A URL that a project can be created from.
#[derive(Debug, Clone)]
pub struct Classification {
    pub rule: &'static EcosystemRule,
    pub coordinates: Coordinates,
    pub canonical: CanonicalUrl,
}

/// Pick the rule for a new project.
///
/// The source URL decides when there is one, otherwise the homepage.
pub fn classify(homepage: &str, source: Option<&str>) -> Result<Classification, Unsupported> {
    let url = source.unwrap_or(homepage);
    let canonical = canonicalize(url);
    let unsupported = |reason: String| Unsupported {
        url: url.to_string(),
        reason,
    };
    let rule = rule_for_host(canonical.host())
        .ok_or_else(|| unsupported(format!("no rule for host {:?}", canonical.host())))?;
    let coordinates = coordinates(rule.kind, &canonical)
        .ok_or_else(|| unsupported(format!("bad {} URL", rule.backend)))?;
    Ok(Classification {
        rule,
        coordinates,
        canonical,
    })
}

fn coordinates(kind: RuleKind, canonical: &CanonicalUrl) -> Option<Coordinates> {
    let parts = path_parts(canonical);
    let segment = |i: usize| parts.get(i).copied().filter(|p| !p.is_empty()).map(String::from);
    match kind {
        RuleKind::Registry => {
            let (ecosystem, name) = registry_name(canonical.as_str())?;
            Some(Coordinates::Registry {
                ecosystem: ecosystem.to_string(),
                name,
            })
        }
        RuleKind::Cpan if parts.get(1) == Some(&"dist") => {
            Some(Coordinates::Dist { name: segment(2)? })
        }
        RuleKind::Cpan => None,
        RuleKind::GitHub if parts.len() == 3 => Some(Coordinates::Forge {
            owner: segment(1)?,
            repo: segment(2)?,
        }),
        RuleKind::GitHub => None,
        RuleKind::GitLab => {
            // A two-level project home page, or an archive link within one.
            // Deeper namespaces can't be told apart from pages inside a
            // project without asking the API.
            let home = parts.len() == 3;
            let archive = parts.len() >= 5 && parts[3..5] == ["-", "archive"];
            if !home && !archive {
                return None;
            }
            Some(Coordinates::Forge {
                owner: segment(1)?,
                repo: segment(2)?,
            })
        }
        RuleKind::SourceForge => Some(Coordinates::SourceForge {
            project: segment(2)?,
        }),
    }
}

/// Path of a canonical key split on `/`; the first element is empty.
fn path_parts(canonical: &CanonicalUrl) -> Vec<&str> {
    let key = canonical.as_str();
    let host = canonical.host();
    let path = key
        .find(host)
        .map(|i| &key[i + host.len()..])
        .unwrap_or_default();
    path.split(['?', '#']).next().unwrap_or_default().split('/').collect()
}

impl Classification {
    pub fn backend(&self) -> &'static str {
        self.rule.backend
    }

    /// Registries and CPAN name the project themselves.
    pub fn project_name<'a>(&'a self, supplied: &'a str) -> &'a str {
        match &self.coordinates {
            Coordinates::Registry { name, .. } | Coordinates::Dist { name } => name,
            _ => supplied,
        }
    }

    /// Ecosystem to file the project and its packages under.
    pub fn ecosystem(&self, homepage: &str) -> String {
        match &self.coordinates {
            Coordinates::Registry { ecosystem, .. } => ecosystem.clone(),
            _ => homepage.to_string(),
        }
    }

    pub fn version_url(&self) -> Option<String> {
        match (&self.coordinates, self.rule.kind) {
            (Coordinates::Forge { owner, repo }, RuleKind::GitHub) => {
                Some(format!("{}/{}", owner, repo))
            }
            (Coordinates::Forge { owner, repo }, _) => {
                Some(format!("https://gitlab.com/{}/{}", owner, repo))
            }
            (Coordinates::SourceForge { project }, _) => Some(project.clone()),
            _ => None,
        }
    }

    /// Whether release tags have to be checked before creating.
    pub fn needs_tags(&self) -> bool {
        matches!(self.coordinates, Coordinates::Forge { .. })
    }

    /// Project-specific tag prefixes to try after the standard ones.
    pub fn extra_prefixes(&self, project: &str) -> Vec<String> {
        let mut extra = vec![format!("{}-", project)];
        if let Coordinates::Forge { repo, .. } = &self.coordinates {
            extra.push(format!("{}-", repo));
        }
        extra
    }
}

/// Tag names listed by a forge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pub names: Vec<String>,
    /// The names came from published releases rather than bare tags.
    pub from_releases: bool,
}

/// How the tracking service should read versions from tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagScheme {
    pub prefix: String,
    pub prerelease_filter: String,
    pub releases_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagProblem {
    NoTags,
    NotNumeric,
    Calendar,
}

impl fmt::Display for TagProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoTags => "no tags",
            Self::NotNumeric => "questionable release tag",
            Self::Calendar => "possible calendar version",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {tag:?}")]
pub struct TagParseError {
    pub tag: String,
    pub reason: TagProblem,
}

/// Remove a prerelease suffix family from every version in place.
///
/// Returns the service's prerelease filter for the family, or `""`.
pub fn strip_prerelease_suffix(versions: &mut [String]) -> &'static str {
    let strip = |versions: &mut [String], re: &Regex, replacement: &str| {
        for version in versions.iter_mut() {
            *version = re.replace(version, replacement).into_owned();
        }
    };
    if versions.iter().any(|v| ALPHA_BETA_RE.is_match(v)) {
        strip(versions, &ALPHA_BETA_RE, "");
        return ALPHA_BETA_FILTER;
    }
    // rc and PEP 440 overlap; whichever matches more tags wins.
    let rc = versions.iter().filter(|v| RC_RE.is_match(v)).count();
    let pep440 = versions.iter().filter(|v| PEP440_RE.is_match(v)).count();
    if rc > 0 && rc >= pep440 {
        strip(versions, &RC_RE, "");
        RC_FILTER
    } else if pep440 > rc {
        strip(versions, &PEP440_RE, "${1}");
        PEP440_FILTER
    } else {
        ""
    }
}

fn prefixes(extra: &[String]) -> impl Iterator<Item = &str> {
    VERSION_PREFIXES.iter().copied().chain(extra.iter().map(String::as_str))
}

fn without<'a>(version: &'a str, prefix: &str) -> &'a str {
    version.strip_prefix(prefix).unwrap_or(version)
}

/// The first prefix under which every version reads as a number.
pub fn find_version_prefix(versions: &[String], extra: &[String]) -> Option<String> {
    find_prefix_with(versions, extra, numeric_version)
}

fn find_prefix_with(versions: &[String], extra: &[String], is_version: fn(&str) -> bool) -> Option<String> {
    prefixes(extra)
        .find(|prefix| versions.iter().all(|v| is_version(without(v, prefix))))
        .map(String::from)
}

/// Check that a forge's tags can be followed, and how.
pub fn validate_tags(
    rule: &EcosystemRule,
    tags: &Tags,
    extra_prefixes: &[String],
) -> Result<TagScheme, TagParseError> {
    if tags.names.is_empty() {
        return Err(TagParseError {
            tag: String::new(),
            reason: TagProblem::NoTags,
        });
    }
    let mut versions = tags.names.clone();
    let prerelease_filter = strip_prerelease_suffix(&mut versions);

    let Some(prefix) = find_prefix_with(&versions, extra_prefixes, rule.tag_to_version) else {
        let mut best = ("", 0);
        for prefix in prefixes(extra_prefixes) {
            let parsed = versions
                .iter()
                .filter(|v| (rule.tag_to_version)(without(v, prefix)))
                .count();
            if parsed > best.1 {
                best = (prefix, parsed);
            }
        }
        let failed = versions
            .iter()
            .position(|v| !(rule.tag_to_version)(without(v, best.0)))
            .unwrap_or_default();
        return Err(TagParseError {
            tag: tags.names[failed].clone(),
            reason: TagProblem::NotNumeric,
        });
    };

    if let Some(i) = versions
        .iter()
        .position(|v| YEAR_VERSION_RE.is_match(without(v, &prefix)))
    {
        return Err(TagParseError {
            tag: tags.names[i].clone(),
            reason: TagProblem::Calendar,
        });
    }

    Ok(TagScheme {
        prefix,
        prerelease_filter: prerelease_filter.to_string(),
        releases_only: tags.from_releases,
    })
}
