//! Matching distribution packages to tracked projects.
//!
//! A package is only ever associated with a project after one of the
//! record's URLs has been found equivalent to a URL taken from that
//! project's own metadata, directly or through one hop of external links.
//! Search results that merely share a name never match.

use crate::canon::{
    canonicalize, compatible_ecosystems, is_download_url, is_valid_url, registry_name,
    search_variants, url_ecosystem, urls_match,
};
use crate::enrich::{EnrichTarget, Enricher};
use crate::error::Result;
use crate::policy::{self, AmbiguityPolicy};
use crate::records::PackageRecord;
use crate::redirect::RedirectResolver;
use crate::service::{ProjectCandidate, ProjectSearch};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info};

/// Outcome for one record. Terminal: never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    Matched { candidate: ProjectCandidate },
    Ambiguous { candidates: Vec<ProjectCandidate> },
    NotFound,
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The package is already recorded for the distribution.
    AlreadyPresent,
    /// None of the record's URLs is usable.
    NoUsableUrl,
    /// Several projects matched and the policy refused to pick one.
    Ambiguous,
    /// The only match already lists a package for the distribution.
    CandidateHasPackage,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyPresent => "package already present",
            Self::NoUsableUrl => "no valid URLs given",
            Self::Ambiguous => "too many matching projects",
            Self::CandidateHasPackage => "project already has a package for the distribution",
        })
    }
}

/// Caller settings for the engine.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Contact other sites when no project matches directly.
    pub allow_external_match: bool,
    /// Also compare the URLs that record URLs redirect to.
    pub check_redirects: bool,
    /// Skip a match whose project already packages something for `distro`.
    pub require_no_existing_package: bool,
    pub distro: Option<String>,
    pub policy: AmbiguityPolicy,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            allow_external_match: true,
            check_redirects: true,
            require_no_existing_package: false,
            distro: None,
            policy: AmbiguityPolicy::Refuse,
        }
    }
}

impl MatchOptions {
    /// Redirect checks contact other servers, so they follow external matching.
    pub fn checks_redirects(&self) -> bool {
        self.allow_external_match && self.check_redirects
    }
}

/// Links already looked up while handling one record.
type LinkMemo = HashMap<String, Vec<String>>;

pub struct MatchEngine<'a> {
    search: &'a dyn ProjectSearch,
    resolver: &'a dyn RedirectResolver,
    enricher: &'a dyn Enricher,
    options: MatchOptions,
}

impl<'a> MatchEngine<'a> {
    pub fn new(
        search: &'a dyn ProjectSearch,
        resolver: &'a dyn RedirectResolver,
        enricher: &'a dyn Enricher,
        options: MatchOptions,
    ) -> Self {
        Self {
            search,
            resolver,
            enricher,
            options,
        }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Find the existing project a packaged record belongs to.
    ///
    /// The result is pre-policy: several matches come back as
    /// [`MatchResult::Ambiguous`].
    pub fn match_existing(
        &self,
        record: &PackageRecord,
        known_packages: &HashSet<String>,
    ) -> Result<MatchResult> {
        if known_packages.contains(&record.package) {
            info!(package = %record.package, "package already exists in a project, skipping");
            return Ok(MatchResult::Skipped {
                reason: SkipReason::AlreadyPresent,
            });
        }

        let targets = self.record_targets(record);
        if targets.is_empty() {
            info!(project = %record.project, "no valid URLs given, skipping");
            return Ok(MatchResult::Skipped {
                reason: SkipReason::NoUsableUrl,
            });
        }
        let urls: Vec<&str> = targets.iter().map(EnrichTarget::as_str).collect();

        let candidates: Vec<ProjectCandidate> =
            self.search.search_by_name(&record.project).collect::<Result<_>>()?;
        debug!(count = candidates.len(), name = %record.project, "found projects by name");
        for candidate in &candidates {
            debug!(id = candidate.id, urls = ?candidate.urls(), "project links");
        }

        let mut matches: Vec<ProjectCandidate> = candidates
            .iter()
            .filter(|c| firm_match(c, &urls))
            .cloned()
            .collect();

        if matches.is_empty() && !candidates.is_empty() && self.options.allow_external_match {
            let mut memo = LinkMemo::new();
            for target in &targets {
                matches.extend(self.compare_external(target, &candidates, &mut memo));
            }
        }

        let result = policy::resolve(matches);
        if let MatchResult::Matched { candidate } = &result {
            if self.candidate_has_package(candidate) {
                info!(id = candidate.id, "project already has a package for the distribution");
                return Ok(MatchResult::Skipped {
                    reason: SkipReason::CandidateHasPackage,
                });
            }
        }
        match &result {
            MatchResult::Matched { candidate } => {
                debug!(id = candidate.id, package = %record.package, "found matching project");
            }
            MatchResult::Ambiguous { candidates } => {
                info!(project = %record.project, count = candidates.len(), "too many matches found");
            }
            _ => {
                info!(project = %record.project, searched = candidates.len(), "no matches found");
            }
        }
        Ok(result)
    }

    /// Discover projects for a record by its URLs alone.
    ///
    /// Results have had the ambiguity policy applied.
    pub fn find_candidates(&self, record: &PackageRecord) -> Result<Vec<MatchResult>> {
        let mut urls: BTreeSet<String> = record.urls().into_iter().map(String::from).collect();
        if self.options.checks_redirects() {
            urls.extend(self.record_targets(record).iter().map(|t| t.as_str().to_string()));
        }
        let canonical: Vec<String> = urls.iter().map(|u| canonicalize(u).with_scheme()).collect();
        urls.extend(canonical);
        // Plain download URLs are dropped; their canonical forms stay.
        urls.retain(|u| is_valid_url(u) && !is_download_url(u));
        if urls.is_empty() {
            info!(package = %record.package, "no valid URLs given, skipping");
            return Ok(vec![MatchResult::Skipped {
                reason: SkipReason::NoUsableUrl,
            }]);
        }

        let registry_urls: BTreeSet<String> = urls
            .iter()
            .map(|u| canonicalize(u).with_scheme())
            .filter(|u| url_ecosystem(u).is_some())
            .collect();

        let variants: Vec<String> = search_variants(urls.iter().map(String::as_str))
            .into_iter()
            .collect();
        debug!(urls = ?variants, "checking these URLs");

        let found: Vec<Result<Vec<ProjectCandidate>>> = variants
            .par_iter()
            .map(|url| self.search.search_by_url(url).collect())
            .collect();
        let mut candidates = Vec::new();
        for batch in found {
            candidates.extend(batch?);
        }

        let distinct: BTreeSet<String> = registry_urls.iter().map(|u| u.to_lowercase()).collect();
        if distinct.len() > 1 {
            debug!(urls = ?registry_urls, "too many registry URLs for a name search");
        } else if let Some((ecosystem, name)) = registry_urls.first().and_then(|u| registry_name(u))
        {
            debug!(ecosystem, %name, "searching registry by name");
            for candidate in self.search.search_by_ecosystem_name(ecosystem, &name) {
                candidates.push(candidate?);
            }
        }

        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        let mut memo = LinkMemo::new();
        let firm: Vec<ProjectCandidate> = candidates
            .into_iter()
            .filter(|c| {
                let keep = firm_match(c, &urls)
                    || (self.options.allow_external_match && self.linked_back(c, &urls, &mut memo));
                if !keep {
                    debug!(id = c.id, name = %c.name, "dropping project whose URLs don't match");
                }
                keep
            })
            .collect();
        for candidate in &firm {
            info!(id = candidate.id, name = %candidate.name, "found project");
        }

        let result = policy::resolve(firm);
        if matches!(result, MatchResult::NotFound) {
            info!(package = %record.package, "nothing found for package URL");
        }
        Ok(self.options.policy.settle(result))
    }

    /// The record's valid URLs, then the redirect targets that differ.
    fn record_targets(&self, record: &PackageRecord) -> Vec<EnrichTarget> {
        let mut targets: Vec<EnrichTarget> = EnrichTarget::from_record(record)
            .into_iter()
            .filter(|t| is_valid_url(t.as_str()))
            .collect();
        if self.options.checks_redirects() {
            let resolved: Vec<EnrichTarget> = targets
                .iter()
                .map(|t| t.resolved(self.resolver))
                .filter(|r| is_valid_url(r.as_str()))
                .collect();
            for target in resolved {
                if !targets.contains(&target) {
                    debug!(url = target.as_str(), "adding redirect target");
                    targets.push(target);
                }
            }
        }
        targets
    }

    fn candidate_has_package(&self, candidate: &ProjectCandidate) -> bool {
        self.options.require_no_existing_package
            && self
                .options
                .distro
                .as_deref()
                .is_some_and(|d| candidate.has_package_for(d))
    }

    /// Compare candidates to one record URL using links from other sites.
    fn compare_external(
        &self,
        target: &EnrichTarget,
        candidates: &[ProjectCandidate],
        memo: &mut LinkMemo,
    ) -> Vec<ProjectCandidate> {
        let url = target.as_str();
        let canonical = canonicalize(url).with_scheme();
        let canonical_of = |u: Option<String>| u.map(|u| canonicalize(&u).with_scheme()).unwrap_or_default();
        let keys: Vec<(String, String)> = candidates
            .iter()
            .map(|c| (canonical_of(c.ecosystem_url()), canonical_of(c.backend_url())))
            .collect();

        let compatible = keys.iter().any(|(eco, backend)| {
            compatible_ecosystems(&canonical, eco) || compatible_ecosystems(&canonical, backend)
        });
        if !compatible {
            info!(%url, "skipping external match check due to incompatible ecosystems");
            return Vec::new();
        }
        let all_registries = url_ecosystem(&canonical).is_some()
            && keys
                .iter()
                .all(|(eco, backend)| url_ecosystem(eco).is_some() && url_ecosystem(backend).is_some());
        if all_registries {
            info!(%url, "no external lookup available between registry URLs");
            return Vec::new();
        }

        let record_links = self.links(target, memo);
        if record_links.is_empty() {
            debug!(%url, "no external project links found");
        } else {
            debug!(%url, links = ?record_links, "found external project links");
        }

        let mut matches: Vec<ProjectCandidate> = Vec::new();
        for candidate in candidates {
            debug!(id = candidate.id, name = %candidate.name, %url, "matching project externally");
            let found = EnrichTarget::from_candidate(candidate)
                .iter()
                .any(|check| self.check_all_links(check, url, &record_links, memo));
            if found && !matches.iter().any(|m| m.id == candidate.id) {
                matches.push(candidate.clone());
            }
        }
        matches
    }

    /// Whether one of the candidate's URLs ties back to the record URL.
    fn check_all_links(
        &self,
        check: &EnrichTarget,
        url: &str,
        record_links: &[String],
        memo: &mut LinkMemo,
    ) -> bool {
        let check_url = check.as_str();
        if urls_match(check_url, url) || record_links.iter().any(|l| urls_match(check_url, l)) {
            return true;
        }
        let project_links = self.links(check, memo);
        debug!(url = check_url, links = ?project_links, "project links");
        project_links.iter().any(|link| {
            urls_match(link, url) || record_links.iter().any(|l| urls_match(link, l))
        })
    }

    /// Whether a link found for one of the candidate's URLs is a record URL.
    fn linked_back(&self, candidate: &ProjectCandidate, urls: &[&str], memo: &mut LinkMemo) -> bool {
        EnrichTarget::from_candidate(candidate).iter().any(|target| {
            let links = self.links(target, memo);
            debug!(url = target.as_str(), links = ?links, "project links");
            links.iter().any(|link| urls.iter().any(|u| urls_match(link, u)))
        })
    }

    fn links(&self, target: &EnrichTarget, memo: &mut LinkMemo) -> Vec<String> {
        memo.entry(target.as_str().to_string())
            .or_insert_with(|| self.enricher.links(target))
            .clone()
    }
}

/// Whether any of the candidate's own URLs matches one of `urls`.
pub fn firm_match(candidate: &ProjectCandidate, urls: &[&str]) -> bool {
    candidate
        .urls()
        .iter()
        .any(|own| urls.iter().any(|u| urls_match(own, u)))
}

/// The record URL that ties the record to a candidate.
///
/// Falls back to the homepage when the tie was made through other sites.
pub fn matched_url<'r>(record: &'r PackageRecord, candidate: &ProjectCandidate) -> &'r str {
    let own = candidate.urls();
    record
        .urls()
        .into_iter()
        .find(|u| own.iter().any(|o| urls_match(o, u)))
        .unwrap_or(&record.homepage)
}
