//! External metadata lookups for project URLs.
//!
//! Enrichment is one hop deep. An [`EnrichTarget`] can only be built from
//! an input record or from a candidate project's own declared URLs, so the
//! links a site returns can never be looked up in turn.

use crate::canon::canonicalize;
use crate::records::PackageRecord;
use crate::redirect::RedirectResolver;
use crate::service::ProjectCandidate;
use relmon_hosting::{ExternalMetadata, HostingError, HttpClient, sites};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// A URL that may be looked up on its hosting site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichTarget(String);

impl EnrichTarget {
    /// The record's homepage and source URLs.
    pub fn from_record(record: &PackageRecord) -> Vec<Self> {
        record.urls().into_iter().map(|u| Self(u.to_string())).collect()
    }

    /// Where a record URL redirects to.
    pub fn resolved(&self, resolver: &dyn RedirectResolver) -> Self {
        Self(resolver.resolve(&self.0))
    }

    /// The candidate's homepage and other declared URLs.
    pub fn from_candidate(candidate: &ProjectCandidate) -> Vec<Self> {
        candidate.urls().into_iter().map(Self).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of one lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Found(ExternalMetadata),
    NotSupported,
}

/// Looks up what a hosting site says about a project.
pub trait Enricher: Send + Sync {
    fn enrich(&self, target: &EnrichTarget) -> Result<Enrichment, HostingError>;

    /// Links for the target; failures are logged and yield none.
    fn links(&self, target: &EnrichTarget) -> Vec<String> {
        match self.enrich(target) {
            Ok(Enrichment::Found(meta)) => meta.urls().into_iter().map(String::from).collect(),
            Ok(Enrichment::NotSupported) => Vec::new(),
            Err(err) if err.is_rate_limit() => {
                warn!(url = target.as_str(), error = %err, "rate limited, skipping external links");
                Vec::new()
            }
            Err(err) => {
                debug!(url = target.as_str(), error = %err, "external lookup failed");
                Vec::new()
            }
        }
    }
}

/// Enricher backed by the hosting site fetchers.
pub struct HostingEnricher {
    http: Arc<HttpClient>,
}

impl HostingEnricher {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

impl Enricher for HostingEnricher {
    fn enrich(&self, target: &EnrichTarget) -> Result<Enrichment, HostingError> {
        let canonical = canonicalize(target.as_str()).with_scheme();
        let Ok(url) = Url::parse(&canonical) else {
            return Ok(Enrichment::NotSupported);
        };
        let Some(site) = sites::find_site(&url) else {
            return Ok(Enrichment::NotSupported);
        };
        debug!(%url, site = site.site(), "fetching external metadata");
        let meta = site.fetch(&self.http, &url)?;
        debug!(%url, links = ?meta.urls(), "external metadata");
        Ok(Enrichment::Found(meta))
    }
}

/// Enricher for when external matching is disabled.
pub struct NoEnrichment;

impl Enricher for NoEnrichment {
    fn enrich(&self, _target: &EnrichTarget) -> Result<Enrichment, HostingError> {
        Ok(Enrichment::NotSupported)
    }
}
