//! relmon - match distribution packages to release-monitoring projects.
//!
//! Given package records (`project package homepage [source]`), relmon finds
//! the project on a release tracking service (Anitya) that the package
//! belongs to, or creates one when none exists. A package is only ever
//! associated with a project after one of its URLs has been shown
//! equivalent to a URL from that project's own metadata.
//!
//! - [`canon`]: URL canonicalization and equivalence
//! - [`redirect`]: redirect resolution for input URLs
//! - [`enrich`]: one-hop links from hosting sites
//! - [`service`]: the tracking service client
//! - [`matching`] and [`policy`]: the match engine
//! - [`ecosystem`] and [`create`]: project creation
//!
//! # Example
//!
//! ```ignore
//! use relmon::{MatchEngine, MatchOptions, PackageRecord};
//! use relmon::enrich::NoEnrichment;
//! use relmon::redirect::NoRedirects;
//!
//! let engine = MatchEngine::new(&client, &NoRedirects, &NoEnrichment, MatchOptions::default());
//! let record = PackageRecord::parse("gnumake gnumake https://www.gnu.org/software/make/")?;
//! let result = engine.match_existing(&record, &known_packages)?;
//! ```

pub mod canon;
pub mod commands;
pub mod config;
pub mod create;
pub mod ecosystem;
pub mod enrich;
pub mod error;
pub mod matching;
pub mod policy;
pub mod records;
pub mod redirect;
pub mod rpm;
pub mod service;

pub use canon::{CanonicalUrl, canonicalize, urls_match};
pub use error::{Error, Result};
pub use matching::{MatchEngine, MatchOptions, MatchResult, SkipReason};
pub use policy::AmbiguityPolicy;
pub use records::PackageRecord;
pub use service::{ProjectCandidate, ProjectSearch, ProjectWriter};
