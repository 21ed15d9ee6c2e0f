//! Project metadata from code hosting sites and package registries.
//!
//! This crate answers one question: given the canonical URL of a project on
//! some hosting site, which homepage and repository links does that site
//! declare? It also lists release tags on code forges.
//!
//! # Example
//!
//! ```ignore
//! use relmon_hosting::{HttpClient, sites};
//! use url::Url;
//!
//! let http = HttpClient::new();
//! let url = Url::parse("https://github.com/curl/curl")?;
//! if let Some(site) = sites::find_site(&url) {
//!     let meta = site.fetch(&http, &url)?;
//!     println!("{:?}", meta.urls());
//! }
//! ```

pub mod html;
pub mod http;
pub mod ratelimit;
pub mod sites;
pub mod tags;
mod types;

pub use http::{HttpClient, RawResponse, RetryPolicy};
pub use ratelimit::{Rate, RateLimiter};
pub use types::{ExternalMetadata, HostingError, SiteFetcher};
