//! Creating tracked projects for packages that have none.
//!
//! Only hosts with an [`EcosystemRule`](crate::ecosystem::EcosystemRule) are
//! supported. For code forges the release tags are checked first, so a
//! project is only created when its versions can actually be followed.

use crate::canon::is_download_url;
use crate::ecosystem::{
    Classification, Coordinates, TagProblem, TagScheme, Tags, classify, validate_tags,
};
use crate::error::Result;
use crate::records::{PackageRecord, looks_like_url, strip_prefix};
use crate::redirect::check_reachable;
use crate::service::{NewProject, ProjectWriter};
use relmon_hosting::{HostingError, HttpClient, tags};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Release tags of code forges.
pub trait TagSource: Send + Sync {
    fn github(&self, owner: &str, repo: &str) -> std::result::Result<Tags, HostingError>;
    fn gitlab(&self, owner: &str, repo: &str) -> std::result::Result<Tags, HostingError>;
}

/// Whether a URL can be fetched at all.
pub trait Reachability: Send + Sync {
    fn reachable(&self, url: &str) -> bool;
}

/// Tags and reachability straight from the web.
pub struct HttpUpstream {
    http: Arc<HttpClient>,
}

impl HttpUpstream {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

impl TagSource for HttpUpstream {
    fn github(&self, owner: &str, repo: &str) -> std::result::Result<Tags, HostingError> {
        let (names, from_releases) = tags::github_release_or_tags(&self.http, owner, repo)?;
        Ok(Tags {
            names,
            from_releases,
        })
    }

    /// The tracking service doesn't follow gitlab.com releases, so only
    /// tags are listed.
    fn gitlab(&self, owner: &str, repo: &str) -> std::result::Result<Tags, HostingError> {
        Ok(Tags {
            names: tags::gitlab_tags(&self.http, "gitlab.com", owner, repo)?,
            from_releases: false,
        })
    }
}

impl Reachability for HttpUpstream {
    fn reachable(&self, url: &str) -> bool {
        check_reachable(&self.http, url)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// The first of these that the project name starts with is removed.
    pub strip_prefixes: Vec<String>,
    pub external_check: bool,
    pub add_package: bool,
    pub distro: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    ProjectLooksLikeUrl,
    PackageLooksLikeUrl,
    DownloadHomepage,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProjectLooksLikeUrl => "project name looks like a URL",
            Self::PackageLooksLikeUrl => "package name looks like a URL",
            Self::DownloadHomepage => "cannot use a download URL as homepage",
        })
    }
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateOutcome {
    Created {
        project: String,
        package: String,
        homepage: String,
        source: String,
        ecosystem: String,
    },
    Unsupported {
        url: String,
        reason: String,
    },
    NoTags {
        url: String,
    },
    /// The tag listing could not be read.
    TagFetchFailed {
        url: String,
        reason: String,
    },
    TagParseError {
        tag: String,
        reason: String,
    },
    Rejected {
        reason: RejectReason,
    },
    Unreachable {
        url: String,
    },
}

pub struct ProjectCreator<'a> {
    writer: &'a dyn ProjectWriter,
    tags: &'a dyn TagSource,
    reach: &'a dyn Reachability,
    options: CreateOptions,
}

impl<'a> ProjectCreator<'a> {
    pub fn new(
        writer: &'a dyn ProjectWriter,
        tags: &'a dyn TagSource,
        reach: &'a dyn Reachability,
        options: CreateOptions,
    ) -> Self {
        Self {
            writer,
            tags,
            reach,
            options,
        }
    }

    /// Create the project for one record.
    ///
    /// Only tracking service failures are errors; everything else about the
    /// record is reported in the outcome.
    pub fn create(&self, record: &PackageRecord) -> Result<CreateOutcome> {
        if let Some(reason) = self.rejection(record) {
            warn!(project = %record.project, package = %record.package, "skipping: {}", reason);
            return Ok(CreateOutcome::Rejected { reason });
        }
        let source = record.source_or_homepage();

        if self.options.external_check {
            if !self.reach.reachable(&record.homepage) {
                error!(url = %record.homepage, "skipping: homepage URL is not reachable");
                return Ok(CreateOutcome::Unreachable {
                    url: record.homepage.clone(),
                });
            }
            if !self.reach.reachable(source) {
                warn!(url = source, "source URL is not reachable (ignoring)");
            }
        }

        let project = strip_prefix(&record.project, &self.options.strip_prefixes);
        info!(project, "trying to add project");
        let classification = match classify(&record.homepage, record.source.as_deref()) {
            Ok(c) => c,
            Err(err) => {
                warn!(project, "{}", err);
                return Ok(CreateOutcome::Unsupported {
                    url: err.url,
                    reason: err.reason,
                });
            }
        };
        info!(backend = classification.backend(), "found supported URL");

        let name = classification.project_name(project);
        if name != project {
            warn!(
                backend = classification.backend(),
                name, project, "using the ecosystem name, not the supplied project name"
            );
        }

        let scheme = match self.tag_scheme(&classification, name, source)? {
            Ok(scheme) => scheme,
            Err(outcome) => return Ok(outcome),
        };

        let new_project = NewProject {
            name: name.to_string(),
            homepage: record.homepage.clone(),
            backend: classification.backend().to_string(),
            version_url: classification.version_url(),
            version_prefix: scheme.prefix,
            pre_release_filter: scheme.prerelease_filter,
        };
        debug!(?new_project, releases_only = scheme.releases_only, "creating project");
        self.writer.create_project(&new_project)?;
        // The releases flag can only be set by a scan.
        self.writer
            .scan_versions(name, &record.homepage, scheme.releases_only)?;

        let ecosystem = classification.ecosystem(&record.homepage);
        if self.options.add_package {
            match &self.options.distro {
                Some(distro) => {
                    info!(package = %record.package, project = name, "adding package");
                    self.writer
                        .add_package(distro, name, &ecosystem, &record.package)?;
                }
                None => warn!(package = %record.package, "no distribution given, not adding package"),
            }
        }

        Ok(CreateOutcome::Created {
            project: name.to_string(),
            package: record.package.clone(),
            homepage: record.homepage.clone(),
            source: source.to_string(),
            ecosystem,
        })
    }

    fn rejection(&self, record: &PackageRecord) -> Option<RejectReason> {
        if looks_like_url(&record.project) {
            Some(RejectReason::ProjectLooksLikeUrl)
        } else if looks_like_url(&record.package) {
            Some(RejectReason::PackageLooksLikeUrl)
        } else if is_download_url(&record.homepage) {
            Some(RejectReason::DownloadHomepage)
        } else {
            None
        }
    }

    /// Tag scheme for the project, or the outcome that stops creation.
    fn tag_scheme(
        &self,
        classification: &Classification,
        project: &str,
        source: &str,
    ) -> Result<std::result::Result<TagScheme, CreateOutcome>> {
        let Coordinates::Forge { owner, repo } = &classification.coordinates else {
            // Registries and SourceForge use the service defaults.
            return Ok(Ok(TagScheme::default()));
        };

        let listed = if classification.backend() == "GitLab" {
            self.tags.gitlab(owner, repo)
        } else {
            self.tags.github(owner, repo)
        };
        let tags = match listed {
            Ok(tags) => tags,
            Err(HostingError::NotFound { url }) => {
                info!(%url, "no tag listing found");
                Tags::default()
            }
            Err(
                err @ (HostingError::RateLimited { .. }
                | HostingError::Transport { .. }
                | HostingError::Auth { .. }),
            ) => return Err(err.into()),
            Err(err) => {
                warn!(url = source, error = %err, "error retrieving tags");
                return Ok(Err(CreateOutcome::TagFetchFailed {
                    url: source.to_string(),
                    reason: err.to_string(),
                }));
            }
        };
        if tags.names.is_empty() {
            warn!(project, "skipping due to no tags");
            return Ok(Err(CreateOutcome::NoTags {
                url: source.to_string(),
            }));
        }

        let prefixes = classification.extra_prefixes(project);
        let checked = validate_tags(classification.rule, &tags, &prefixes).map_err(|err| {
            match err.reason {
                TagProblem::Calendar => {
                    warn!(project, tag = %err.tag, "skipping due to possible calendar release tags")
                }
                _ => warn!(project, tag = %err.tag, "skipping due to questionable release tags"),
            }
            debug!(tags = ?tags.names, "tags");
            CreateOutcome::TagParseError {
                tag: err.tag,
                reason: err.reason.to_string(),
            }
        });
        Ok(checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl ProjectWriter for Recorder {
        fn add_package(&self, distro: &str, project: &str, ecosystem: &str, package: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("add {} {} {} {}", distro, project, ecosystem, package));
            Ok(())
        }

        fn create_project(&self, project: &NewProject) -> Result<()> {
            self.calls.lock().unwrap().push(format!(
                "create {} {} {:?} {:?} {:?}",
                project.name,
                project.backend,
                project.version_url,
                project.version_prefix,
                project.pre_release_filter
            ));
            Ok(())
        }

        fn scan_versions(&self, name: &str, _homepage: &str, releases_only: bool) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("scan {} {}", name, releases_only));
            Ok(())
        }
    }

    struct Fixed {
        tags: Vec<&'static str>,
        reachable: bool,
    }

    impl TagSource for Fixed {
        fn github(&self, _owner: &str, _repo: &str) -> std::result::Result<Tags, HostingError> {
            Ok(Tags {
                names: self.tags.iter().map(|t| t.to_string()).collect(),
                from_releases: true,
            })
        }

        fn gitlab(&self, _owner: &str, _repo: &str) -> std::result::Result<Tags, HostingError> {
            Ok(Tags {
                names: self.tags.iter().map(|t| t.to_string()).collect(),
                from_releases: false,
            })
        }
    }

    impl Reachability for Fixed {
        fn reachable(&self, _url: &str) -> bool {
            self.reachable
        }
    }

    /// Tag listing that always fails with the same error.
    struct Broken(fn() -> HostingError);

    impl TagSource for Broken {
        fn github(&self, _owner: &str, _repo: &str) -> std::result::Result<Tags, HostingError> {
            Err((self.0)())
        }

        fn gitlab(&self, _owner: &str, _repo: &str) -> std::result::Result<Tags, HostingError> {
            Err((self.0)())
        }
    }

    impl Reachability for Broken {
        fn reachable(&self, _url: &str) -> bool {
            true
        }
    }

    fn options() -> CreateOptions {
        CreateOptions {
            strip_prefixes: vec!["python-".into()],
            external_check: true,
            add_package: true,
            distro: Some("NixOS".into()),
        }
    }

    #[test]
    fn test_create_github_project() {
        let writer = Recorder::default();
        let upstream = Fixed {
            tags: vec!["v1.0", "v1.1"],
            reachable: true,
        };
        let creator = ProjectCreator::new(&writer, &upstream, &upstream, options());
        let record = PackageRecord::new("frob", "frob", "https://frob.example/")
            .with_source("https://github.com/frob/frob");
        let outcome = creator.create(&record).unwrap();
        assert!(matches!(outcome, CreateOutcome::Created { ref ecosystem, .. } if ecosystem == "https://frob.example/"));
        assert_eq!(
            *writer.calls.lock().unwrap(),
            vec![
                r#"create frob GitHub Some("frob/frob") "v" """#.to_string(),
                "scan frob true".to_string(),
                "add NixOS frob https://frob.example/ frob".to_string(),
            ]
        );
    }

    #[test]
    fn test_bad_tags_abort_creation() {
        let writer = Recorder::default();
        let upstream = Fixed {
            tags: vec!["v1.0", "nightly"],
            reachable: true,
        };
        let creator = ProjectCreator::new(&writer, &upstream, &upstream, options());
        let record = PackageRecord::new("frob", "frob", "https://github.com/frob/frob");
        let outcome = creator.create(&record).unwrap();
        assert_eq!(
            outcome,
            CreateOutcome::TagParseError {
                tag: "nightly".into(),
                reason: "questionable release tag".into(),
            }
        );
        assert!(writer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tag_listing_rate_limit_stops_run() {
        let writer = Recorder::default();
        let upstream = Broken(|| HostingError::RateLimited {
            host: "api.github.com".into(),
        });
        let creator = ProjectCreator::new(&writer, &upstream, &upstream, options());
        let record = PackageRecord::new("frob", "frob", "https://github.com/frob/frob");
        let err = creator.create(&record).unwrap_err();
        assert!(matches!(err, crate::Error::RateLimited { ref host } if host == "api.github.com"));
        assert!(err.is_fatal());
        assert!(writer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tag_listing_errors_are_not_empty_listings() {
        let writer = Recorder::default();
        let record = PackageRecord::new("frob", "frob", "https://github.com/frob/frob");

        let upstream = Broken(|| HostingError::Status {
            url: "https://api.github.com/repos/frob/frob/tags".into(),
            code: 502,
        });
        let creator = ProjectCreator::new(&writer, &upstream, &upstream, options());
        assert!(matches!(
            creator.create(&record).unwrap(),
            CreateOutcome::TagFetchFailed { ref reason, .. } if reason.contains("502")
        ));

        let upstream = Broken(|| HostingError::NotFound {
            url: "https://api.github.com/repos/frob/frob/tags".into(),
        });
        let creator = ProjectCreator::new(&writer, &upstream, &upstream, options());
        assert!(matches!(creator.create(&record).unwrap(), CreateOutcome::NoTags { .. }));
        assert!(writer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_tags() {
        let writer = Recorder::default();
        let upstream = Fixed {
            tags: vec![],
            reachable: true,
        };
        let creator = ProjectCreator::new(&writer, &upstream, &upstream, options());
        let record = PackageRecord::new("frob", "frob", "https://gitlab.com/frob/frob");
        assert!(matches!(creator.create(&record).unwrap(), CreateOutcome::NoTags { .. }));
    }

    #[test]
    fn test_registry_name_replaces_project_name() {
        let writer = Recorder::default();
        let upstream = Fixed {
            tags: vec![],
            reachable: true,
        };
        let creator = ProjectCreator::new(&writer, &upstream, &upstream, options());
        let record = PackageRecord::new("python-frob", "python3-frob", "https://pypi.org/project/frob_lib/");
        let outcome = creator.create(&record).unwrap();
        assert!(matches!(outcome, CreateOutcome::Created { ref project, ref ecosystem, .. }
            if project == "frob-lib" && ecosystem == "pypi"));
        assert_eq!(writer.calls.lock().unwrap()[0], r#"create frob-lib PyPI None "" """#);
    }

    #[test]
    fn test_rejections_and_reachability() {
        let writer = Recorder::default();
        let down = Fixed {
            tags: vec!["1.0"],
            reachable: false,
        };
        let creator = ProjectCreator::new(&writer, &down, &down, options());
        let record = PackageRecord::new("https://x.example/", "x", "https://x.example/");
        assert_eq!(
            creator.create(&record).unwrap(),
            CreateOutcome::Rejected {
                reason: RejectReason::ProjectLooksLikeUrl
            }
        );
        let record = PackageRecord::new("x", "x", "https://x.example/x-1.0.tar.gz");
        assert_eq!(
            creator.create(&record).unwrap(),
            CreateOutcome::Rejected {
                reason: RejectReason::DownloadHomepage
            }
        );
        let record = PackageRecord::new("x", "x", "https://github.com/x/x");
        assert!(matches!(creator.create(&record).unwrap(), CreateOutcome::Unreachable { .. }));
        assert!(writer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_host() {
        let writer = Recorder::default();
        let upstream = Fixed {
            tags: vec![],
            reachable: true,
        };
        let creator = ProjectCreator::new(&writer, &upstream, &upstream, options());
        let record = PackageRecord::new("x", "x", "https://x.example/");
        assert!(matches!(creator.create(&record).unwrap(), CreateOutcome::Unsupported { .. }));
    }
}
