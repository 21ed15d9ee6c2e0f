//! Registry dispatch tests, plus network tests for the site fetchers.
//!
//! The network tests hit real sites and are disabled by default.
//! Run with: cargo test -p relmon-hosting --features test-network

use super::*;
use crate::HttpClient;

fn site_for(url: &str) -> Option<&'static str> {
    find_site(&Url::parse(url).unwrap()).map(|s| s.site())
}

#[test]
fn test_dispatch_by_host() {
    assert_eq!(site_for("https://github.com/a/b"), Some("github"));
    assert_eq!(site_for("https://gitlab.com/a/b"), Some("gitlab"));
    assert_eq!(site_for("https://gitlab.gnome.org/GNOME/gtk"), Some("gitlab-instance"));
    assert_eq!(
        site_for("https://gitlab.freedesktop.org/xorg/xserver"),
        Some("gitlab-shortpages")
    );
    assert_eq!(site_for("https://pypi.org/project/requests"), Some("pypi"));
    assert_eq!(site_for("https://crates.io/crates/serde"), Some("crates.io"));
    assert_eq!(site_for("https://metacpan.org/dist/Moose"), Some("metacpan"));
    assert_eq!(site_for("https://sourceforge.net/projects/x"), Some("sourceforge"));
    assert_eq!(site_for("https://npmjs.org/package/x"), Some("npm"));
    assert_eq!(site_for("https://npmjs.com/package/x"), Some("npmjs"));
    assert_eq!(site_for("https://rubygems.org/gems/rake"), Some("rubygems"));
    assert_eq!(
        site_for("https://central.sonatype.com/artifact/g/a"),
        Some("maven")
    );
    assert_eq!(site_for("https://launchpad.net/widget"), Some("launchpad"));
    assert_eq!(site_for("https://savannah.gnu.org/projects/make"), Some("savannah"));
    assert_eq!(
        site_for("https://savannah.nongnu.org/projects/lwip"),
        Some("savannah-nongnu")
    );
    assert_eq!(site_for("https://opam.ocaml.org/packages/dune"), Some("opam"));
    assert_eq!(site_for("https://flask.readthedocs.io/"), Some("readthedocs"));
    assert_eq!(site_for("https://invent.kde.org/a/b"), None);
    assert_eq!(site_for("https://example.org/"), None);
}

#[test]
fn test_registry_order_is_stable() {
    let sites: Vec<&str> = all_sites().iter().map(|site| site.site()).collect();
    assert_eq!(sites.first(), Some(&"github"));
    assert_eq!(sites.last(), Some(&"readthedocs"));
    let mut unique = sites.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), sites.len());
    assert!(sites.contains(&"maven"));
}

#[test]
fn test_unsafe_path_rejected_before_request() {
    // A client that could never reach anything: the error must come from
    // path validation, not from the network.
    let http = HttpClient::with_timeout(std::time::Duration::from_millis(1));
    let url = Url::parse("https://github.com/own%20er/repo").unwrap();
    let err = github::GitHub.fetch(&http, &url).unwrap_err();
    assert!(matches!(err, crate::HostingError::UnsafePath(_)));
}

#[cfg(feature = "test-network")]
mod network {
    use super::*;

    fn fetch(url: &str) -> crate::ExternalMetadata {
        let url = Url::parse(url).unwrap();
        let site = find_site(&url).expect("supported site");
        let result = site.fetch(&HttpClient::new(), &url);
        assert!(
            result.is_ok(),
            "{} fetch({}) failed: {:?}",
            site.site(),
            url,
            result.err()
        );
        let meta = result.unwrap();
        println!("{}: {:?}", site.site(), meta.urls());
        meta
    }

    #[test]
    fn test_github() {
        let meta = fetch("https://github.com/curl/curl");
        assert!(meta.homepage.is_some());
    }

    #[test]
    fn test_gitlab_com() {
        let meta = fetch("https://gitlab.com/gitlab-org/gitlab-runner");
        assert!(
            meta.links
                .contains(&"https://gitlab-org.gitlab.io/gitlab-runner".to_string())
        );
    }

    #[test]
    fn test_pypi() {
        assert!(!fetch("https://pypi.org/project/requests").is_empty());
    }

    #[test]
    fn test_crates_io() {
        assert!(!fetch("https://crates.io/crates/serde").is_empty());
    }

    #[test]
    fn test_metacpan() {
        assert!(!fetch("https://metacpan.org/dist/Moose").is_empty());
    }

    #[test]
    fn test_npm() {
        assert!(!fetch("https://npmjs.org/package/express").is_empty());
    }

    #[test]
    fn test_rubygems() {
        assert!(!fetch("https://rubygems.org/gems/rake").is_empty());
    }

    #[test]
    fn test_maven() {
        assert!(!fetch("https://central.sonatype.com/artifact/com.google.guava/guava").is_empty());
    }

    #[test]
    fn test_savannah() {
        assert!(!fetch("https://savannah.gnu.org/projects/make").is_empty());
    }
}
