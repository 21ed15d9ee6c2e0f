//! URL canonicalization and project URL equivalence.
//!
//! Canonical keys drop everything that does not help tell projects apart:
//! scheme, `www.`, default ports, fragments, trailing slashes, default
//! documents and `.git`. Well-known hosting sites are then reduced to their
//! project page, so that a download link and a homepage of the same
//! project produce the same key.
//!
//! Keys are scheme-less (`//host/path`); [`CanonicalUrl::with_scheme`]
//! gives the `https:` form used for lookups.

use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-+.a-zA-Z0-9]+:").unwrap());

static AUTHORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:([-+.a-zA-Z0-9]+):)?//([^/?#]*)(.*)$").unwrap());

static VALID_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:https?|ftps?)://[^/?#]+").unwrap());

static DOWNLOAD_ARCHIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^/]\.(tar|zip|lzh|rar|cab|tgz|tbz|txz|jar)(\.\w{1,5})?$").unwrap()
});

/// A file name that is `-<version>.<archive>` once its project name is removed.
static VERSIONED_ARCHIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\d[\w.]*\.(tar|zip|lzh|rar|cab|tgz|tbz|txz|jar)(\.\w{1,5})?$").unwrap()
});

static VERSION_DIR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9.]+$").unwrap());

/// Suffixes removed from the end of every URL, in this order.
const STRIPPED_SUFFIXES: &[&str] = &[
    "/index.html",
    "/index.htm",
    "/index.asp",
    "/index.php",
    "/index.jsp",
    ".git",
];

/// Default documents that are not stripped but still match their directory.
const DEFAULT_DOCUMENTS: &[&str] = &[
    "index.shtml",
    "index.xhtml",
    "default.htm",
    "default.html",
    "default.asp",
    "default.aspx",
    "home.htm",
    "home.html",
    "main.htm",
    "main.html",
];

/// Upper bound on rewrite passes; real URLs settle in two or three.
const MAX_PASSES: usize = 64;

#[derive(Debug, Clone, Copy)]
enum Rewrite {
    /// Expand a `$1`-style template.
    Template(&'static str),
    /// `<user>.github.io/<repo>` to the GitHub repository.
    GitHubPages,
    /// Group 1 is a PyPI project name.
    PypiName,
    /// Group 1 is a full PyPI project key.
    PypiKey,
    /// Group 1 is a slash-separated Maven group, group 2 the artifact.
    Maven,
}

/// Site rules, tried in order; the first match produces the final key.
static SITE_RULES: LazyLock<Vec<(Regex, Rewrite)>> = LazyLock::new(|| {
    use Rewrite::*;
    let rules: &[(&str, Rewrite)] = &[
        // SourceForge download, homepage, short homepage, project pages
        (
            r"^//(?:download|downloads|prdownloads)\.sourceforge\.net/(?:project/)?([^/#?]+)",
            Template("//sourceforge.net/projects/$1"),
        ),
        (
            r"^//([^/.]+)\.sourceforge\.(?:net|io)(?:/.*)?$",
            Template("//sourceforge.net/projects/$1"),
        ),
        (
            r"^//([^/.]+)\.sf\.net(?:/.*)?$",
            Template("//sourceforge.net/projects/$1"),
        ),
        (r"^(//sourceforge\.net/projects/[^/#?]+)", Template("$1")),
        // GitHub
        (r"^(//github\.com/[^/#?]+/[^/#?]+)", Template("$1")),
        (r"^//([^/.]+)\.github\.io/([^/#?]+)", GitHubPages),
        // PyPI
        (r"^//pypi\.python\.org/(?:pypi|project)/([^/#?]+)", PypiName),
        (
            r"//(?:files\.pythonhosted\.org|pypi\.python\.org|pypi\.io)/packages/source/./([^/#?]+)",
            PypiName,
        ),
        (r"//pythonhosted\.org/([^/#?]+)", PypiName),
        (r"^(//pypi\.org/project/[^/#?]+)", PypiKey),
        // RubyGems gem files and version pages
        (
            r"^//rubygems\.org/(?:gems|downloads)/([^/#?]+?)-\d[^/#?]*\.gem$",
            Template("//rubygems.org/gems/$1"),
        ),
        (r"^(//rubygems\.org/gems/[^/#?]+)", Template("$1")),
        // crates.io downloads
        (
            r"^//crates\.io/api/v1/crates/([^/#?]+)",
            Template("//crates.io/crates/$1"),
        ),
        // CPAN
        (
            r"^//search\.cpan\.org/dist/([^/#?]+)/?$",
            Template("//metacpan.org/dist/$1"),
        ),
        (
            r"^//metacpan\.org/release/([^/#?]+)/?$",
            Template("//metacpan.org/dist/$1"),
        ),
        // Pagure
        (
            r"^//releases\.pagure\.org/([^/#?]+)",
            Template("//pagure.io/$1"),
        ),
        (r"^//pagure\.org/([^/#?]+)", Template("//pagure.io/$1")),
        // GNU
        (
            r"^//gnu\.org/software/([^/#?]+)",
            Template("//gnu.org/software/$1"),
        ),
        (
            r"^//(?:ftp|alpha)\.gnu\.org/(?:pub/)?gnu/([^/#?]+)",
            Template("//gnu.org/software/$1"),
        ),
        (
            r"^//(?:savannah|sv)\.gnu\.org/p(?:r(?:ojects)?)?/([^/#?]+)",
            Template("//savannah.gnu.org/projects/$1"),
        ),
        (
            r"^//download\.savannah\.gnu\.org/releases/([^/#?]+)",
            Template("//savannah.gnu.org/projects/$1"),
        ),
        (
            r"^//(?:savannah|sv)\.nongnu\.org/p(?:r(?:ojects)?)?/([^/#?]+)",
            Template("//savannah.nongnu.org/projects/$1"),
        ),
        (
            r"^//download\.savannah\.nongnu\.org/releases/([^/#?]+)",
            Template("//savannah.nongnu.org/projects/$1"),
        ),
        // GNOME
        (
            r"^//download\.gnome\.org/sources/([^/#?]+)",
            Template("//download.gnome.org/sources/$1"),
        ),
        (
            r"^//ftp\.gnome\.org/pub/(?:GNOME|gnome)/sources/([^/#?]+)",
            Template("//download.gnome.org/sources/$1"),
        ),
        // npm registry tarballs
        (
            r"^//registry\.(npmjs\.(?:org|com))/([^/#?]+)",
            Template("//$1/package/$2"),
        ),
        // Maven repository paths; the download form must be tried first
        (
            r"^//repo1\.maven\.org/maven2/(.+)/([^/]+)/(?:maven-metadata\.xml|\d[-.\w]+/[^/]+\.(?:zip|jar|tar\..z|pom))$",
            Maven,
        ),
        (r"^//repo1\.maven\.org/maven2/(.+)/([^/]+)/?$", Maven),
    ];
    rules
        .iter()
        .map(|(pattern, rewrite)| (Regex::new(pattern).unwrap(), *rewrite))
        .collect()
});

/// Hosts whose canonical URLs belong to a single language registry.
const ECOSYSTEM_HOSTS: &[(&str, &str)] = &[
    ("pypi.org", "pypi"),
    ("npmjs.org", "npm"),
    ("npmjs.com", "npmjs"),
    ("crates.io", "crates.io"),
    ("rubygems.org", "rubygems"),
];

/// Registries that can never describe the same project as one another.
const MUTUALLY_INCOMPATIBLE_ECOSYSTEMS: &[&str] =
    &["pypi", "npm", "npmjs", "crates.io", "rubygems", "maven"];

/// A canonical comparison key for a project URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The key as an `https:` URL, or the bare key if it has no authority.
    pub fn with_scheme(&self) -> String {
        if self.0.starts_with('/') {
            format!("https:{}", self.0)
        } else {
            self.0.clone()
        }
    }

    /// Host part of the key.
    pub fn host(&self) -> &str {
        authority_of(&self.0)
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a URL. Never fails; junk in gives junk out.
pub fn canonicalize(url: &str) -> CanonicalUrl {
    let mut current = url.trim().to_string();
    for _ in 0..MAX_PASSES {
        let next = canonicalize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    CanonicalUrl(current)
}

fn canonicalize_pass(url: &str) -> String {
    let url = url.split('#').next().unwrap_or_default();
    let mut url = normalize_authority(url);

    let trimmed = url.trim_end_matches('/');
    let mut trimmed = trimmed.to_string();
    for suffix in STRIPPED_SUFFIXES {
        if let Some(rest) = trimmed.strip_suffix(suffix) {
            trimmed = rest.to_string();
        }
    }
    url = SCHEME_RE.replace(&trimmed, "").into_owned();

    if let Some(rest) = url.strip_prefix("//www.") {
        url = format!("//{}", rest);
    }
    if let Some(rest) = url.strip_prefix("//sf.net/") {
        url = format!("//sourceforge.net/{}", rest);
    }
    if let Some(rest) = url.strip_prefix("//sourceforge.net/p/") {
        url = format!("//sourceforge.net/projects/{}", rest);
    }
    if let Some(rest) = url.strip_prefix("//gnu.org/s/") {
        url = format!("//gnu.org/software/{}", rest);
    }

    for (re, rewrite) in SITE_RULES.iter() {
        if let Some(caps) = re.captures(&url) {
            return apply_rewrite(&caps, *rewrite);
        }
    }

    strip_versioned_archive(&url).unwrap_or(url)
}

/// Lowercase the scheme and host and drop default ports.
///
/// Keys lose their scheme, so the web ports are dropped whatever the
/// scheme was; the ftp port only when the scheme says ftp.
fn normalize_authority(url: &str) -> String {
    let Some(caps) = AUTHORITY_RE.captures(url) else {
        return url.to_string();
    };
    let scheme = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
    let mut authority = caps[2].to_ascii_lowercase();
    let ftp_port = (scheme.as_deref() == Some("ftp")).then_some(":21");
    let default_ports = [Some(":80"), Some(":443"), ftp_port];
    if let Some(stripped) = default_ports
        .into_iter()
        .flatten()
        .find_map(|port| authority.strip_suffix(port))
    {
        authority = stripped.to_string();
    }
    match scheme {
        Some(scheme) => format!("{}://{}{}", scheme, authority, &caps[3]),
        None => format!("//{}{}", authority, &caps[3]),
    }
}

fn apply_rewrite(caps: &Captures, rewrite: Rewrite) -> String {
    match rewrite {
        Rewrite::Template(template) => {
            let mut out = String::new();
            caps.expand(template, &mut out);
            out
        }
        Rewrite::GitHubPages => {
            let url = format!("//github.com/{}/{}", &caps[1], &caps[2]);
            [".html", ".htm", ".xhtml"]
                .iter()
                .find_map(|ext| url.strip_suffix(ext))
                .map(String::from)
                .unwrap_or(url)
        }
        Rewrite::PypiName => format!("//pypi.org/project/{}", caps[1].replace('_', "-")),
        Rewrite::PypiKey => caps[1].replace('_', "-"),
        Rewrite::Maven => format!(
            "//central.sonatype.com/artifact/{}/{}",
            caps[1].replace('/', "."),
            &caps[2]
        ),
    }
}

/// `.../<name>/[<version>/]<name>-<version>.<archive>` to `.../<name>`.
fn strip_versioned_archive(url: &str) -> Option<String> {
    let rest = url.strip_prefix("//")?;
    let path_start = rest.find('/')?;
    let segments: Vec<&str> = rest[path_start + 1..].split('/').collect();
    let (file, dirs) = segments.split_last()?;

    let candidates = [
        dirs.len().checked_sub(1),
        dirs.len()
            .checked_sub(2)
            .filter(|_| dirs.last().is_some_and(|v| VERSION_DIR_RE.is_match(v))),
    ];
    for index in candidates.into_iter().flatten() {
        let name = dirs[index];
        if name.chars().count() < 3 {
            continue;
        }
        let is_versioned = file
            .strip_prefix(name)
            .is_some_and(|tail| VERSIONED_ARCHIVE_RE.is_match(tail));
        if is_versioned {
            let kept = dirs[..=index].join("/");
            return Some(format!("//{}/{}", &rest[..path_start], kept));
        }
    }
    None
}

fn authority_of(url: &str) -> &str {
    let rest = match url.find("//") {
        Some(i) => &url[i + 2..],
        None => return "",
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

/// Whether two project URLs point at the same project.
///
/// Reflexive and symmetric but not transitive: the case rule and the
/// default-document rule don't chain.
pub fn urls_match(a: &str, b: &str) -> bool {
    if a.trim().is_empty() || b.trim().is_empty() {
        return false;
    }
    keys_match(&canonicalize(a), &canonicalize(b))
}

/// [`urls_match`] on already canonical keys.
pub fn keys_match(a: &CanonicalUrl, b: &CanonicalUrl) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b
        || a.0.eq_ignore_ascii_case(&b.0)
        || differs_by_default_document(&a.0, &b.0)
        || differs_by_default_document(&b.0, &a.0)
}

fn differs_by_default_document(long: &str, short: &str) -> bool {
    long.strip_prefix(short)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|doc| DEFAULT_DOCUMENTS.contains(&doc))
}

/// Whether this is an absolute http(s)/ftp(s) URL with a host.
pub fn is_valid_url(url: &str) -> bool {
    VALID_URL_RE.is_match(url)
}

/// Whether the URL looks like a release archive.
pub fn is_download_url(url: &str) -> bool {
    DOWNLOAD_ARCHIVE_RE.is_match(url)
}

/// The registry a (canonical) URL belongs to, keyed by its host.
pub fn url_ecosystem(url: &str) -> Option<&'static str> {
    let host = authority_of(url).to_ascii_lowercase();
    ECOSYSTEM_HOSTS
        .iter()
        .find(|(h, _)| *h == host)
        .map(|(_, eco)| *eco)
}

/// Whether two canonical URLs could possibly belong to the same project.
///
/// URLs on two different language registries never can, except npm's two
/// domains.
pub fn compatible_ecosystems(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (eco_a, eco_b) = (url_ecosystem(a), url_ecosystem(b));
    tracing::trace!(?eco_a, ?eco_b, "comparing ecosystems");
    if eco_a == eco_b {
        return true;
    }
    let npm = [Some("npm"), Some("npmjs")];
    if npm.contains(&eco_a) && npm.contains(&eco_b) {
        return true;
    }
    let exclusive = |eco: Option<&str>| eco.is_some_and(|e| MUTUALLY_INCOMPATIBLE_ECOSYSTEMS.contains(&e));
    !exclusive(eco_a) || !exclusive(eco_b)
}

/// Registry and package name from a canonical registry URL.
pub fn registry_name(url: &str) -> Option<(&'static str, String)> {
    let ecosystem = url_ecosystem(url)?;
    let host = authority_of(url);
    let start = url.find(host)? + host.len();
    let name = url[start..].split('/').nth(2)?;
    if name.is_empty() {
        return None;
    }
    Some((ecosystem, name.to_string()))
}

/// Switch between `http:` and `https:`.
pub fn swap_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("http://") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("https://") {
        format!("http://{}", rest)
    } else {
        url.to_string()
    }
}

/// Add or remove a `www.` host prefix.
pub fn swap_www(url: &str) -> String {
    let Some(i) = url.find("://") else {
        return url.to_string();
    };
    let (scheme, rest) = url.split_at(i + 3);
    match rest.strip_prefix("www.") {
        Some(bare) => format!("{}{}", scheme, bare),
        None => format!("{}www.{}", scheme, rest),
    }
}

/// Spellings of the given URLs that the tracking service may have stored.
pub fn search_variants<'a, I>(urls: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut variants: BTreeSet<String> = urls.into_iter().map(String::from).collect();
    extend_variants(&mut variants, |u| u.ends_with('/').then(|| format!("{}index.html", u)));
    extend_variants(&mut variants, |u| u.ends_with('/').then(|| format!("{}index.htm", u)));
    extend_variants(&mut variants, |u| {
        (!u.ends_with('/') && !u.ends_with(".html") && !u.ends_with(".htm"))
            .then(|| format!("{}/", u))
    });
    extend_variants(&mut variants, |u| Some(swap_scheme(u)));
    extend_variants(&mut variants, |u| Some(swap_www(u)));
    extend_variants(&mut variants, |u| Some(swap_scheme(u)));
    variants
}

fn extend_variants(variants: &mut BTreeSet<String>, f: impl Fn(&str) -> Option<String>) {
    let added: Vec<String> = variants.iter().filter_map(|u| f(u)).collect();
    variants.extend(added);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_is_valid_url() {
        for url in [
            "https://example.com/path/file.htm",
            "ftp://something",
            "http://user@host.example:9/foo/bar/?baz&bla#f",
            "http://a/b",
            "HTTPS://example.com",
        ] {
            assert!(is_valid_url(url), "{}", url);
        }
        for url in [
            "//example.com/path/file.htm",
            "ftp:/path",
            "://user@host.example:9/foo/bar/?baz&bla#f",
            "file:///b",
            "http:///path",
        ] {
            assert!(!is_valid_url(url), "{}", url);
        }
    }

    #[test]
    fn test_canonicalize() {
        let cases = [
            ("https://example.com/path/file.htm", "//example.com/path/file.htm"),
            ("https://example.com/path/file.htm#ANCHOR", "//example.com/path/file.htm"),
            ("ftp://example.com/path/", "//example.com/path"),
            ("http://example.com/path/index.htm", "//example.com/path"),
            ("https://www.example.com/path", "//example.com/path"),
            ("HTTPS://WWW.Example.COM:443/Path/", "//example.com/Path"),
            ("http://example.com:80/", "//example.com"),
            ("http://example.com:8080/", "//example.com:8080"),
            ("https://sf.net/projects/xyzzy", "//sourceforge.net/projects/xyzzy"),
            ("https://sf.net/p/xyzzy", "//sourceforge.net/projects/xyzzy"),
            ("https://xyzzy.sourceforge.net/page", "//sourceforge.net/projects/xyzzy"),
            ("https://xyzzy.sf.net/page", "//sourceforge.net/projects/xyzzy"),
            ("https://download.sourceforge.net/proj", "//sourceforge.net/projects/proj"),
            (
                "https://download.sourceforge.net/project/xyzzy/XyZZy/1.2.3/xyzzy-1.2.3.zip",
                "//sourceforge.net/projects/xyzzy",
            ),
            ("https://www.sourceforge.net/p/xyzzy/files/", "//sourceforge.net/projects/xyzzy"),
            ("https://xyzzy.sourceforge.io/page", "//sourceforge.net/projects/xyzzy"),
            (
                "https://prdownloads.sourceforge.net/proj/proj-0.12.tar.bz2",
                "//sourceforge.net/projects/proj",
            ),
            ("https://gnu.org/s/xyzzy/more-but/ignored", "//gnu.org/software/xyzzy"),
            ("http://ftp.gnu.org/pub/gnu/xyzzy/some-file-123.tar.gz", "//gnu.org/software/xyzzy"),
            ("http://ftp.gnu.org/gnu/xyzzy/some-file-123.tar.gz", "//gnu.org/software/xyzzy"),
            ("http://alpha.gnu.org/gnu/xyzzy/some-file-123.tar.gz", "//gnu.org/software/xyzzy"),
            ("https://github.com/proj/user.git", "//github.com/proj/user"),
            ("git://github.com/proj/user.git", "//github.com/proj/user"),
            ("git+https://github.com/proj/user.foo.git", "//github.com/proj/user.foo"),
            ("https://github.com/proj/user/tarball/master", "//github.com/proj/user"),
            ("https://github.com/proj-only/", "//github.com/proj-only"),
            ("https://github.com/proj/user#readme", "//github.com/proj/user"),
            ("https://xyzzy.github.io/repo/more.htm", "//github.com/xyzzy/repo"),
            ("https://xyzzy.github.io/repo.html", "//github.com/xyzzy/repo"),
            ("https://xyzzy.github.io/", "//xyzzy.github.io"),
            ("https://rubygems.org/gems/xyzzy/versions/1.2.3", "//rubygems.org/gems/xyzzy"),
            ("https://rubygems.org/gems/xyzzy-1.2.3.gem", "//rubygems.org/gems/xyzzy"),
            ("https://rubygems.org/downloads/ok_gem-0.1.beta1.gem", "//rubygems.org/gems/ok_gem"),
            ("https://pypi.org/project/xyzzy/1.2.3", "//pypi.org/project/xyzzy"),
            ("https://pypi.python.org/pypi/xyzzy/more", "//pypi.org/project/xyzzy"),
            ("https://pypi.python.org/project/xyzzy/more", "//pypi.org/project/xyzzy"),
            ("https://pypi.python.org/pypi/dash-name", "//pypi.org/project/dash-name"),
            ("https://pypi.python.org/pypi/underscore_name", "//pypi.org/project/underscore-name"),
            (
                "https://pypi.python.org/packages/source/h/huggabugga/huggabugga-1.2.3.tar.gz",
                "//pypi.org/project/huggabugga",
            ),
            (
                "https://pypi.io/packages/source/x/xcellent-ex/xcellent-ex-openid-3.2.1.tar.gz",
                "//pypi.org/project/xcellent-ex",
            ),
            ("https://pypi.org/project/under_score_name", "//pypi.org/project/under-score-name"),
            (
                "https://files.pythonhosted.org/packages/source/u/under_score_name",
                "//pypi.org/project/under-score-name",
            ),
            ("https://pythonhosted.org/some-project/", "//pypi.org/project/some-project"),
            ("https://search.cpan.org/dist/xyzzy", "//metacpan.org/dist/xyzzy"),
            ("https://metacpan.org/release/xyzzy", "//metacpan.org/dist/xyzzy"),
            ("https://metacpan.org/dist/xyzzy/", "//metacpan.org/dist/xyzzy"),
            ("https://releases.pagure.org/some-project/", "//pagure.io/some-project"),
            ("https://pagure.org/some-project/", "//pagure.io/some-project"),
            ("http://download.savannah.gnu.org/releases/abcd/", "//savannah.gnu.org/projects/abcd"),
            ("http://savannah.gnu.org/projects/abcd/", "//savannah.gnu.org/projects/abcd"),
            ("http://sv.gnu.org/projects/abcd/", "//savannah.gnu.org/projects/abcd"),
            ("http://savannah.gnu.org/p/abcd/", "//savannah.gnu.org/projects/abcd"),
            ("http://savannah.gnu.org/pr/abcd/", "//savannah.gnu.org/projects/abcd"),
            (
                "http://download.savannah.nongnu.org/releases/abcd/",
                "//savannah.nongnu.org/projects/abcd",
            ),
            ("http://savannah.nongnu.org/projects/abcd/", "//savannah.nongnu.org/projects/abcd"),
            ("http://sv.nongnu.org/projects/abcd/", "//savannah.nongnu.org/projects/abcd"),
            ("http://savannah.nongnu.org/p/abcd/", "//savannah.nongnu.org/projects/abcd"),
            ("http://savannah.nongnu.org/pr/abcd/", "//savannah.nongnu.org/projects/abcd"),
            (
                "https://repo1.maven.org/maven2/org/example/top/very-cool/",
                "//central.sonatype.com/artifact/org.example.top/very-cool",
            ),
            (
                "https://repo1.maven.org/maven2/org/example/plexus/plexus-component-factories/1.0-alpha-11/plexus-component-factories-1.0-alpha-11.pom",
                "//central.sonatype.com/artifact/org.example.plexus/plexus-component-factories",
            ),
            (
                "https://repo1.maven.org/maven2/org/example/plexus/plexus-component-factories/maven-metadata.xml",
                "//central.sonatype.com/artifact/org.example.plexus/plexus-component-factories",
            ),
            ("https://crates.io/crates/some-crate", "//crates.io/crates/some-crate"),
            (
                "https://crates.io/api/v1/crates/mycrate/0.1.2/download#/mycrate-0.1.2.crate",
                "//crates.io/crates/mycrate",
            ),
            (
                "https://registry.npmjs.org/example-pkg/-/example-pkg-0.2.1.tgz",
                "//npmjs.org/package/example-pkg",
            ),
            (
                "https://registry.npmjs.com/example-com/-/example-com-0.2.1.tgz",
                "//npmjs.com/package/example-com",
            ),
            (
                "https://download.gnome.org/sources/the-name/1.0/the-name-1.0.7.tar.xz",
                "//download.gnome.org/sources/the-name",
            ),
            ("ftp://ftp.gnome.org/pub/GNOME/sources/proj/proj-1.tar.bz2", "//download.gnome.org/sources/proj"),
            ("ftp://ftp.gnome.org/pub/gnome/sources/proj/proj-1.tar.bz2", "//download.gnome.org/sources/proj"),
            (
                "https://www.example.com/projects/xyzzy/xyzzy-1.234.5beta.tar.gz",
                "//example.com/projects/xyzzy",
            ),
            (
                "https://www.example.com/z/y/x/xyzzy-1.234.5beta.tar.gz",
                "//example.com/z/y/x/xyzzy-1.234.5beta.tar.gz",
            ),
            (
                "https://www.example.com/projects/xyzzy-1.2.tar.gz",
                "//example.com/projects/xyzzy-1.2.tar.gz",
            ),
            ("ftp://example.com/pub/xyzzy/1.2/xyzzy-1.2.tar.gz", "//example.com/pub/xyzzy"),
            ("", ""),
        ];
        for (url, canon) in cases {
            assert_eq!(canonicalize(url).as_str(), canon, "canonicalize({:?})", url);
        }
    }

    #[test]
    fn test_with_scheme() {
        for (url, canon) in [
            ("https://example.com/path/file.htm", "https://example.com/path/file.htm"),
            ("ftp://example.com/path/", "https://example.com/path"),
            ("http://example.com/path/index.htm", "https://example.com/path"),
            ("", ""),
        ] {
            assert_eq!(canonicalize(url).with_scheme(), canon);
        }
    }

    #[test]
    fn test_urls_match() {
        for (a, b) in [
            ("https://metacpan.org/dist/xyzzy/", "https://search.cpan.org/dist/xyzzy"),
            ("https://www.github.com/Project/xyzzy/", "http://github.com/project/xyzzy"),
            ("https://www.gnu.org/software/make/", "https://www.gnu.org/software/make/"),
            ("https://example.org/docs", "https://example.org/docs/default.html"),
            ("http://example.org/main.htm", "https://www.example.org"),
        ] {
            assert!(urls_match(a, b), "{} ~ {}", a, b);
            assert!(urls_match(b, a), "{} ~ {}", b, a);
        }
        for (a, b) in [
            ("https://example.org/dist/xyzzy/", "https://search.cpan.org/dist/xyzzy"),
            ("https://example.com/", ""),
            ("", "https://example.com/"),
            ("", ""),
            ("https://example.org/docs", "https://example.org/docs/other.html"),
            ("https://example.org/docs", "https://example.org/docs/a/home.html"),
        ] {
            assert!(!urls_match(a, b), "{} !~ {}", a, b);
        }
    }

    #[test]
    fn test_match_is_not_transitive() {
        let a = "https://example.com/Proj";
        let b = "https://example.com/proj";
        let c = "https://example.com/proj/home.html";
        assert!(urls_match(a, b));
        assert!(urls_match(b, c));
        assert!(!urls_match(a, c));
    }

    #[test]
    fn test_url_ecosystem() {
        for (url, eco) in [
            ("https://metacpan.org/dist/xyzzy/", None),
            ("https://www.github.com/Project/xyzzy/", None),
            ("https://pypi.org/project/xyzzy/1.2.3", Some("pypi")),
            ("https://npmjs.com/package/my-pkg", Some("npmjs")),
            ("https://npmjs.org/package/org-pkg", Some("npm")),
            ("https://crates.io/crates/some-crate", Some("crates.io")),
            ("https://rubygems.org/gems/a-gem", Some("rubygems")),
            ("//rubygems.org/gems/a-gem", Some("rubygems")),
        ] {
            assert_eq!(url_ecosystem(url), eco, "{}", url);
        }
    }

    #[test]
    fn test_compatible_ecosystems() {
        for (a, b) in [
            ("https://metacpan.org/dist/foobar/", "https://search.cpan.org/dist/xyzzy"),
            ("https://www.github.com/Project/foobar/", "https://sourceforge.net/projects/xyzzy"),
            ("https://npmjs.com/package/my-pkg", "https://npmjs.org/package/org-pkg"),
            ("https://pypi.python.org/pypi/xyzzy", "https://pypi.org/project/xyzzy"),
            ("http://example.com/foo", "https://some.site.example/bar"),
        ] {
            assert!(compatible_ecosystems(a, b), "{} ~ {}", a, b);
        }
        for (a, b) in [
            ("https://crates.io/crates/some-crate", "https://npmjs.org/package/org-pkg"),
            ("https://pypi.org/project/xyzzy", "https://npmjs.com/package/my-pkg"),
            ("https://rubygems.org/gems/xyzzy", "https://pypi.org/project/xyzzy"),
            ("https://rubygems.org/gems/xyzzy", ""),
            ("", "https://example.com"),
        ] {
            assert!(!compatible_ecosystems(a, b), "{} !~ {}", a, b);
        }
    }

    #[test]
    fn test_registry_name() {
        assert_eq!(
            registry_name("https://pypi.org/project/xyzzy"),
            Some(("pypi", "xyzzy".to_string()))
        );
        assert_eq!(
            registry_name("https://npmjs.com/package/my-pkg"),
            Some(("npmjs", "my-pkg".to_string()))
        );
        assert_eq!(registry_name("https://pypi.org/project"), None);
        assert_eq!(registry_name("https://github.com/a/b"), None);
    }

    #[test]
    fn test_is_download_url() {
        assert!(is_download_url("https://example.org/x-1.0.tar.gz"));
        assert!(is_download_url("https://example.org/x.zip"));
        assert!(is_download_url("https://example.org/x-1.tgz"));
        assert!(!is_download_url("https://example.org/x"));
        assert!(!is_download_url("https://example.org/.tar"));
        assert!(!is_download_url("https://example.org/x.tar.toolong"));
    }

    #[test]
    fn test_swaps() {
        assert_eq!(swap_scheme("http://a.example/"), "https://a.example/");
        assert_eq!(swap_scheme("https://a.example/"), "http://a.example/");
        assert_eq!(swap_scheme("ftp://a.example/"), "ftp://a.example/");
        assert_eq!(swap_www("https://www.a.example/x"), "https://a.example/x");
        assert_eq!(swap_www("https://a.example/x"), "https://www.a.example/x");
    }

    #[test]
    fn test_search_variants() {
        let variants = search_variants(["https://example.org/"]);
        for expected in [
            "https://example.org/",
            "https://example.org/index.html",
            "https://example.org/index.htm",
            "http://example.org/",
            "https://www.example.org/",
            "http://www.example.org/index.htm",
        ] {
            assert!(variants.contains(expected), "missing {}", expected);
        }
        assert!(!variants.contains("https://example.org/index.html/"));

        let variants = search_variants(["https://example.org/a"]);
        assert!(variants.contains("https://example.org/a/"));
        assert!(variants.contains("http://www.example.org/a/"));
    }

    fn url_strategy() -> impl Strategy<Value = String> {
        let scheme = prop::sample::select(vec!["", "http://", "https://", "HTTP://", "ftp://", "git+https://", "//"]);
        let www = prop::sample::select(vec!["", "www.", "WWW."]);
        let host = prop::sample::select(vec![
            "example.com",
            "Example.ORG",
            "github.com",
            "user.github.io",
            "sf.net",
            "proj.sourceforge.net",
            "download.sourceforge.net",
            "pypi.org",
            "pypi.python.org",
            "files.pythonhosted.org",
            "rubygems.org",
            "crates.io",
            "metacpan.org",
            "gnu.org",
            "ftp.gnu.org",
            "savannah.gnu.org",
            "registry.npmjs.org",
            "repo1.maven.org",
        ]);
        let port = prop::sample::select(vec!["", ":80", ":443", ":8080"]);
        let segment = "[a-zA-Z0-9_.-]{1,8}|gnu|s|p|pypi|project|gems|dist|maven2|index\\.html|home\\.html|x-1\\.2\\.tar\\.gz";
        let path = prop::collection::vec(segment, 0..5);
        let tail = prop::sample::select(vec!["", "/", ".git", "/index.htm", "#frag", "/#x", ".html"]);
        (scheme, www, host, port, path, tail).prop_map(|(scheme, www, host, port, path, tail)| {
            let mut url = format!("{}{}{}{}", scheme, www, host, port);
            for seg in path {
                url.push('/');
                url.push_str(&seg);
            }
            url.push_str(tail);
            url
        })
    }

    proptest! {
        #[test]
        fn prop_canonicalize_is_idempotent(url in url_strategy()) {
            let once = canonicalize(&url);
            let twice = canonicalize(once.as_str());
            prop_assert_eq!(&once, &twice);
            let with_scheme = canonicalize(&once.with_scheme());
            prop_assert_eq!(&once, &with_scheme);
        }

        #[test]
        fn prop_match_is_reflexive_and_symmetric(a in url_strategy(), b in url_strategy()) {
            if !canonicalize(&a).is_empty() {
                prop_assert!(urls_match(&a, &a));
            }
            prop_assert_eq!(urls_match(&a, &b), urls_match(&b, &a));
        }
    }
}
