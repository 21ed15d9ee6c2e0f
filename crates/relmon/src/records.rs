//! Input and output records.
//!
//! Input lines are `project package homepage_url [source_url]`, with shell
//! quoting for fields containing spaces. Output lines use the same quoting
//! so that one command's output can feed another.

use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;
use tracing::warn;

/// One package to be matched or created.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PackageRecord {
    pub project: String,
    pub package: String,
    pub homepage: String,
    pub source: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid quoting")]
    BadQuoting,
    #[error("not enough fields ({0})")]
    TooFew(usize),
    #[error("too many fields ({0})")]
    TooMany(usize),
}

impl PackageRecord {
    pub fn new(project: &str, package: &str, homepage: &str) -> Self {
        Self {
            project: project.to_string(),
            package: package.to_string(),
            homepage: homepage.to_string(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let fields = shlex::split(line.trim()).ok_or(RecordError::BadQuoting)?;
        match fields.len() {
            n if n < 3 => Err(RecordError::TooFew(n)),
            n if n > 4 => Err(RecordError::TooMany(n)),
            _ => {
                let mut fields = fields.into_iter();
                let mut next = || fields.next().unwrap_or_default();
                let (project, package, homepage) = (next(), next(), next());
                let source = Some(next()).filter(|s| !s.is_empty());
                Ok(Self {
                    project,
                    package,
                    homepage,
                    source,
                })
            }
        }
    }

    /// The homepage followed by the source URL, if any.
    pub fn urls(&self) -> Vec<&str> {
        std::iter::once(self.homepage.as_str())
            .chain(self.source.as_deref())
            .collect()
    }

    /// The source URL, or the homepage when there is none.
    pub fn source_or_homepage(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.homepage)
    }
}

/// Read records from a stream, logging and skipping malformed lines.
///
/// Blank lines are skipped silently.
pub fn read_records<R: BufRead>(reader: R) -> impl Iterator<Item = PackageRecord> {
    reader.lines().filter_map(|line| {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to read input line");
                return None;
            }
        };
        if line.trim().is_empty() {
            return None;
        }
        match PackageRecord::parse(&line) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(%line, "skipping line: {}", err);
                None
            }
        }
    })
}

/// Quote fields for an output line.
pub fn output_line<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    fields
        .into_iter()
        .map(|field| shlex::try_quote(field).unwrap_or(Cow::Borrowed(field)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove the first of `prefixes` that `name` starts with.
pub fn strip_prefix<'a>(name: &'a str, prefixes: &[String]) -> &'a str {
    prefixes
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix.as_str()))
        .unwrap_or(name)
}

/// Whether a name looks like a URL rather than a plain name.
pub fn looks_like_url(name: &str) -> bool {
    url::Url::parse(name).is_ok()
}
