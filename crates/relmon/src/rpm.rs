//! Package records from RPM metadata.
//!
//! Reads `rpm -qi` style output: blocks of `Key: Value` lines, each block
//! starting with `Name`.

use crate::canon::canonicalize;
use crate::error::Result;
use crate::records::{PackageRecord, strip_prefix};
use regex::Regex;
use std::io::BufRead;
use std::sync::LazyLock;
use tracing::{error, info};

/// Package name from a full source RPM file name.
static SRPM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*)(-[\w\.+~^]+-[\w\.]+\.(\w)+(\d+))(\.\w+)?\.src\.rpm$").unwrap()
});

/// Package name of a source RPM such as `foo-1.2-3.fc40.src.rpm`.
pub fn srpm_name(srpm: &str) -> Option<&str> {
    SRPM_RE.captures(srpm)?.get(1).map(|m| m.as_str())
}

#[derive(Debug, Default)]
struct Block {
    project: String,
    package: String,
    url: String,
}

impl Block {
    fn finish(self, out: &mut Vec<PackageRecord>) {
        if self.project.is_empty() {
            return;
        }
        if self.url.is_empty() || self.package.is_empty() {
            info!(project = %self.project, "missing URL or package");
            return;
        }
        out.push(PackageRecord::new(&self.project, &self.package, &self.url));
    }
}

/// Records for every complete block. Incomplete blocks are logged and skipped.
pub fn parse_rpm_info<R: BufRead>(reader: R, prefixes: &[String]) -> Result<Vec<PackageRecord>> {
    let mut records = Vec::new();
    let mut block = Block::default();
    for line in reader.lines() {
        let line = line?;
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "Name" => {
                std::mem::take(&mut block).finish(&mut records);
                block.project = strip_prefix(value, prefixes).to_string();
            }
            "URL" | "Source RPM" | "Source" if block.project.is_empty() => {
                error!(key, "missing name before key");
            }
            "URL" => block.url = canonicalize(value).with_scheme(),
            "Source RPM" | "Source" => match srpm_name(value) {
                Some(name) => block.package = name.to_string(),
                None => {
                    error!(srpm = value, project = %block.project, "bad SRPM, skipping package");
                    block = Block::default();
                }
            },
            _ => {}
        }
    }
    block.finish(&mut records);
    Ok(records)
}
