//! Add command - attach distribution packages to existing projects.
//!
//! For each record the matching project gets the package added, and
//! `project package url` is printed. Records that already have a package
//! for the distribution are skipped, so a run can be repeated safely.

use super::{RunContext, flag_pair};
use crate::enrich::{Enricher, HostingEnricher, NoEnrichment};
use crate::error::{Error, Result};
use crate::matching::{MatchEngine, MatchOptions, MatchResult, matched_url};
use crate::policy::AmbiguityPolicy;
use crate::redirect::{HttpRedirectResolver, NoRedirects, RedirectResolver};
use crate::service::{ProjectSearch, ProjectWriter};
use clap::Args;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Seconds between records unless configured otherwise.
const DEFAULT_DELAY_SECS: f64 = 4.0;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Distribution the packages belong to
    #[arg(long)]
    pub distro: Option<String>,

    /// File containing the tracking service API token
    #[arg(long, value_name = "FILE")]
    pub token_file: Option<PathBuf>,

    /// File containing a GitHub API token
    #[arg(long, value_name = "FILE")]
    pub gh_token_file: Option<PathBuf>,

    /// Seconds to wait between records
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,

    /// Write the distribution's known packages to FILE when done
    #[arg(long, value_name = "FILE")]
    pub dump_existing: Option<PathBuf>,

    /// Fetch the distribution's packages first and skip known ones (default)
    #[arg(long, overrides_with = "no_existence_check")]
    pub existence_check: bool,

    /// Do not fetch the distribution's packages first
    #[arg(long, overrides_with = "existence_check")]
    pub no_existence_check: bool,

    /// Contact other sites to look harder for a match
    #[arg(long, overrides_with = "no_external_match")]
    pub external_match: bool,

    /// Only compare against tracking service data
    #[arg(long, overrides_with = "external_match")]
    pub no_external_match: bool,

    /// Also compare the URLs that record URLs redirect to
    #[arg(long, overrides_with = "no_check_redirects")]
    pub check_redirects: bool,

    /// Do not follow redirects of record URLs
    #[arg(long, overrides_with = "check_redirects")]
    pub no_check_redirects: bool,

    /// Skip projects that already have a package for the distribution
    #[arg(long)]
    pub require_no_existing_package: bool,

    /// Log changes instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the add command.
pub fn run(args: AddArgs, ctx: &RunContext) -> i32 {
    let result = cmd_add(&args, ctx);
    ctx.exit_code(result)
}

fn cmd_add(args: &AddArgs, ctx: &RunContext) -> Result<()> {
    let distro = ctx
        .distro(args.distro.as_deref())
        .ok_or_else(|| Error::Config("--distro is required".into()))?;
    let settings = &ctx.config.matching;
    let external = flag_pair(args.external_match, args.no_external_match)
        .unwrap_or(settings.external_match());
    let check_redirects = flag_pair(args.check_redirects, args.no_check_redirects)
        .unwrap_or(settings.check_redirects());
    let existence_check = flag_pair(args.existence_check, args.no_existence_check).unwrap_or(true);

    let http = ctx.http_client(args.gh_token_file.as_deref())?;
    let client = ctx.service(http.clone(), args.token_file.as_deref(), true, args.dry_run)?;

    let mut known = if existence_check {
        let packages = client.distro_packages(&distro)?;
        info!(count = packages.len(), %distro, "found existing packages");
        packages
    } else {
        HashSet::new()
    };

    let resolver: Box<dyn RedirectResolver> = if external && check_redirects {
        Box::new(HttpRedirectResolver::new(http.clone()))
    } else {
        Box::new(NoRedirects)
    };
    let enricher: Box<dyn Enricher> = if external {
        Box::new(HostingEnricher::new(http.clone()))
    } else {
        Box::new(NoEnrichment)
    };
    let options = MatchOptions {
        allow_external_match: external,
        check_redirects,
        require_no_existing_package: args.require_no_existing_package
            || settings.require_no_existing_package(),
        distro: Some(distro.clone()),
        policy: AmbiguityPolicy::Refuse,
    };
    let engine = MatchEngine::new(&client, resolver.as_ref(), enricher.as_ref(), options);

    for record in ctx.records(ctx.delay(args.delay, DEFAULT_DELAY_SECS)) {
        info!(project = %record.project, package = %record.package, "next record");
        let Some(result) = ctx.recoverable(engine.match_existing(&record, &known), &record)? else {
            continue;
        };
        for result in engine.options().policy.settle(result) {
            if let MatchResult::Matched { candidate } = &result {
                let added = client.add_package(
                    &distro,
                    &candidate.name,
                    &candidate.ecosystem,
                    &record.package,
                );
                if ctx.recoverable(added, &record)?.is_none() {
                    continue;
                }
                known.insert(record.package.clone());
                ctx.print_fields(&[
                    candidate.name.as_str(),
                    record.package.as_str(),
                    matched_url(&record, candidate),
                ]);
            }
            ctx.print_outcome(&record, &result);
        }
    }

    if let Some(path) = &args.dump_existing {
        dump_existing(path, &known)?;
    }
    Ok(())
}

/// Write package names, sorted, one per line.
fn dump_existing(path: &Path, known: &HashSet<String>) -> Result<()> {
    let mut names: Vec<&str> = known.iter().map(String::as_str).collect();
    names.sort_unstable();
    let mut text = names.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    std::fs::write(path, text)?;
    info!(path = %path.display(), count = names.len(), "wrote existing packages");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        args: AddArgs,
    }

    #[test]
    fn test_flag_pairs_last_wins() {
        let cli = Cli::parse_from(["add", "--external-match", "--no-external-match"]);
        assert_eq!(
            flag_pair(cli.args.external_match, cli.args.no_external_match),
            Some(false)
        );
        let cli = Cli::parse_from(["add", "--no-check-redirects", "--check-redirects"]);
        assert_eq!(
            flag_pair(cli.args.check_redirects, cli.args.no_check_redirects),
            Some(true)
        );
    }

    #[test]
    fn test_dump_existing_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("existing");
        let known: HashSet<String> = ["zlib", "bash", "make"].iter().map(|s| s.to_string()).collect();
        dump_existing(&path, &known).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "bash\nmake\nzlib\n");
    }
}
