//! Find command - report the existing project for each record, changing nothing.

use super::{RunContext, flag_pair};
use crate::enrich::{Enricher, HostingEnricher, NoEnrichment};
use crate::error::Result;
use crate::matching::{MatchEngine, MatchOptions, MatchResult, matched_url};
use crate::policy::AmbiguityPolicy;
use crate::redirect::{HttpRedirectResolver, NoRedirects, RedirectResolver};
use clap::Args;
use tracing::info;

/// Seconds between records unless configured otherwise.
const DEFAULT_DELAY_SECS: f64 = 6.0;

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Print every matching project instead of skipping ambiguous records
    #[arg(long)]
    pub allow_duplicates: bool,

    /// Seconds to wait between records
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,

    /// Also follow redirects and accept projects tied to the record by links on
    /// hosting sites
    #[arg(long, overrides_with = "no_external_match")]
    pub external_match: bool,

    /// Only search by the record URLs
    #[arg(long, overrides_with = "external_match")]
    pub no_external_match: bool,
}

/// Run the find command.
pub fn run(args: FindArgs, ctx: &RunContext) -> i32 {
    let result = cmd_find(&args, ctx);
    ctx.exit_code(result)
}

fn cmd_find(args: &FindArgs, ctx: &RunContext) -> Result<()> {
    let settings = &ctx.config.matching;
    let external = flag_pair(args.external_match, args.no_external_match)
        .unwrap_or(settings.external_match());
    let policy =
        AmbiguityPolicy::from_allow_duplicates(args.allow_duplicates || settings.allow_duplicates());

    let http = ctx.http_client(None)?;
    let client = ctx.service(http.clone(), None, false, false)?;
    let resolver: Box<dyn RedirectResolver> = if external && settings.check_redirects() {
        Box::new(HttpRedirectResolver::new(http.clone()))
    } else {
        Box::new(NoRedirects)
    };
    let enricher: Box<dyn Enricher> = if external {
        Box::new(HostingEnricher::new(http))
    } else {
        Box::new(NoEnrichment)
    };
    let options = MatchOptions {
        allow_external_match: external,
        check_redirects: settings.check_redirects(),
        policy,
        ..Default::default()
    };
    let engine = MatchEngine::new(&client, resolver.as_ref(), enricher.as_ref(), options);

    for record in ctx.records(ctx.delay(args.delay, DEFAULT_DELAY_SECS)) {
        info!(project = %record.project, package = %record.package, "next record");
        let Some(results) = ctx.recoverable(engine.find_candidates(&record), &record)? else {
            continue;
        };
        for result in results {
            if let MatchResult::Matched { candidate } = &result {
                ctx.print_fields(&[
                    candidate.name.as_str(),
                    record.package.as_str(),
                    matched_url(&record, candidate),
                ]);
            }
            ctx.print_outcome(&record, &result);
        }
    }
    Ok(())
}
