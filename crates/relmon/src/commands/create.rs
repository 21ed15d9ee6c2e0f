//! Create command - create tracking service projects for new upstreams.
//!
//! Only homepages on a supported hosting site or registry are accepted, and
//! forge projects must have tags that look like version numbers. Each created
//! project prints `project package homepage source`.

use super::{RunContext, flag_pair};
use crate::create::{CreateOptions, CreateOutcome, HttpUpstream, ProjectCreator};
use crate::error::{Error, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Seconds between records unless configured otherwise.
const DEFAULT_DELAY_SECS: f64 = 4.0;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// File containing the tracking service API token
    #[arg(long, value_name = "FILE")]
    pub token_file: Option<PathBuf>,

    /// File containing a GitHub API token
    #[arg(long, value_name = "FILE")]
    pub gh_token_file: Option<PathBuf>,

    /// Distribution the packages belong to
    #[arg(long)]
    pub distro: Option<String>,

    /// Log changes instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Add the distribution package after creating the project (default)
    #[arg(long, overrides_with = "no_add_package")]
    pub add_package: bool,

    /// Only create the project
    #[arg(long, overrides_with = "add_package")]
    pub no_add_package: bool,

    /// Remove this prefix from project names (repeatable; first match wins)
    #[arg(long = "strip-project-prefix", value_name = "PREFIX")]
    pub strip_project_prefix: Vec<String>,

    /// Check that URLs are reachable before creating (default)
    #[arg(long, overrides_with = "no_external_check")]
    pub external_check: bool,

    /// Skip reachability checks
    #[arg(long, overrides_with = "external_check")]
    pub no_external_check: bool,

    /// Seconds to wait between records
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,
}

/// Run the create command.
pub fn run(args: CreateArgs, ctx: &RunContext) -> i32 {
    let result = cmd_create(&args, ctx);
    ctx.exit_code(result)
}

fn options(args: &CreateArgs, ctx: &RunContext) -> Result<CreateOptions> {
    let settings = &ctx.config.create;
    let add_package =
        flag_pair(args.add_package, args.no_add_package).unwrap_or(settings.add_package());
    let distro = ctx.distro(args.distro.as_deref());
    if add_package && distro.is_none() {
        return Err(Error::Config(
            "--distro is required to add packages (or pass --no-add-package)".into(),
        ));
    }
    let strip_prefixes = if args.strip_project_prefix.is_empty() {
        settings.strip_prefixes.clone()
    } else {
        args.strip_project_prefix.clone()
    };
    Ok(CreateOptions {
        strip_prefixes,
        external_check: flag_pair(args.external_check, args.no_external_check)
            .unwrap_or(settings.external_check()),
        add_package,
        distro,
    })
}

fn cmd_create(args: &CreateArgs, ctx: &RunContext) -> Result<()> {
    let options = options(args, ctx)?;
    let http = ctx.http_client(args.gh_token_file.as_deref())?;
    let client = ctx.service(http.clone(), args.token_file.as_deref(), true, args.dry_run)?;
    let upstream = HttpUpstream::new(http);
    let creator = ProjectCreator::new(&client, &upstream, &upstream, options);

    for record in ctx.records(ctx.delay(args.delay, DEFAULT_DELAY_SECS)) {
        info!(project = %record.project, package = %record.package, "next record");
        let Some(outcome) = ctx.recoverable(creator.create(&record), &record)? else {
            continue;
        };
        if let CreateOutcome::Created {
            project,
            package,
            homepage,
            source,
            ..
        } = &outcome
        {
            ctx.print_fields(&[project.as_str(), package.as_str(), homepage.as_str(), source.as_str()]);
        }
        ctx.print_outcome(&record, &outcome);
    }
    Ok(())
}
