//! Parse-rpm command - turn `rpm -qi` output into package records.

use super::RunContext;
use crate::error::Result;
use crate::rpm::parse_rpm_info;
use clap::Args;
use std::io;

#[derive(Args, Debug)]
pub struct ParseRpmArgs {
    /// Remove this prefix from project names (repeatable; first match wins)
    #[arg(long = "strip-project-prefix", value_name = "PREFIX")]
    pub strip_project_prefix: Vec<String>,
}

/// Run the parse-rpm command.
pub fn run(args: ParseRpmArgs, ctx: &RunContext) -> i32 {
    let result = cmd_parse_rpm(&args, ctx);
    ctx.exit_code(result)
}

fn cmd_parse_rpm(args: &ParseRpmArgs, ctx: &RunContext) -> Result<()> {
    let prefixes = if args.strip_project_prefix.is_empty() {
        &ctx.config.create.strip_prefixes
    } else {
        &args.strip_project_prefix
    };
    for record in parse_rpm_info(io::stdin().lock(), prefixes)? {
        ctx.print_fields(&[
            record.project.as_str(),
            record.package.as_str(),
            record.homepage.as_str(),
        ]);
        ctx.print_json(&record);
    }
    Ok(())
}
