//! CLI command implementations - one module per subcommand.
//!
//! Every command reads records from stdin and prints one line per useful
//! outcome on stdout. Diagnostics go to stderr through `tracing`.

pub mod add;
pub mod create;
pub mod find;
pub mod parse_rpm;

use crate::config::{Config, read_token};
use crate::error::{Error, Result};
use crate::records::{PackageRecord, output_line, read_records};
use crate::service::AnityaClient;
use relmon_hosting::{HttpClient, Rate, RateLimiter};
use serde::Serialize;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, warn};

/// Exit code for a run that stopped on an error.
pub const EXIT_FAILURE: i32 = 2;

/// Exit code after an interrupt.
pub const EXIT_INTERRUPTED: i32 = 130;

const GITHUB_API_HOST: &str = "api.github.com";

/// Settings and state shared by every command.
pub struct RunContext {
    pub config: Config,
    pub json: bool,
    cancelled: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new(config: Config, json: bool, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            config,
            json,
            cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// HTTP client with the configured limits. The GitHub token, from
    /// `gh_token_file` or the config, is sent to the GitHub API only.
    pub fn http_client(&self, gh_token_file: Option<&Path>) -> Result<Arc<HttpClient>> {
        let hosting = &self.config.hosting;
        let burst = hosting.burst();
        let mut limiter = RateLimiter::new(Rate::new(hosting.requests_per_second(), burst));
        for (host, per_second) in &hosting.rates {
            limiter = limiter.with_host_rate(host, Rate::new(*per_second, burst));
        }
        let mut http = HttpClient::with_timeout(self.config.service.timeout())
            .with_limiter(limiter)
            .with_retry(hosting.retry_policy());
        if let Some(path) = gh_token_file.or(hosting.github_token_file.as_deref()) {
            let token = read_token(path)?;
            http = http.with_bearer_token(GITHUB_API_HOST, &token);
        }
        Ok(Arc::new(http))
    }

    /// Tracking service client. Commands that write need the token.
    pub fn service(
        &self,
        http: Arc<HttpClient>,
        token_file: Option<&Path>,
        require_token: bool,
        dry_run: bool,
    ) -> Result<AnityaClient> {
        let token = match token_file.or(self.config.service.token_file.as_deref()) {
            Some(path) => Some(read_token(path)?),
            None if require_token => {
                return Err(Error::Config(
                    "an API token is required (--token-file or service.token_file)".into(),
                ));
            }
            None => None,
        };
        Ok(AnityaClient::new(http, self.config.service.base_url())
            .with_token(token)
            .with_dry_run(dry_run))
    }

    /// Distribution from the flag, falling back to the config.
    pub fn distro(&self, flag: Option<&str>) -> Option<String> {
        flag.map(String::from).or_else(|| self.config.run.distro.clone())
    }

    /// Delay between records: flag, then config, then the command default.
    pub fn delay(&self, flag: Option<f64>, default_secs: f64) -> Duration {
        let secs = flag.or(self.config.run.delay_secs).unwrap_or(default_secs);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    /// Sleep for `delay`, waking early on interrupt. False once interrupted.
    pub fn pause(&self, delay: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(100);
        let mut left = delay;
        while !left.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let step = left.min(SLICE);
            std::thread::sleep(step);
            left -= step;
        }
        !self.is_cancelled()
    }

    /// Records from stdin, with the configured delay before each one after
    /// the first. Stops early on interrupt.
    pub fn records(&self, delay: Duration) -> impl Iterator<Item = PackageRecord> + '_ {
        let mut first = true;
        read_records(io::stdin().lock()).take_while(move |_| {
            if std::mem::take(&mut first) {
                !self.is_cancelled()
            } else {
                self.pause(delay)
            }
        })
    }

    /// Print a plain output line, or nothing in JSON mode.
    pub fn print_fields(&self, fields: &[&str]) {
        if !self.json {
            println!("{}", output_line(fields.iter().copied()));
        }
    }

    /// Print a per-record outcome as a JSON line, in JSON mode only.
    pub fn print_outcome<T: Serialize>(&self, record: &PackageRecord, outcome: &T) {
        self.print_json(&Report { record, outcome });
    }

    /// Print a value as a JSON line, in JSON mode only.
    pub fn print_json<T: Serialize>(&self, value: &T) {
        if !self.json {
            return;
        }
        match serde_json::to_string(value) {
            Ok(line) => println!("{}", line),
            Err(err) => warn!(error = %err, "failed to encode output"),
        }
    }

    /// Report a failed record, then keep going unless the error stops the
    /// run. `None` when the record was given up on.
    pub fn recoverable<T>(&self, result: Result<T>, record: &PackageRecord) -> Result<Option<T>> {
        let err = match result {
            Ok(value) => return Ok(Some(value)),
            Err(err) => err,
        };
        self.print_outcome(record, &Failure::new(&err));
        if err.is_fatal() {
            return Err(err);
        }
        error!(package = %record.package, "{}", err);
        Ok(None)
    }

    /// Exit code for a finished command.
    pub fn exit_code(&self, result: Result<()>) -> i32 {
        match result {
            Err(err) => {
                error!("{}", err);
                EXIT_FAILURE
            }
            Ok(()) if self.is_cancelled() => {
                warn!("interrupted");
                EXIT_INTERRUPTED
            }
            Ok(()) => 0,
        }
    }
}

#[derive(Serialize)]
struct Report<'a, T> {
    record: &'a PackageRecord,
    outcome: &'a T,
}

/// Outcome of a record whose handling failed.
#[derive(Debug, Serialize)]
struct Failure {
    status: &'static str,
    error: String,
    fatal: bool,
}

impl Failure {
    fn new(err: &Error) -> Self {
        Self {
            status: "error",
            error: err.to_string(),
            fatal: err.is_fatal(),
        }
    }
}

/// Resolve a `--flag` / `--no-flag` pair. `None` when neither was given.
pub fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (_, true) => Some(false),
        (true, false) => Some(true),
        (false, false) => None,
    }
}
