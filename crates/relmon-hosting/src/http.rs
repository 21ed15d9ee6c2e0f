//! HTTP client shared by every site fetcher and the tracking service client.
//!
//! Wraps two `ureq` agents: one that follows redirects for API calls and one
//! that never does, for redirect inspection. All requests go through the
//! per-host rate limiter and retry HTTP 429 with exponential back-off.

use crate::HostingError;
use crate::ratelimit::{Rate, RateLimiter};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

pub const USER_AGENT: &str = concat!("relmon/", env!("CARGO_PKG_VERSION"));

/// Seconds to wait for a response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry schedule for rate-limited requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (starting at 0).
    ///
    /// A server-supplied `Retry-After` wins when it is within `max_delay`.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(after) = retry_after.filter(|after| *after <= self.max_delay) {
            return after;
        }
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Status and headers of a response fetched without following redirects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub location: Option<String>,
    pub content_length: Option<u64>,
    pub body: String,
}

impl RawResponse {
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308) && self.location.is_some()
    }
}

/// Rate-limited HTTP client.
pub struct HttpClient {
    agent: ureq::Agent,
    raw: ureq::Agent,
    limiter: RateLimiter,
    retry: RetryPolicy,
    bearer_tokens: HashMap<String, String>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: build_agent(timeout, 5),
            raw: build_agent(timeout, 0),
            limiter: RateLimiter::new(Rate::default()),
            retry: RetryPolicy::default(),
            bearer_tokens: HashMap::new(),
        }
    }

    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send `Authorization: Bearer <token>` on every request to `host`.
    pub fn with_bearer_token(mut self, host: &str, token: &str) -> Self {
        self.bearer_tokens
            .insert(host.to_ascii_lowercase(), token.trim().to_string());
        self
    }

    /// GET a JSON document.
    pub fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value, HostingError> {
        let body = self.get_text(url, headers)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET a document as text.
    pub fn get_text(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, HostingError> {
        let response = self.execute(url, || self.request(&self.agent, "GET", url, headers).call())?;
        read_body(url, response)
    }

    /// POST a JSON body, returning the decoded JSON response (`Null` when empty).
    pub fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, HostingError> {
        let response = self.execute(url, || {
            self.request(&self.agent, "POST", url, headers)
                .send_json(body)
        })?;
        let text = read_body(url, response)?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// HEAD without following redirects.
    pub fn head(&self, url: &str) -> Result<RawResponse, HostingError> {
        let response = self.execute(url, || self.request(&self.raw, "HEAD", url, &[]).call())?;
        Ok(raw_response(response, false))
    }

    /// GET without following redirects, keeping the body.
    pub fn get_raw(&self, url: &str) -> Result<RawResponse, HostingError> {
        let response = self.execute(url, || self.request(&self.raw, "GET", url, &[]).call())?;
        Ok(raw_response(response, true))
    }

    fn request(
        &self,
        agent: &ureq::Agent,
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
    ) -> ureq::Request {
        let mut request = agent.request(method, url);
        for (key, value) in headers {
            request = request.set(key, value);
        }
        if let Some(token) = self.bearer_tokens.get(&host_of(url)) {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }
        request
    }

    fn execute<F>(&self, url: &str, call: F) -> Result<ureq::Response, HostingError>
    where
        F: Fn() -> Result<ureq::Response, ureq::Error>,
    {
        let host = host_of(url);
        let mut attempt = 0;
        loop {
            self.limiter.acquire(&host);
            match call() {
                Ok(response) => return Ok(response),
                Err(ureq::Error::Status(code, response)) if is_rate_limited(code, &response) => {
                    if attempt >= self.retry.max_retries {
                        warn!(%host, attempts = attempt + 1, "giving up after repeated rate limiting");
                        return Err(HostingError::RateLimited { host });
                    }
                    let retry_after = response
                        .header("retry-after")
                        .and_then(parse_retry_after);
                    let delay = self.retry.delay(attempt, retry_after);
                    debug!(%host, ?delay, "rate limited, backing off");
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(map_error(url, err)),
            }
        }
    }
}

fn build_agent(timeout: Duration, redirects: u32) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .redirects(redirects)
        .user_agent(USER_AGENT)
        .build()
}

/// Lowercase host of a URL, or the empty string when it has none.
pub fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default()
}

fn is_rate_limited(code: u16, response: &ureq::Response) -> bool {
    code == 429 || (code == 403 && response.header("x-ratelimit-remaining") == Some("0"))
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn map_error(url: &str, err: ureq::Error) -> HostingError {
    match err {
        ureq::Error::Status(404 | 410, _) => HostingError::NotFound {
            url: url.to_string(),
        },
        ureq::Error::Status(code @ (401 | 403), _) => HostingError::Auth {
            url: url.to_string(),
            code,
        },
        ureq::Error::Status(code, _) => HostingError::Status {
            url: url.to_string(),
            code,
        },
        ureq::Error::Transport(t) => HostingError::Transport {
            url: url.to_string(),
            message: t.to_string(),
        },
    }
}

fn read_body(url: &str, response: ureq::Response) -> Result<String, HostingError> {
    response.into_string().map_err(|e| HostingError::Transport {
        url: url.to_string(),
        message: format!("failed to read response: {}", e),
    })
}

fn raw_response(response: ureq::Response, with_body: bool) -> RawResponse {
    let status = response.status();
    let location = response.header("location").map(String::from);
    let content_length = response
        .header("content-length")
        .and_then(|v| v.trim().parse().ok());
    let body = if with_body {
        response.into_string().unwrap_or_default()
    } else {
        String::new()
    };
    RawResponse {
        status,
        location,
        content_length,
        body,
    }
}
