// crates/plan-review-providers/src/github.rs
// ============================================================================
// Module: GitHub Pull Request Source
// Description: PullRequestSource backed by the GitHub REST API.
// Purpose: Report whether a pull request is still open and unmerged.
// Dependencies: plan-review-core, reqwest, serde
// ============================================================================

//! ## Overview
//! One bounded `GET /repos/{owner}/{name}/pulls/{number}` per lookup. Any
//! non-success status is an error; the pull request gate turns errors into a
//! permissive degraded outcome. The token is sent as a bearer credential and
//! never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use plan_review_core::PullRequestSource;
use plan_review_core::PullRequestState;
use plan_review_core::SourceControlError;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::redirect::Policy;
use serde::Deserialize;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type requested from the API.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
/// API version header name.
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
/// Pinned API version.
const API_VERSION: &str = "2022-11-28";
/// Maximum accepted response size.
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Maximum length of an owner or repository name.
const MAX_NAME_LENGTH: usize = 100;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// GitHub lookup settings.
#[derive(Clone)]
pub struct GitHubConfig {
    /// API base URL (`https://api.github.com` for github.com).
    pub api_base_url: String,
    /// Bearer token.
    pub token: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent (GitHub rejects requests without one).
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            token: None,
            timeout: Duration::from_secs(5),
            user_agent: concat!("plan-review/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// Pull request body fields used by the gate.
#[derive(Deserialize)]
struct PullRequestBody {
    /// `open` or `closed`.
    state: String,
    /// True once merged.
    #[serde(default)]
    merged: bool,
}

/// GitHub-backed [`PullRequestSource`].
pub struct GitHubPullRequestSource {
    /// Parsed API base URL.
    base_url: Url,
    /// Bearer token.
    token: Option<String>,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl GitHubPullRequestSource {
    /// Creates a new source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceControlError::Invalid`] when the base URL is invalid or
    /// the HTTP client cannot be created.
    pub fn new(config: GitHubConfig) -> Result<Self, SourceControlError> {
        let base_url = Url::parse(config.api_base_url.trim_end_matches('/'))
            .map_err(|_| SourceControlError::Invalid("invalid api base url".to_string()))?;
        if !matches!(base_url.scheme(), "https" | "http") {
            return Err(SourceControlError::Invalid("unsupported api url scheme".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .redirect(Policy::none())
            .build()
            .map_err(|_| SourceControlError::Invalid("http client build failed".to_string()))?;
        Ok(Self {
            base_url,
            token: config.token,
            client,
        })
    }

    /// Builds the lookup URL for one pull request.
    fn pull_url(&self, repository: &str, number: u64) -> Result<Url, SourceControlError> {
        let (owner, name) = split_repository(repository)?;
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/repos/{owner}/{name}/pulls/{number}"))
            .map_err(|_| SourceControlError::Invalid("invalid pull request url".to_string()))
    }
}

impl PullRequestSource for GitHubPullRequestSource {
    fn pull_request(
        &self,
        repository: &str,
        number: u64,
    ) -> Result<PullRequestState, SourceControlError> {
        let url = self.pull_url(repository, number)?;
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let mut response = request.send().map_err(|err| {
            if err.is_timeout() {
                SourceControlError::Request("request timed out".to_string())
            } else {
                SourceControlError::Request(err.without_url().to_string())
            }
        })?;
        let status = response.status();
        debug!(repository, number, status = status.as_u16(), "pull request lookup");
        if !status.is_success() {
            return Err(SourceControlError::Status(status.as_u16()));
        }
        let body = read_response_limited(&mut response, MAX_RESPONSE_BYTES)?;
        let parsed: PullRequestBody = serde_json::from_slice(&body)
            .map_err(|err| SourceControlError::Parse(err.to_string()))?;
        Ok(PullRequestState {
            state: parsed.state,
            merged: parsed.merged,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits `owner/name`, rejecting anything that could alter the URL path.
fn split_repository(repository: &str) -> Result<(&str, &str), SourceControlError> {
    let (owner, name) = repository.split_once('/').ok_or_else(|| {
        SourceControlError::Invalid(format!("repository must be owner/name: {repository}"))
    })?;
    for part in [owner, name] {
        let valid = !part.is_empty()
            && part.len() <= MAX_NAME_LENGTH
            && part != "."
            && part != ".."
            && part.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        if !valid {
            return Err(SourceControlError::Invalid(format!(
                "repository must be owner/name: {repository}"
            )));
        }
    }
    Ok((owner, name))
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, SourceControlError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| SourceControlError::Invalid("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(SourceControlError::Parse("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle
        .read_to_end(&mut buf)
        .map_err(|_| SourceControlError::Request("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(SourceControlError::Parse("response exceeds size limit".to_string()));
    }
    Ok(buf)
}
