//! Shared infrastructure for the InvenTree and eBay adapters.
//!
//! Each adapter reuses:
//! - `FetchClient`: blocking HTTP client with retry / backoff / error classification
//! - `resolve_credential`: flag > env > error
//! - `write_output`: write a snapshot body to a file or stdout
//! - `show_progress`: progress on stderr only when interactive
//!
//! Adapters own their base URL and auth. Status handling is uniform:
//!
//! | Status          | Behaviour                     | Exit code |
//! |-----------------|-------------------------------|-----------|
//! | 401 / 403       | fail immediately              | 51        |
//! | 400             | fail immediately              | 52        |
//! | other 4xx       | fail immediately              | 54        |
//! | 429             | retry, honour `Retry-After`   | 53        |
//! | 5xx / network   | retry with doubling backoff   | 54        |

use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::exit_codes;
use crate::CliError;

// ── Constants ───────────────────────────────────────────────────────

pub(crate) const MAX_RETRIES: u32 = 3;
pub(crate) const USER_AGENT: &str = concat!("listcheck/", env!("CARGO_PKG_VERSION"));

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that handles retry, backoff, and error classification.
///
/// Callers pass a request-building closure to [`FetchClient::send_text`] or
/// [`FetchClient::send_json`]; it is invoked once per attempt so the body
/// and headers are rebuilt for every retry.
pub(crate) struct FetchClient {
    http: reqwest::blocking::Client,
    source_name: String,
    error_extractor: fn(&str, u16) -> String,
    initial_backoff_secs: u64,
}

impl FetchClient {
    pub(crate) fn new(
        source_name: &str,
        error_extractor: fn(&str, u16) -> String,
    ) -> Result<Self, CliError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CliError {
                code: exit_codes::EXIT_ERROR,
                message: format!("failed to build HTTP client: {e}"),
                hint: None,
            })?;

        Ok(Self {
            http,
            source_name: source_name.to_string(),
            error_extractor,
            initial_backoff_secs: 1,
        })
    }

    /// Override the first retry delay. Tests use 0 to avoid sleeping.
    #[cfg(test)]
    pub(crate) fn with_initial_backoff(mut self, secs: u64) -> Self {
        self.initial_backoff_secs = secs;
        self
    }

    pub(crate) fn source_name(&self) -> &str {
        &self.source_name
    }

    fn fail(&self, code: u8, message: String) -> CliError {
        CliError { code, message, hint: None }
    }

    /// Send with retry + exponential backoff and return the raw body.
    pub(crate) fn send_text(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<String, CliError> {
        let mut backoff_secs = self.initial_backoff_secs;
        let name = &self.source_name;

        for attempt in 0..=MAX_RETRIES {
            let resp = match build_request(&self.http).send() {
                Ok(resp) => resp,
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(self.fail(
                            exit_codes::EXIT_FETCH_UPSTREAM,
                            format!("{name} upstream error after {MAX_RETRIES} retries: {e}"),
                        ));
                    }
                    tracing::warn!(
                        source = %name,
                        attempt = attempt + 1,
                        wait_secs = backoff_secs,
                        error = %e,
                        "request failed, retrying"
                    );
                    thread::sleep(Duration::from_secs(backoff_secs));
                    backoff_secs *= 2;
                    continue;
                }
            };

            let status = resp.status().as_u16();

            if status == 429 || status >= 500 {
                if attempt == MAX_RETRIES {
                    let (code, what) = if status == 429 {
                        (exit_codes::EXIT_FETCH_RATE_LIMIT, "rate limited")
                    } else {
                        (exit_codes::EXIT_FETCH_UPSTREAM, "upstream error")
                    };
                    return Err(self.fail(
                        code,
                        format!("{name} {what} after {MAX_RETRIES} retries ({status})"),
                    ));
                }

                let wait = if status == 429 {
                    resp.headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(backoff_secs)
                } else {
                    backoff_secs
                };

                tracing::warn!(
                    source = %name,
                    attempt = attempt + 1,
                    wait_secs = wait,
                    status,
                    "retryable HTTP status"
                );
                thread::sleep(Duration::from_secs(wait));
                backoff_secs *= 2;
                continue;
            }

            let text = resp.text().map_err(|e| {
                self.fail(
                    exit_codes::EXIT_FETCH_UPSTREAM,
                    format!("failed to read {name} response body: {e}"),
                )
            })?;

            if status >= 400 {
                let detail = (self.error_extractor)(&text, status);
                let (code, what) = match status {
                    401 | 403 => (exit_codes::EXIT_FETCH_AUTH, "auth failed"),
                    400 => (exit_codes::EXIT_FETCH_VALIDATION, "request rejected"),
                    _ => (exit_codes::EXIT_FETCH_UPSTREAM, "error"),
                };
                return Err(self.fail(code, format!("{name} {what} ({status}): {detail}")));
            }

            return Ok(text);
        }

        unreachable!()
    }

    /// Like [`send_text`](Self::send_text), parsing the body as JSON.
    /// An empty body (e.g. 204) becomes `Value::Null`.
    pub(crate) fn send_json(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, CliError> {
        let text = self.send_text(build_request)?;
        let trimmed = text.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(trimmed).map_err(|e| {
            self.fail(
                exit_codes::EXIT_FETCH_UPSTREAM,
                format!(
                    "failed to parse {} JSON response: {} (body: {})",
                    self.source_name,
                    e,
                    truncate_chars(trimmed, 200),
                ),
            )
        })
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Resolve a credential: flag value > environment variable > error.
pub(crate) fn resolve_credential(
    flag: Option<String>,
    what: &str,
    flag_name: &str,
    env_var: &str,
) -> Result<String, CliError> {
    let missing = || CliError {
        code: exit_codes::EXIT_FETCH_NOT_AUTH,
        message: format!("missing {what} (use {flag_name} or set {env_var})"),
        hint: None,
    };

    if let Some(value) = flag {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            return Err(missing());
        }
        return Ok(trimmed);
    }

    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(missing()),
    }
}

/// Progress lines go to stderr only when it is a terminal and not silenced.
pub(crate) fn show_progress(quiet: bool) -> bool {
    !quiet && atty::is(atty::Stream::Stderr)
}

/// Write `body` to a file or stdout. Returns the output label for messages.
pub(crate) fn write_output(body: &str, out: &Option<PathBuf>) -> Result<String, CliError> {
    match out {
        Some(path) => {
            std::fs::write(path, body)
                .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))?;
            Ok(path.display().to_string())
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{body}")
                .and_then(|_| stdout.flush())
                .map_err(|e| CliError::io(format!("cannot write stdout: {e}")))?;
            Ok("stdout".to_string())
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn plain_error(body: &str, status: u16) -> String {
        if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body.to_string()
        }
    }

    fn client() -> FetchClient {
        FetchClient::new("Test", plain_error)
            .unwrap()
            .with_initial_backoff(0)
    }

    #[test]
    fn test_resolve_credential_flag_priority() {
        let v = resolve_credential(Some("  tok_123  ".into()), "Test token", "--token", "X").unwrap();
        assert_eq!(v, "tok_123");
    }

    #[test]
    fn test_resolve_credential_empty_flag() {
        let err =
            resolve_credential(Some("  ".into()), "Test token", "--token", "X").unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_NOT_AUTH);
        assert!(err.message.contains("missing Test token"));
        assert!(err.message.contains("--token"));
    }

    #[test]
    fn test_resolve_credential_missing() {
        std::env::remove_var("__LISTCHECK_TEST_MISSING");
        let err = resolve_credential(None, "Test token", "--token", "__LISTCHECK_TEST_MISSING")
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_NOT_AUTH);
    }

    #[test]
    fn test_resolve_credential_env() {
        std::env::set_var("__LISTCHECK_TEST_PRESENT", " from-env ");
        let v = resolve_credential(None, "Test token", "--token", "__LISTCHECK_TEST_PRESENT")
            .unwrap();
        assert_eq!(v, "from-env");
    }

    #[test]
    fn test_json_success() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200).json_body(serde_json::json!({"a": 1}));
        });
        let url = server.url("/ok");
        let body = client().send_json(|http| http.get(&url)).unwrap();
        assert_eq!(body["a"], 1);
    }

    #[test]
    fn test_empty_body_is_null() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/gone");
            then.status(204);
        });
        let url = server.url("/gone");
        let body = client().send_json(|http| http.delete(&url)).unwrap();
        assert!(body.is_null());
    }

    #[test]
    fn test_auth_failure_not_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/secret");
            then.status(401).body("Invalid token");
        });
        let url = server.url("/secret");
        let err = client().send_text(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
        assert!(err.message.contains("Test auth failed (401): Invalid token"));
        m.assert_calls(1);
    }

    #[test]
    fn test_bad_request() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/thing");
            then.status(400).body("quantity: required");
        });
        let url = server.url("/thing");
        let err = client().send_text(|http| http.post(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_VALIDATION);
    }

    #[test]
    fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(429).header("retry-after", "0");
        });
        let url = server.url("/busy");
        let err = client().send_text(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_RATE_LIMIT);
        assert!(err.message.contains("rate limited"), "message: {}", err.message);
        // 1 initial + 3 retries
        m.assert_calls(4);
    }

    #[test]
    fn test_server_error_exhausts_retries() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/down");
            then.status(503);
        });
        let url = server.url("/down");
        let err = client().send_text(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        m.assert_calls(4);
    }

    #[test]
    fn test_invalid_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html>login</html>");
        });
        let url = server.url("/html");
        let err = client().send_json(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("<html>login</html>"));
    }

    #[test]
    fn test_write_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let label = write_output("[]", &Some(path.clone())).unwrap();
        assert_eq!(label, path.display().to_string());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
