//! Registry lookup with per-attempt timeout and linear backoff.

use std::time::Duration;

use {
    serde::Deserialize,
    stickler_config::UpdateCheckConfig,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use stickler_metrics::{counter, histogram, labels, updates as update_metrics};

use crate::version::{is_newer_version, normalize_version};

#[derive(Debug, thiserror::Error)]
pub enum UpdateCheckError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("registry returned HTTP {status}")]
    Status { status: u16 },
    #[error("registry response has no version")]
    MissingVersion,
}

impl UpdateCheckError {
    /// Client errors other than rate limiting will not change on retry.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status } => *status == 429 || *status >= 500,
            Self::MissingVersion => false,
        }
    }
}

/// The npm "latest" document; only `version` matters.
#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    version: Option<String>,
}

/// Outcome of a version check. Failures are reported here, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCheck {
    pub success: bool,
    pub is_outdated: bool,
    pub current: String,
    pub latest: Option<String>,
    pub error: Option<String>,
}

pub struct UpdateChecker {
    client: reqwest::Client,
    registry_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    current_version: String,
}

impl UpdateChecker {
    pub fn new(config: &UpdateCheckConfig, current_version: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            registry_url: config.registry_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            current_version: normalize_version(&current_version.into()),
        }
    }

    /// Ask the registry for the latest version and compare it with ours.
    ///
    /// Makes up to `max_retries + 1` attempts, sleeping
    /// `retry_delay * attempt` between them.
    pub async fn check_for_updates(&self) -> UpdateCheck {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        let mut attempt = 0;
        let result = loop {
            match self.fetch_latest().await {
                Ok(latest) => break Ok(latest),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    attempt += 1;
                    let delay = self.retry_delay * attempt;
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "version check failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                },
                Err(e) => break Err(e),
            }
        };

        let check = match result {
            Ok(latest) => {
                let is_outdated = is_newer_version(&latest, &self.current_version);
                info!(
                    current = %self.current_version,
                    latest = %latest,
                    is_outdated,
                    "version check complete"
                );
                UpdateCheck {
                    success: true,
                    is_outdated,
                    current: self.current_version.clone(),
                    latest: Some(latest),
                    error: None,
                }
            },
            Err(e) => {
                warn!(error = %e, attempts = attempt + 1, "version check failed");
                UpdateCheck {
                    success: false,
                    is_outdated: false,
                    current: self.current_version.clone(),
                    latest: None,
                    error: Some(e.to_string()),
                }
            },
        };

        #[cfg(feature = "metrics")]
        {
            let outcome = match (check.success, check.is_outdated) {
                (false, _) => "error",
                (true, true) => "outdated",
                (true, false) => "ok",
            };
            counter!(update_metrics::CHECKS_TOTAL, labels::OUTCOME => outcome).increment(1);
            histogram!(update_metrics::CHECK_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
        }

        check
    }

    async fn fetch_latest(&self) -> Result<String, UpdateCheckError> {
        let response = self
            .client
            .get(&self.registry_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateCheckError::Status {
                status: status.as_u16(),
            });
        }

        let document = response.json::<RegistryDocument>().await?;
        document
            .version
            .map(|v| normalize_version(&v))
            .filter(|v| !v.is_empty())
            .ok_or(UpdateCheckError::MissingVersion)
    }
}

/// Multi-line notice for an outdated install, or `None` when up to date.
pub fn format_update_notice(check: &UpdateCheck) -> Option<String> {
    if !check.success || !check.is_outdated {
        return None;
    }
    let latest = check.latest.as_deref()?;
    Some(format!(
        "A new version of stickler is available: {} -> {latest}\n\
         Update with your package manager or download the latest release.",
        check.current
    ))
}

/// One-line summary suitable for logs and the CLI.
pub fn format_status_line(check: &UpdateCheck) -> String {
    match (check.success, check.is_outdated, check.latest.as_deref()) {
        (true, true, Some(latest)) => {
            format!("stickler {} (update available: {latest})", check.current)
        },
        (true, _, _) => format!("stickler {} (up to date)", check.current),
        (false, ..) => format!(
            "stickler {} (update check failed: {})",
            check.current,
            check.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: String, max_retries: u32) -> UpdateCheckConfig {
        UpdateCheckConfig {
            enabled: true,
            registry_url: url,
            timeout_secs: 5,
            max_retries,
            retry_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn reports_outdated() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/stickler/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"name": "stickler", "version": "0.5.0"}).to_string())
            .create_async()
            .await;

        let checker = UpdateChecker::new(&config(format!("{}/stickler/latest", server.url()), 3), "0.4.2");
        let check = checker.check_for_updates().await;

        assert!(check.success);
        assert!(check.is_outdated);
        assert_eq!(check.latest.as_deref(), Some("0.5.0"));
        assert_eq!(check.current, "0.4.2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reports_up_to_date() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/latest")
            .with_status(200)
            .with_body(r#"{"version":"v0.4.2"}"#)
            .create_async()
            .await;

        let checker = UpdateChecker::new(&config(format!("{}/latest", server.url()), 0), "v0.4.2");
        let check = checker.check_for_updates().await;
        assert!(check.success);
        assert!(!check.is_outdated);
        assert!(format_update_notice(&check).is_none());
        assert_eq!(format_status_line(&check), "stickler 0.4.2 (up to date)");
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_reported() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/latest")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let checker = UpdateChecker::new(&config(format!("{}/latest", server.url()), 2), "0.4.2");
        let check = checker.check_for_updates().await;

        assert!(!check.success);
        assert!(check.error.as_deref().unwrap().contains("503"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/latest")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let checker = UpdateChecker::new(&config(format!("{}/latest", server.url()), 3), "0.4.2");
        let check = checker.check_for_updates().await;
        assert!(!check.success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_version_field_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/latest")
            .with_status(200)
            .with_body(r#"{"name":"stickler"}"#)
            .create_async()
            .await;

        let checker = UpdateChecker::new(&config(format!("{}/latest", server.url()), 0), "0.4.2");
        let check = checker.check_for_updates().await;
        assert!(!check.success);
        assert_eq!(check.error.as_deref(), Some("registry response has no version"));
    }

    #[tokio::test]
    async fn unreachable_registry_is_folded_into_result() {
        let checker = UpdateChecker::new(&config("http://127.0.0.1:1/latest".into(), 1), "0.4.2");
        let check = checker.check_for_updates().await;
        assert!(!check.success);
        assert!(check.error.is_some());
        assert!(format_status_line(&check).contains("update check failed"));
    }

    #[test]
    fn notice_mentions_both_versions() {
        let check = UpdateCheck {
            success: true,
            is_outdated: true,
            current: "0.4.2".into(),
            latest: Some("0.5.0".into()),
            error: None,
        };
        let notice = format_update_notice(&check).unwrap();
        assert!(notice.contains("0.4.2 -> 0.5.0"));
        assert_eq!(
            format_status_line(&check),
            "stickler 0.4.2 (update available: 0.5.0)"
        );
    }
}
