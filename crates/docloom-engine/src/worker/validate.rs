//! External-link reachability worker.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use docloom_core::BoxedError;
use docloom_core::task::ValidationTask;
use docloom_core::urls;
use rand::Rng;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::queue::JobHandler;

/// Tracing target for validation probes.
const TRACING_TARGET: &str = "docloom_engine::worker::validate";

/// Backoff schedule for rate-limited probes.
const BACKOFF_SECS: [u64; 4] = [1, 5, 10, 20];

/// Longest `Retry-After` interval honored.
const MAX_RETRY_AFTER_SECS: u64 = 300;

/// Default per-request timeout of the probing client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Probes external links with HEAD (falling back to GET) and remembers
/// every canonicalized URL it has seen, so each distinct link costs at
/// most one probe per build.
///
/// Reachability failures are logged as warnings and never fail the build.
pub struct ValidationWorker {
    client: reqwest::Client,
    validated: Mutex<HashSet<String>>,
}

impl ValidationWorker {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            validated: Mutex::new(HashSet::new()),
        }
    }

    /// Creates a worker with a default client (30s timeout).
    pub fn with_defaults() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("docloom/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(client))
    }

    /// Number of distinct canonicalized URLs seen so far.
    pub fn validated_count(&self) -> usize {
        self.validated.lock().expect("validated lock poisoned").len()
    }

    /// Records a canonical URL; `true` when it was not seen before.
    fn mark_validated(&self, key: String) -> bool {
        self.validated
            .lock()
            .expect("validated lock poisoned")
            .insert(key)
    }

    async fn probe(&self, token: &CancellationToken, task: &ValidationTask) {
        let mut attempt = 0usize;
        loop {
            let response = match self.client.head(&task.url).send().await {
                Ok(response) => response,
                Err(error) => {
                    warn_unreachable(task, &error.to_string());
                    return;
                }
            };

            let mut status = response.status();
            let mut retry_after = retry_after_secs(&response);

            // Some servers reject HEAD outright; authorization-required
            // responses already prove the host is there.
            if status != StatusCode::TOO_MANY_REQUESTS && needs_get(status) {
                match self.client.get(&task.url).send().await {
                    Ok(response) => {
                        status = response.status();
                        retry_after = retry_after_secs(&response);
                    }
                    Err(error) => {
                        warn_unreachable(task, &error.to_string());
                        return;
                    }
                }
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= BACKOFF_SECS.len() {
                    warn_unreachable(task, "rate limited after all retries");
                    return;
                }
                let delay = retry_delay(attempt, retry_after) + jitter();
                tracing::debug!(
                    target: TRACING_TARGET,
                    url = %task.url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                tokio::select! {
                    () = token.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
                continue;
            }

            if reachable(status) {
                tracing::trace!(target: TRACING_TARGET, url = %task.url, status = %status, "link reachable");
            } else {
                warn_unreachable(task, &format!("HTTP {status}"));
            }
            return;
        }
    }
}

#[async_trait]
impl JobHandler<ValidationTask> for ValidationWorker {
    async fn handle(
        &self,
        token: &CancellationToken,
        task: ValidationTask,
    ) -> Result<(), BoxedError> {
        let Ok(parsed) = Url::parse(&task.url) else {
            warn_unreachable(&task, "not an absolute URL");
            return Ok(());
        };

        if is_sample_host(&parsed) {
            tracing::trace!(target: TRACING_TARGET, url = %task.url, "sample host, skipping probe");
            return Ok(());
        }

        if !self.mark_validated(urls::canonical(&task.url)) {
            return Ok(());
        }

        self.probe(token, &task).await;
        Ok(())
    }
}

fn warn_unreachable(task: &ValidationTask, reason: &str) {
    tracing::warn!(
        target: TRACING_TARGET,
        url = %task.url,
        document = %task.source_path,
        reason,
        "link failed validation"
    );
}

/// Hosts used in documentation samples are never probed.
fn is_sample_host(url: &Url) -> bool {
    match url.host_str() {
        Some(host) => {
            host == "localhost" || host == "127.0.0.1" || host == "1.2.3.4" || host.contains("foo.bar")
        }
        None => true,
    }
}

fn needs_get(status: StatusCode) -> bool {
    status.as_u16() >= 400
        && status != StatusCode::UNAUTHORIZED
        && status != StatusCode::FORBIDDEN
}

fn reachable(status: StatusCode) -> bool {
    status.as_u16() < 400
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
}

fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn retry_delay(attempt: usize, retry_after: Option<u64>) -> Duration {
    match retry_after {
        Some(secs) => Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)),
        None => Duration::from_secs(BACKOFF_SECS[attempt.min(BACKOFF_SECS.len() - 1)]),
    }
}

fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_and_retry_after() {
        assert_eq!(retry_delay(0, None), Duration::from_secs(1));
        assert_eq!(retry_delay(1, None), Duration::from_secs(5));
        assert_eq!(retry_delay(3, None), Duration::from_secs(20));
        assert_eq!(retry_delay(0, Some(42)), Duration::from_secs(42));
        // Retry-After is capped at five minutes.
        assert_eq!(retry_delay(0, Some(3600)), Duration::from_secs(300));
    }

    #[test]
    fn sample_hosts_are_skipped() {
        for url in [
            "http://localhost/a",
            "http://127.0.0.1:8080/b",
            "https://1.2.3.4/c",
            "https://www.foo.bar/d",
            "https://sub.foo.bar.baz/e",
        ] {
            assert!(is_sample_host(&Url::parse(url).unwrap()), "{url}");
        }
        assert!(!is_sample_host(&Url::parse("https://example.com/x").unwrap()));
    }

    #[test]
    fn status_classification() {
        assert!(!needs_get(StatusCode::OK));
        assert!(!needs_get(StatusCode::UNAUTHORIZED));
        assert!(!needs_get(StatusCode::FORBIDDEN));
        assert!(needs_get(StatusCode::NOT_FOUND));
        assert!(needs_get(StatusCode::METHOD_NOT_ALLOWED));

        assert!(reachable(StatusCode::OK));
        assert!(reachable(StatusCode::MOVED_PERMANENTLY));
        assert!(reachable(StatusCode::FORBIDDEN));
        assert!(!reachable(StatusCode::NOT_FOUND));
        assert!(!reachable(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn dedup_is_canonical() {
        let worker = ValidationWorker::with_defaults().unwrap();
        assert!(worker.mark_validated(urls::canonical("https://host/a?x=1")));
        assert!(!worker.mark_validated(urls::canonical("https://host/a#frag")));
        assert_eq!(worker.validated_count(), 1);
    }

    mod probing {
        use docloom_test::{ScriptedResponse, TestServer};

        use super::*;

        fn task(url: String) -> ValidationTask {
            ValidationTask {
                destination: url.clone(),
                url,
                source_path: "docs/a.md".to_string(),
            }
        }

        #[tokio::test]
        async fn head_success_is_one_request() {
            let server = TestServer::start(vec![ScriptedResponse::status(200)])
                .await
                .unwrap();
            let worker = ValidationWorker::with_defaults().unwrap();
            let token = CancellationToken::new();

            worker.probe(&token, &task(server.url("/ok"))).await;
            assert_eq!(server.hits(), 1);
        }

        #[tokio::test]
        async fn head_rejection_falls_back_to_get() {
            let server = TestServer::start(vec![
                ScriptedResponse::status(405),
                ScriptedResponse::status(200),
            ])
            .await
            .unwrap();
            let worker = ValidationWorker::with_defaults().unwrap();
            let token = CancellationToken::new();

            worker.probe(&token, &task(server.url("/no-head"))).await;
            assert_eq!(server.hits(), 2);
        }

        #[tokio::test]
        async fn rate_limit_is_retried_with_backoff() {
            let server = TestServer::start(vec![
                ScriptedResponse::status(429).with_header("retry-after", "1"),
                ScriptedResponse::status(200),
            ])
            .await
            .unwrap();
            let worker = ValidationWorker::with_defaults().unwrap();
            let token = CancellationToken::new();

            let started = std::time::Instant::now();
            worker.probe(&token, &task(server.url("/limited"))).await;
            assert_eq!(server.hits(), 2);
            assert!(started.elapsed() >= Duration::from_secs(1));
        }

        #[tokio::test]
        async fn sample_hosts_are_never_probed() {
            let server = TestServer::start(vec![ScriptedResponse::status(200)])
                .await
                .unwrap();
            let worker = ValidationWorker::with_defaults().unwrap();
            let token = CancellationToken::new();

            // The loopback server host is itself on the sample list, so
            // the full handler path skips it before any socket is opened.
            worker
                .handle(&token, task(server.url("/skipped")))
                .await
                .unwrap();
            assert_eq!(server.hits(), 0);
            assert_eq!(worker.validated_count(), 0);
        }
    }
}
