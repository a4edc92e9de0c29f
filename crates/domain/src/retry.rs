//! Re-running a unit of work after transient store failures.

use std::future::Future;
use std::time::Instant;

use crate::error::DomainError;

/// Attempts made for one workflow operation, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Runs `attempt` until it succeeds, fails permanently, or has been tried
/// [`MAX_ATTEMPTS`] times.
///
/// Each call of `attempt` must open its own transaction.
pub(crate) async fn with_retry<T, F, Fut>(
    operation: &'static str,
    mut attempt: F,
) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let start = Instant::now();
    let mut tries = 1;

    let result = loop {
        match attempt().await {
            Err(err) if err.is_transient() && tries < MAX_ATTEMPTS => {
                tracing::warn!(operation, attempt = tries, error = %err, "transient store failure, retrying");
                metrics::counter!("order_workflow_retries_total", "operation" => operation)
                    .increment(1);
                tries += 1;
            }
            other => break other,
        }
    };

    metrics::histogram!("order_workflow_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
    result
}
