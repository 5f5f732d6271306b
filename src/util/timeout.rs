//! Deadline applied to every backend round trip.

use std::future::Future;
use std::time::Duration;

use crate::error::WaybillError;

/// Wrap a future with a timeout. Expiry is reported as
/// [`WaybillError::Timeout`], like any other request failure.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, WaybillError>>,
) -> Result<T, WaybillError> {
    let timeout_ms = duration.as_millis() as u64;
    tokio::time::timeout(duration, future).await.unwrap_or_else(|_| {
        tracing::warn!(timeout_ms, "deadline elapsed");
        Err(WaybillError::Timeout(timeout_ms))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_future_times_out() {
        let result: Result<(), _> = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(WaybillError::Timeout(50))));
    }

    #[tokio::test]
    async fn fast_future_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, WaybillError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
