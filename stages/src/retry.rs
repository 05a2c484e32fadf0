//! Bounded exponential backoff for CMS transient errors (spec §7: "retried by
//! PersistStage up to a small bound (3) with exponential backoff").

use polygo_core::CmsError;
use std::future::Future;
use std::time::Duration;

const BASE_DELAY: Duration = Duration::from_millis(100);

/// Retry `op` while it returns a transient [`CmsError`], up to `bound` extra attempts
/// beyond the first, doubling the delay each time.
pub async fn retry_transient<F, Fut, T>(bound: u32, mut op: F) -> Result<T, CmsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CmsError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < bound => {
                attempt += 1;
                tokio::time::sleep(BASE_DELAY * 2u32.pow(attempt - 1)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_failures_up_to_the_bound() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), CmsError> = retry_transient(3, || async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(CmsError::Transient("boom".to_string()))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), CmsError> = retry_transient(3, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(CmsError::NotFound("nope".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_exhausting_the_bound() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), CmsError> = retry_transient(2, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(CmsError::Transient("still down".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
