//! Polling assertions for tests whose outcome settles asynchronously.

use std::time::Duration;

/// Default polling interval.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls `condition` on the tokio clock until it holds or `timeout` expires.
///
/// Returns whether the condition held. Checked one final time after the
/// deadline so a slow scheduler does not cause a false negative.
///
/// # Example
///
/// ```no_run
/// use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
/// use std::time::Duration;
/// use jetledger_test_utils::assert_eventually;
///
/// # async fn example() {
/// let flag = Arc::new(AtomicBool::new(false));
/// let setter = Arc::clone(&flag);
/// tokio::spawn(async move { setter.store(true, Ordering::SeqCst) });
///
/// assert!(assert_eventually(Duration::from_millis(200), || flag.load(Ordering::SeqCst)).await);
/// # }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = tokio::time::Instant::now();

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    condition()
}

/// Blocking variant of [`assert_eventually`] for thread-based tests.
pub fn wait_until<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    condition()
}
