//! Generic "watch an external resource until it goes away" primitive:
//! fixed-interval probing with a cancellation token. The popup route uses it
//! for leak-proof close detection; an event-driven platform can replace the
//! probe without touching the state machine.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub const WATCH_INTERVAL: Duration = Duration::from_millis(1000);

/// Probes on a fixed cadence until `probe` reports the resource gone
/// (returns `true`) or the token is cancelled (returns `false`). The first
/// probe runs one interval after the call, matching a plain repeating timer.
pub async fn watch_until_closed<F, Fut>(
    interval: Duration,
    cancel: CancellationToken,
    mut probe: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(interval) => {
                if probe().await {
                    return true;
                }
            }
        }
    }
}
