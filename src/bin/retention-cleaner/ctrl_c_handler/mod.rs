// Cancels the run on Ctrl+C, or exits quietly once the run is cancelled
// some other way.

use retention_cleaner::PipelineCancellationToken;
use tokio::task::JoinHandle;
use tokio::{select, signal};
use tracing::{debug, warn};

pub fn spawn_ctrl_c_handler(cancellation_token: PipelineCancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        select! {
            _ = cancellation_token.cancelled() => {
                debug!("cancellation_token canceled.")
            }
            _ = signal::ctrl_c() => {
                warn!("ctrl-c received, finishing in-flight deletions.");
                cancellation_token.cancel();
            }
        }
    })
}
