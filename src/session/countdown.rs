use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Fixed-budget session clock
///
/// Decrements `remaining` once per second. When it reaches zero the expiry
/// receiver fires exactly once. Stopping first drops the sender, so no late
/// expiry can arrive.
pub struct Countdown {
    remaining: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    /// Reset `remaining` to `duration_secs` and start ticking
    pub fn start<F>(
        duration_secs: u64,
        remaining: Arc<AtomicU64>,
        on_tick: F,
    ) -> (Self, oneshot::Receiver<()>)
    where
        F: Fn(u64) + Send + 'static,
    {
        remaining.store(duration_secs, Ordering::SeqCst);
        let (expired_tx, expired_rx) = oneshot::channel();

        let counter = Arc::clone(&remaining);
        let task = tokio::spawn(async move {
            if duration_secs == 0 {
                let _ = expired_tx.send(());
                return;
            }

            let period = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let left = counter.load(Ordering::SeqCst).saturating_sub(1);
                counter.store(left, Ordering::SeqCst);
                on_tick(left);

                if left == 0 {
                    info!("Countdown reached zero");
                    let _ = expired_tx.send(());
                    return;
                }
            }
        });

        (
            Self {
                remaining,
                task: Some(task),
            },
            expired_rx,
        )
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Countdown stopped at {}s", self.remaining());
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `mm:ss` for the session clock
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
