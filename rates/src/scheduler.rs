//! Background scheduler running rate updates on a fixed interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use valutatrade_common::time::constants;

use crate::aggregator::RateAggregator;

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Runs `run_update` on one background task until stopped.
///
/// The stop signal is checked between polling slices, so shutdown latency is
/// bounded by the polling interval rather than the update interval. An
/// update already in flight is allowed to finish.
pub struct UpdateScheduler {
    aggregator: Arc<RateAggregator>,
    interval: Duration,
    polling_interval: Duration,
    shutdown_timeout: Duration,
    runs: Arc<AtomicU64>,
    running: Mutex<Option<Running>>,
}

impl UpdateScheduler {
    pub fn new(aggregator: Arc<RateAggregator>, interval: Duration) -> Self {
        Self {
            aggregator,
            interval,
            polling_interval: constants::polling_interval(),
            shutdown_timeout: constants::shutdown_timeout(),
            runs: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    /// Set the stop-signal polling slice.
    pub fn with_polling_interval(mut self, polling_interval: Duration) -> Self {
        self.polling_interval = polling_interval.max(Duration::from_millis(1));
        self
    }

    /// Set how long `stop` waits for the task before aborting it.
    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of completed update runs.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Start the background task. Must be called inside a tokio runtime.
    ///
    /// Returns `false` if the scheduler is already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if let Some(current) = running.as_ref() {
            if !current.handle.is_finished() {
                warn!("Scheduler already running");
                return false;
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.aggregator.clone(),
            self.interval,
            self.polling_interval,
            stop_rx,
            self.runs.clone(),
        ));

        info!(interval_secs = self.interval.as_secs(), "Scheduler started");
        *running = Some(Running { stop_tx, handle });
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .map(|r| !r.handle.is_finished())
            .unwrap_or(false)
    }

    /// Signal the task to stop and wait for it up to the shutdown timeout.
    ///
    /// Returns `true` if the task exited on its own, `false` if it had to be
    /// aborted or was not running.
    pub async fn stop(&self) -> bool {
        let Some(Running { stop_tx, mut handle }) = self.running.lock().take() else {
            debug!("Scheduler not running");
            return false;
        };

        let _ = stop_tx.send(true);

        match tokio::time::timeout(self.shutdown_timeout, &mut handle).await {
            Ok(Ok(())) => {
                info!(runs = self.runs(), "Scheduler stopped");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Scheduler task ended abnormally");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Scheduler did not stop in time, aborting"
                );
                handle.abort();
                false
            }
        }
    }

    /// Run one update on the caller's task.
    pub async fn run_once(&self) -> bool {
        let ok = self.aggregator.run_update(None).await;
        self.runs.fetch_add(1, Ordering::SeqCst);
        ok
    }
}

async fn run_loop(
    aggregator: Arc<RateAggregator>,
    interval: Duration,
    polling_interval: Duration,
    stop_rx: watch::Receiver<bool>,
    runs: Arc<AtomicU64>,
) {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        let ok = aggregator.run_update(None).await;
        let run = runs.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(run, ok, "Scheduled update finished");

        let mut waited = Duration::ZERO;
        while waited < interval {
            if *stop_rx.borrow() {
                return;
            }
            let slice = polling_interval.min(interval - waited);
            tokio::time::sleep(slice).await;
            waited += slice;
        }
    }
}
