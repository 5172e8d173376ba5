use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};

/// Background ticker feeding one message per elapsed period into the session loop.
pub(crate) struct Countdown {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Countdown {
    pub(crate) fn spawn(period: Duration, ticks: mpsc::Sender<()>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(tick_loop(period, ticks, shutdown_rx));
        tracing::debug!(period_ms = period.as_millis() as u64, "Countdown started");
        Self { shutdown, handle }
    }

    /// Stops the ticker and waits until no further tick can be sent.
    pub(crate) async fn stop(self) {
        if self.shutdown.send(true).is_err() {
            tracing::debug!("Countdown already finished");
        }
        if let Err(err) = self.handle.await {
            tracing::error!(error = %err, "Countdown task join failed");
        }
        tracing::debug!("Countdown stopped");
    }
}

async fn tick_loop(period: Duration, ticks: mpsc::Sender<()>, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval_at(Instant::now() + period, period);
    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if ticks.send(()).await.is_err() {
                    break;
                }
            }
        }
    }
}
