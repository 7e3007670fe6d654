//! Output file-size monitoring for long encodes.
//!
//! FFmpeg's own progress output is not available when stderr is captured for
//! diagnostics, so encode progress is approximated by polling the growing
//! output file against an estimated final size (duration x assumed bitrate).

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Poll interval for the output file size.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long to wait for the monitor task to finish after signalling stop.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Point-in-time encode progress estimate.
#[derive(Debug, Clone, Copy)]
pub struct EncodeProgress {
    /// 0-99; capped below 100 because the size estimate is approximate
    pub percent: f64,
    /// Bytes written to the output file so far
    pub bytes_written: u64,
    /// Estimated final output size in bytes
    pub estimated_total_bytes: u64,
    /// Observed write throughput in bytes per second
    pub bytes_per_sec: f64,
    /// Linear extrapolation of remaining encode time
    pub eta: Option<Duration>,
}

/// Background task polling an encode's output file size.
///
/// Stopped cooperatively via a watch channel; `stop` waits a bounded time for
/// the task to observe the signal before abandoning it.
pub struct EncodeMonitor {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl EncodeMonitor {
    /// Spawn a monitor for `output`, expected to grow to roughly
    /// `duration_secs * estimated_bitrate_kbps` worth of data.
    pub fn spawn<F>(
        output: PathBuf,
        duration_secs: f64,
        estimated_bitrate_kbps: u64,
        callback: F,
    ) -> Self
    where
        F: Fn(EncodeProgress) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let estimated_total_bytes =
            ((duration_secs * estimated_bitrate_kbps as f64 * 1000.0 / 8.0) as u64).max(1);

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                if *stop_rx.borrow() {
                    break;
                }

                // Output may not exist yet during encoder startup.
                let bytes_written = match tokio::fs::metadata(&output).await {
                    Ok(meta) => meta.len(),
                    Err(_) => continue,
                };

                let elapsed = started.elapsed().as_secs_f64();
                let bytes_per_sec = if elapsed > 0.0 {
                    bytes_written as f64 / elapsed
                } else {
                    0.0
                };
                let percent =
                    (bytes_written as f64 / estimated_total_bytes as f64 * 100.0).min(99.0);
                let eta = if bytes_per_sec > 0.0 && bytes_written < estimated_total_bytes {
                    let remaining = (estimated_total_bytes - bytes_written) as f64;
                    Some(Duration::from_secs_f64(remaining / bytes_per_sec))
                } else {
                    None
                };

                callback(EncodeProgress {
                    percent,
                    bytes_written,
                    estimated_total_bytes,
                    bytes_per_sec,
                    eta,
                });
            }
        });

        Self { stop_tx, handle }
    }

    /// Signal the monitor to stop and wait briefly for it to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if tokio::time::timeout(JOIN_TIMEOUT, self.handle).await.is_err() {
            warn!("encode monitor did not stop within the join timeout");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_monitor_reports_file_growth() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        // 4 seconds at 2000 kbps estimates 1 MB; write a quarter of that.
        tokio::fs::write(&output, vec![0u8; 250_000]).await.unwrap();

        let last_percent = Arc::new(AtomicU64::new(0));
        let observed = last_percent.clone();
        let monitor = EncodeMonitor::spawn(output, 4.0, 2000, move |p| {
            observed.store(p.percent as u64, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        monitor.stop().await;

        let percent = last_percent.load(Ordering::SeqCst);
        assert!(percent >= 20 && percent <= 30, "percent was {percent}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_percent_capped() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        // File already larger than the 1-second estimate.
        tokio::fs::write(&output, vec![0u8; 500_000]).await.unwrap();

        let last_percent = Arc::new(AtomicU64::new(0));
        let observed = last_percent.clone();
        let monitor = EncodeMonitor::spawn(output, 1.0, 2000, move |p| {
            observed.store(p.percent as u64, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        monitor.stop().await;

        assert_eq!(last_percent.load(Ordering::SeqCst), 99);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_stops_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = EncodeMonitor::spawn(dir.path().join("missing.mp4"), 10.0, 2000, |_| {});
        monitor.stop().await;
    }
}
