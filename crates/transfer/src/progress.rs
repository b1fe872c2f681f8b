use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

/// Progress of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub sent: u64,
    pub total: u64,
    /// Set only once storage acknowledged the write.
    pub done: bool,
}

impl TransferProgress {
    /// Fraction of bytes handed to the transport, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.done {
            return 1.0;
        }
        if self.total == 0 {
            return 0.0;
        }
        (self.sent as f64 / self.total as f64).min(1.0)
    }

    /// Whole percent. Stays below 100 until the write is acknowledged.
    pub fn percent(&self) -> u8 {
        if self.done {
            return 100;
        }
        ((self.fraction() * 100.0).floor() as u8).min(99)
    }
}

/// Sending half of a per-transfer progress stream.
///
/// Reports that would move backwards are dropped, so the receiver only
/// ever observes increasing values.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<TransferProgress>,
    high_water: Arc<AtomicU64>,
}

/// Creates a progress stream for one transfer.
pub fn progress_channel() -> (ProgressSink, mpsc::UnboundedReceiver<TransferProgress>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressSink {
            tx,
            high_water: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

impl ProgressSink {
    /// Reports `sent` of `total` bytes handed to the transport.
    pub fn report(&self, sent: u64, total: u64) {
        let previous = self.high_water.fetch_max(sent, Ordering::AcqRel);
        if sent <= previous {
            return;
        }
        let _ = self.tx.send(TransferProgress {
            sent,
            total,
            done: false,
        });
    }

    /// Reports the acknowledged end of the transfer.
    pub fn complete(&self, total: u64) {
        self.high_water.fetch_max(total, Ordering::AcqRel);
        let _ = self.tx.send(TransferProgress {
            sent: total,
            total,
            done: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<TransferProgress>) -> Vec<TransferProgress> {
        let mut out = Vec::new();
        while let Ok(p) = rx.try_recv() {
            out.push(p);
        }
        out
    }

    #[test]
    fn percent_caps_at_99_until_done() {
        let streaming = TransferProgress {
            sent: 100,
            total: 100,
            done: false,
        };
        assert_eq!(streaming.percent(), 99);

        let done = TransferProgress {
            done: true,
            ..streaming
        };
        assert_eq!(done.percent(), 100);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        let p = TransferProgress {
            sent: 0,
            total: 0,
            done: false,
        };
        assert_eq!(p.percent(), 0);
        assert_eq!(p.fraction(), 0.0);
    }

    #[test]
    fn regressions_are_dropped() {
        let (sink, mut rx) = progress_channel();
        sink.report(10, 100);
        sink.report(5, 100);
        sink.report(10, 100);
        sink.report(50, 100);

        let sent: Vec<u64> = drain(&mut rx).iter().map(|p| p.sent).collect();
        assert_eq!(sent, vec![10, 50]);
    }

    #[test]
    fn complete_is_always_delivered() {
        let (sink, mut rx) = progress_channel();
        sink.report(100, 100);
        sink.complete(100);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(events[1].done);
        assert_eq!(events[1].percent(), 100);
    }

    #[test]
    fn report_after_receiver_dropped_does_not_panic() {
        let (sink, rx) = progress_channel();
        drop(rx);
        sink.report(1, 2);
        sink.complete(2);
    }

    #[test]
    fn clones_share_high_water_mark() {
        let (sink, mut rx) = progress_channel();
        let other = sink.clone();
        sink.report(40, 100);
        other.report(30, 100);

        assert_eq!(drain(&mut rx).len(), 1);
    }
}
