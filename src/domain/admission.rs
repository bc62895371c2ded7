//! Per-submitter sliding-window admission control.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Admits at most `limit` requests per submitter inside a trailing window.
///
/// Timestamps are pruned lazily on each check, and submitters with nothing
/// left in their window are swept once per elapsed window. State lives for
/// the process lifetime only.
#[derive(Debug)]
pub struct AdmissionController {
    limit: usize,
    window: Duration,
    state: Mutex<Windows>,
}

#[derive(Debug)]
struct Windows {
    by_submitter: HashMap<i64, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl Windows {
    /// Drops submitters whose newest admission has left the window.
    fn sweep(&mut self, now: Instant, window: Duration) {
        let before = self.by_submitter.len();
        self.by_submitter.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|&newest| now.saturating_duration_since(newest) <= window)
        });
        self.last_sweep = now;
        debug!(
            swept = before - self.by_submitter.len(),
            tracked = self.by_submitter.len(),
            "admission windows swept"
        );
    }
}

impl AdmissionController {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Windows {
                by_submitter: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Returns false without recording anything when the submitter is over
    /// the limit.
    pub async fn admit(&self, submitter: i64) -> bool {
        self.admit_at(submitter, Instant::now()).await
    }

    pub(crate) async fn admit_at(&self, submitter: i64, now: Instant) -> bool {
        let mut state = self.state.lock().await;
        if now.saturating_duration_since(state.last_sweep) > self.window {
            state.sweep(now, self.window);
        }

        let stamps = state.by_submitter.entry(submitter).or_default();
        while let Some(&oldest) = stamps.front() {
            if now.saturating_duration_since(oldest) > self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if stamps.len() >= self.limit {
            debug!(submitter, in_window = stamps.len(), "admission denied");
            return false;
        }

        stamps.push_back(now);
        true
    }

    /// Number of submitters currently holding window state.
    pub async fn tracked(&self) -> usize {
        self.state.lock().await.by_submitter.len()
    }
}
