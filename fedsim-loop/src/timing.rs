//! Round timing instrumentation.
//!
//! Research consumers compare configurations by per-round throughput, so
//! the loop measures every round and the checkpoint/evaluation overhead
//! around it. `RoundTimer` also keeps a running mean for ETA logging.

use std::time::Instant;

/// Wall-clock timer with a running mean over completed laps.
#[derive(Debug, Default)]
pub struct RoundTimer {
    current: Option<Instant>,
    total_secs: f64,
    laps: u64,
}

impl RoundTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.current = Some(Instant::now());
    }

    /// Seconds since `start`; records the lap. Returns 0.0 if the timer
    /// was never started.
    pub fn stop_secs(&mut self) -> f64 {
        let secs = self
            .current
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.total_secs += secs;
        self.laps += 1;
        secs
    }

    /// Mean lap duration so far, if any lap completed.
    pub fn mean_secs(&self) -> Option<f64> {
        (self.laps > 0).then(|| self.total_secs / self.laps as f64)
    }

    /// Estimated seconds for `remaining` more laps at the current mean.
    pub fn eta_secs(&self, remaining: u64) -> Option<f64> {
        self.mean_secs().map(|mean| mean * remaining as f64)
    }
}

/// Time one closure, returning its output and the elapsed seconds.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed().as_secs_f64())
}
