//! Wall-clock timing of the evaluation loop.

use crate::common::*;

/// A tic/toc stopwatch that averages the elapsed time over all intervals.
#[derive(Debug, Clone)]
pub struct Timer {
    instant: Option<Instant>,
    total: Duration,
    count: usize,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            instant: None,
            total: Duration::ZERO,
            count: 0,
        }
    }

    /// Starts an interval.
    pub fn tic(&mut self) {
        self.instant = Some(Instant::now());
    }

    /// Ends the running interval and returns its length.
    ///
    /// It is a no-op returning zero if no interval is running.
    pub fn toc(&mut self) -> Duration {
        match self.instant.take() {
            Some(instant) => {
                let elapsed = instant.elapsed();
                self.total += elapsed;
                self.count += 1;
                elapsed
            }
            None => Duration::ZERO,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn total_time(&self) -> Duration {
        self.total
    }

    /// The average interval in seconds, or zero before the first toc.
    pub fn average_time(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total.as_secs_f64() / self.count as f64
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
