use std::time::{Duration, Instant};

/// Measures planning phases and bounds waits on external processes.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn now() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Restart the timer, e.g. at the beginning of the next phase.
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left before `limit` is reached, or `None` once it has passed.
    pub fn remaining(&self, limit: Duration) -> Option<Duration> {
        limit.checked_sub(self.elapsed()).filter(|left| !left.is_zero())
    }

    /// Log a debug message with the time spent in `phase` since the last reset.
    pub fn log_elapsed(&self, phase: &str) {
        log::debug!("{phase} took {:.3}s", self.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_remaining() {
        let timer = Timer::now();
        assert!(timer.remaining(Duration::from_secs(3600)).is_some());
        assert_eq!(None, timer.remaining(Duration::ZERO));
    }
}
