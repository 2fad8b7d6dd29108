//! Wall-clock timing of a run
use std::time::Instant;
use tracing::debug;

/// A timing scope that reports its elapsed time when dropped.
pub struct RunTimer {
    start: Instant,
    name: &'static str,
}

impl RunTimer {
    /// Starts a new timing scope.
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Gets elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for RunTimer {
    fn drop(&mut self) {
        debug!("{} finished in {:.6} s", self.name, self.elapsed_secs());
    }
}
