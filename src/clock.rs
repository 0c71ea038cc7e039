//! Elapsed-time display shown while a solver runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);

/// A console spinner showing wall time since it was started.
///
/// The spinner ticks on its own thread and shares nothing with the solve it
/// accompanies. Dropping the clock clears it.
pub struct ElapsedClock {
    bar: ProgressBar,
}

impl ElapsedClock {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK);
        ElapsedClock { bar }
    }

    /// A clock that draws nothing, for quiet runs and tests.
    pub fn hidden() -> Self {
        ElapsedClock { bar: ProgressBar::hidden() }
    }

    /// Stop ticking, clear the line and return the time shown.
    pub fn stop(self) -> Duration {
        let elapsed = self.bar.elapsed();
        self.bar.finish_and_clear();
        elapsed
    }
}

impl Drop for ElapsedClock {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_clock_measures_time() {
        let clock = ElapsedClock::hidden();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.stop() >= Duration::from_millis(5));
    }
}
