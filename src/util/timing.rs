//! Slow-operation reporting.
use std::time::{Duration, Instant};
use tracing::warn;

const SLOW: Duration = Duration::from_millis(500);
const VERY_SLOW: Duration = Duration::from_secs(10);

/// Logs a warning on drop when the guarded operation ran longer than half a
/// second. Quiet otherwise.
pub struct SlowOp {
    label: String,
    started: Instant,
}

impl SlowOp {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for SlowOp {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        if let Some(note) = slowness(elapsed) {
            warn!(
                op = %self.label,
                elapsed_secs = elapsed.as_secs_f64(),
                "{} completed; this took more than {}",
                self.label,
                note
            );
        }
    }
}

fn slowness(elapsed: Duration) -> Option<&'static str> {
    if elapsed > VERY_SLOW {
        Some("10 seconds")
    } else if elapsed > SLOW {
        Some("1/2 a second")
    } else {
        None
    }
}
