//! Frame timing utilities

use std::time::Instant;

/// Windowed frame-rate counter
///
/// Accumulates completed frames and reports the measured rate once per
/// reporting window. Deadline misses are folded into the measurement; there
/// is no catch-up or smoothing across windows.
pub struct FrameRateCounter {
    window_start: Instant,
    frames_in_window: u64,
    report_every: u64,
}

impl FrameRateCounter {
    /// Create a counter that reports every `report_every` completed frames
    pub fn new(report_every: u64) -> Self {
        Self {
            window_start: Instant::now(),
            frames_in_window: 0,
            report_every: report_every.max(1),
        }
    }

    /// Change the reporting window length, restarting the current window
    pub fn set_report_every(&mut self, report_every: u64) {
        self.report_every = report_every.max(1);
        self.reset();
    }

    /// Restart the current window
    pub fn reset(&mut self) {
        self.window_start = Instant::now();
        self.frames_in_window = 0;
    }

    /// Record one completed frame
    ///
    /// Returns the measured frames-per-second when the window completes,
    /// otherwise `None`.
    pub fn frame_completed(&mut self) -> Option<f32> {
        self.frames_in_window += 1;
        if self.frames_in_window < self.report_every {
            return None;
        }
        let elapsed = self.window_start.elapsed().as_secs_f32();
        let fps = if elapsed > 0.0 {
            self.frames_in_window as f32 / elapsed
        } else {
            0.0
        };
        self.reset();
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn counter_reports_once_per_window() {
        let mut counter = FrameRateCounter::new(3);
        assert!(counter.frame_completed().is_none());
        assert!(counter.frame_completed().is_none());
        sleep(Duration::from_millis(5));
        let fps = counter.frame_completed().expect("window complete");
        assert!(fps > 0.0);
        // The window restarts after a report.
        assert!(counter.frame_completed().is_none());
    }

    #[test]
    fn short_windows_are_clamped_to_one_frame() {
        let mut counter = FrameRateCounter::new(0);
        sleep(Duration::from_millis(2));
        assert!(counter.frame_completed().is_some());
    }
}
