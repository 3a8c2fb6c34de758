//! Rolling one-second frame counter for FPS sampling

/// Window length for one FPS sample.
pub const FPS_WINDOW_MS: f64 = 1000.0;

/// Counts frame callbacks against a wall-clock window. Driven by the
/// per-frame timestamp (DOMHighResTimeStamp in the browser), so the same
/// code serves the XR callback and the inline render loop.
#[derive(Debug, Clone, Default)]
pub struct FrameWindow {
    window_start_ms: Option<f64>,
    frames: u32,
}

impl FrameWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame. Returns an FPS sample once a full second has
    /// elapsed, then resets the window.
    pub fn tick(&mut self, now_ms: f64) -> Option<u32> {
        let start = match self.window_start_ms {
            Some(start) => start,
            None => {
                self.window_start_ms = Some(now_ms);
                self.frames = 1;
                return None;
            }
        };

        if now_ms - start >= FPS_WINDOW_MS {
            let fps = self.frames;
            self.window_start_ms = Some(now_ms);
            // the boundary frame opens the next window
            self.frames = 1;
            Some(fps)
        } else {
            self.frames += 1;
            None
        }
    }

    /// Forget any partial window, e.g. across session boundaries.
    pub fn reset(&mut self) {
        self.window_start_ms = None;
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_sample_per_second() {
        let mut window = FrameWindow::new();

        // 60 frames over one second
        let mut sample = None;
        for i in 0..=60 {
            let now = i as f64 * (1000.0 / 60.0);
            if let Some(fps) = window.tick(now) {
                sample = Some(fps);
            }
        }
        assert_eq!(sample, Some(60));
    }

    #[test]
    fn test_no_sample_inside_window() {
        let mut window = FrameWindow::new();
        assert_eq!(window.tick(0.0), None);
        assert_eq!(window.tick(400.0), None);
        assert_eq!(window.tick(999.0), None);
    }

    #[test]
    fn test_window_resets_after_sample() {
        let mut window = FrameWindow::new();
        window.tick(0.0);
        for i in 1..=10 {
            window.tick(i as f64 * 100.0);
        }
        // previous tick at 1000.0 emitted a sample of 10 and reset
        assert_eq!(window.tick(1100.0), None);
        assert_eq!(window.tick(2000.0), Some(2));
    }

    #[test]
    fn test_slow_device_low_sample() {
        let mut window = FrameWindow::new();
        window.tick(0.0);
        let mut sample = None;
        for i in 1..=12 {
            // ~12 fps
            if let Some(fps) = window.tick(i as f64 * 84.0) {
                sample = Some(fps);
            }
        }
        assert_eq!(sample, Some(12));
    }

    #[test]
    fn test_reset_discards_partial_window() {
        let mut window = FrameWindow::new();
        window.tick(0.0);
        window.tick(500.0);
        window.reset();
        assert_eq!(window.tick(1000.0), None);
    }
}
