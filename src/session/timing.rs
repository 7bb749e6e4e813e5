/// Frame delta measurement from the frame timestamps handed to `update`.
#[derive(Debug)]
pub struct FrameClock {
    last_frame_time: Option<f64>,
    last_fps_time: f64,
    frame_count: u32,
    pub frame_dt: f32,
    first_frame_dt: f32,
}

impl FrameClock {
    pub fn new(first_frame_dt: f32) -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: 0.0,
            frame_count: 0,
            frame_dt: first_frame_dt,
            first_frame_dt,
        }
    }

    /// Record a frame at `now` seconds and return its dt. Timestamps that go
    /// backwards yield a zero dt.
    pub fn tick(&mut self, now: f64) -> f32 {
        let dt = match self.last_frame_time {
            Some(last) => (now - last).max(0.0) as f32,
            None => {
                self.last_fps_time = now;
                self.first_frame_dt
            }
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt;

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now - self.last_fps_time;
        if elapsed >= 0.5 {
            let fps = self.frame_count as f64 / elapsed;
            log::trace!("{:.1} fps (cadence {:.2} ms)", fps, dt * 1000.0);
            self.frame_count = 0;
            self.last_fps_time = now;
        }
        dt
    }

    /// Forget the previous frame; the next tick uses the first-frame dt.
    pub fn reset(&mut self) {
        self.last_frame_time = None;
        self.frame_count = 0;
        self.frame_dt = self.first_frame_dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_uses_default_then_measures() {
        let mut clock = FrameClock::new(1.0 / 60.0);
        assert_eq!(clock.tick(10.0), 1.0 / 60.0);
        assert!((clock.tick(10.25) - 0.25).abs() < 1e-6);
        assert_eq!(clock.tick(10.0), 0.0);
    }

    #[test]
    fn reset_restarts_measurement() {
        let mut clock = FrameClock::new(0.02);
        clock.tick(1.0);
        clock.tick(1.5);
        clock.reset();
        assert_eq!(clock.tick(100.0), 0.02);
    }
}
