//! Playback position tracking.
//!
//! While playing, the host calls the transport once per display frame. The
//! loop maps the device clock back to logical time through the anchor
//! recorded at the last start, and reports when the end is reached.

/// Links logical time to the device clock at the moment playback started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub logical_time: f64,
    pub device_time: f64,
}

impl Anchor {
    pub fn new(logical_time: f64, device_time: f64) -> Self {
        Self {
            logical_time,
            device_time,
        }
    }

    /// Logical time corresponding to a device clock reading.
    pub fn logical_at(&self, device_now: f64) -> f64 {
        self.logical_time + (device_now - self.device_time)
    }

    /// Device time corresponding to a logical time.
    pub fn device_at(&self, logical: f64) -> f64 {
        self.device_time + (logical - self.logical_time)
    }
}

/// Result of one display frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// No loop is running; nothing was computed.
    Idle,
    /// Playback continues at this logical time.
    Position(f64),
    /// The end of the score was reached and the transport stopped.
    Finished,
}

/// The per-frame callback that exists only while playing.
///
/// Cancelling is dropping it; the transport holds it in an `Option`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionLoop {
    anchor: Anchor,
    end_seconds: f64,
    /// Last logical time published.
    last: f64,
    frames: u64,
}

impl PositionLoop {
    pub fn new(anchor: Anchor, end_seconds: f64) -> Self {
        Self {
            anchor,
            end_seconds,
            last: anchor.logical_time,
            frames: 0,
        }
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn last_position(&self) -> f64 {
        self.last
    }

    /// Number of frames processed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Computes the position for a device clock reading.
    ///
    /// Positions never move backwards even if the clock reading does.
    /// Returns `None` once the end of the score is reached.
    pub fn tick(&mut self, device_now: f64) -> Option<f64> {
        self.frames += 1;
        let now = self.anchor.logical_at(device_now).max(self.last);
        self.last = now;
        if now >= self.end_seconds {
            None
        } else {
            Some(now)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_mapping() {
        let anchor = Anchor::new(1.0, 20.0);
        assert_eq!(anchor.logical_at(21.0), 2.0);
        assert_eq!(anchor.device_at(1.5), 20.5);
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_tick_until_end() {
        let mut frame_loop = PositionLoop::new(Anchor::new(0.0, 10.0), 2.0);
        assert!(close(frame_loop.tick(10.5), 0.5));
        assert!(close(frame_loop.tick(11.9), 1.9));
        assert!(close(frame_loop.tick(11.999), 1.999));
        assert_eq!(frame_loop.tick(12.0), None);
        assert_eq!(frame_loop.frames(), 4);
    }

    #[test]
    fn test_monotonic_positions() {
        let mut frame_loop = PositionLoop::new(Anchor::new(0.0, 0.0), 10.0);
        assert_eq!(frame_loop.tick(1.0), Some(1.0));
        assert_eq!(frame_loop.tick(0.5), Some(1.0));
        assert_eq!(frame_loop.last_position(), 1.0);
    }
}
