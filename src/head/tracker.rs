//! Pure orientation state machine: motion bookkeeping and violation
//! classification. No clocks or I/O in here; the worker owns those.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::state::HeadThresholds;

/// One 3-axis orientation reading, degrees. Alpha is yaw in [0, 360),
/// beta pitch, gamma roll. Only the latest sample is retained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrientationSample {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// Axis delta below this is sensor jitter, not movement.
pub const MOTION_JITTER_DEG: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationKind {
    pub looking_down: bool,
    pub looking_away: bool,
    pub too_still: bool,
}

impl ViolationKind {
    pub fn any(self) -> bool {
        self.looking_down || self.looking_away || self.too_still
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.looking_down {
            parts.push("looking_down");
        }
        if self.looking_away {
            parts.push("looking_away");
        }
        if self.too_still {
            parts.push("too_still");
        }
        write!(f, "{}", parts.join("+"))
    }
}

pub struct HeadTracker {
    last_orientation: Option<OrientationSample>,
    last_move: Option<Instant>,
}

impl HeadTracker {
    pub fn new() -> Self {
        Self {
            last_orientation: None,
            last_move: None,
        }
    }

    /// Feed one sample. Motion bookkeeping always runs, even with tracking
    /// disabled, so re-enabling tracking never sees a stale stillness window.
    /// Returns a violation candidate when tracking is enabled and any
    /// classification fires.
    pub fn observe(
        &mut self,
        sample: OrientationSample,
        now: Instant,
        tracking_enabled: bool,
        thresholds: &HeadThresholds,
    ) -> Option<ViolationKind> {
        let moved = match self.last_orientation {
            Some(prev) => {
                (sample.alpha - prev.alpha).abs() > MOTION_JITTER_DEG
                    || (sample.beta - prev.beta).abs() > MOTION_JITTER_DEG
                    || (sample.gamma - prev.gamma).abs() > MOTION_JITTER_DEG
            }
            // First sample counts as motion.
            None => true,
        };
        if moved {
            self.last_move = Some(now);
        }
        self.last_orientation = Some(sample);

        if !tracking_enabled {
            return None;
        }

        // Yaw deviation from straight ahead, on either side of the 0/360 seam.
        let yaw_dev = sample.alpha.abs().min((sample.alpha - 360.0).abs());
        let kind = ViolationKind {
            looking_down: sample.beta > thresholds.down_deg,
            looking_away: yaw_dev > thresholds.away_deg,
            too_still: self
                .last_move
                .map(|t| now.duration_since(t).as_millis() as u64 > thresholds.stillness_ms)
                .unwrap_or(false),
        };

        kind.any().then_some(kind)
    }
}
