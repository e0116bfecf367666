/// Board clock
///
/// Supplies "now" for every time-window decision. A stored millisecond
/// offset lets an operator move the board into the display window without
/// touching the system clock. Window math never reads the wall clock itself;
/// callers pass it an instant taken from here.
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Offsets are clamped to about a century either way
pub const MAX_OFFSET_MS: i64 = 100 * 365 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    offset_ms: i64,
}

impl Clock {
    pub fn new(offset_ms: i64) -> Self {
        Self {
            offset_ms: clamp_offset(offset_ms),
        }
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Wall clock shifted by the stored offset
    pub fn now(&self) -> DateTime<Utc> {
        self.at(Utc::now())
    }

    /// Apply the offset to an arbitrary wall-clock instant
    pub fn at(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        wall.checked_add_signed(Duration::milliseconds(self.offset_ms))
            .unwrap_or_else(|| {
                warn!(offset_ms = self.offset_ms, "clock offset out of range, using wall clock");
                wall
            })
    }

    /// Move the offset by `delta_ms` on top of whatever is already applied
    pub fn shift(&mut self, delta_ms: i64) {
        self.offset_ms = clamp_offset(self.offset_ms.saturating_add(delta_ms));
    }

    pub fn reset(&mut self) {
        self.offset_ms = 0;
    }

    /// Human readable offset, e.g. `+3h 30m`, or `none` when unshifted
    pub fn describe_offset(&self) -> String {
        if self.offset_ms == 0 {
            return "none".to_string();
        }
        let abs = self.offset_ms.unsigned_abs();
        let hours = abs / (1000 * 60 * 60);
        let minutes = (abs % (1000 * 60 * 60)) / (1000 * 60);
        let sign = if self.offset_ms > 0 { '+' } else { '-' };
        format!("{}{}h {}m", sign, hours, minutes)
    }
}

fn clamp_offset(offset_ms: i64) -> i64 {
    offset_ms.clamp(-MAX_OFFSET_MS, MAX_OFFSET_MS)
}
