/// Pure range checks used by the alert state machine.
///
/// Comparisons are strict: a value exactly at `min` or `max` is in range.
/// Nothing here debounces; callers compare the current and previous reading.
use crate::models::{Direction, Thresholds};

/// Widening tolerance band around (min, max) used for staged alerts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub fn initial(thresholds: &Thresholds) -> Self {
        Self {
            low: thresholds.min - thresholds.step,
            high: thresholds.max + thresholds.step,
        }
    }

    /// Move the band one step in the direction of drift. The band keeps a
    /// width of two steps anchored on the bound that moved.
    pub fn widen(&mut self, direction: Direction, step: f64) {
        match direction {
            Direction::Above => {
                self.high += step;
                self.low = self.high - 2.0 * step;
            }
            Direction::Below => {
                self.low -= step;
                self.high = self.low + 2.0 * step;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandCheck {
    pub within_band: bool,
    pub direction: Option<Direction>,
}

pub fn in_range(value: f64, min: f64, max: f64) -> bool {
    !(value > max || value < min)
}

pub fn classify(value: f64, thresholds: &Thresholds) -> bool {
    in_range(value, thresholds.min, thresholds.max)
}

pub fn classify_incremental(value: f64, band: &Band) -> BandCheck {
    let direction = if value > band.high {
        Some(Direction::Above)
    } else if value < band.low {
        Some(Direction::Below)
    } else {
        None
    };
    BandCheck {
        within_band: direction.is_none(),
        direction,
    }
}
