/// Rolling window of recent readings
use std::collections::VecDeque;

use crate::models::Reading;

/// Bounded, time-ordered window of readings. Oldest readings are evicted
/// first once the window is full.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl SampleBuffer {
    /// Capacity is clamped to 2 so the previous/current pair always exists
    /// once two readings have been pushed.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, reading: Reading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// The latest two readings as (previous, current).
    pub fn last_pair(&self) -> Option<(&Reading, &Reading)> {
        let n = self.readings.len();
        if n < 2 {
            return None;
        }
        Some((&self.readings[n - 2], &self.readings[n - 1]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }
}
