use std::fmt;

use time::OffsetDateTime;

/// A single corrected instrument reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub time: OffsetDateTime,
    pub temperature: f64,
    pub humidity: f64,
}

/// The two quantities tracked independently by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Temperature,
    Humidity,
}

impl Quantity {
    pub fn value_of(self, reading: &Reading) -> f64 {
        match self {
            Quantity::Temperature => reading.temperature,
            Quantity::Humidity => reading.humidity,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Quantity::Temperature => "deg. C",
            Quantity::Humidity => "%RH",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Temperature => write!(f, "temperature"),
            Quantity::Humidity => write!(f, "humidity"),
        }
    }
}

/// Static (min, max) limits plus the increment used for staged alerts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Which way a reading drifted past the incremental band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Outage,
    Incremental(Direction),
    Return,
}

/// Emitted by an alert state machine for the dispatcher to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertIntent {
    pub quantity: Quantity,
    pub kind: AlertKind,
}

impl AlertIntent {
    pub fn category(&self) -> Category {
        match (self.quantity, self.kind) {
            (Quantity::Temperature, AlertKind::Return) => Category::TemperatureReturn,
            (Quantity::Temperature, _) => Category::TemperatureOut,
            (Quantity::Humidity, AlertKind::Return) => Category::HumidityReturn,
            (Quantity::Humidity, _) => Category::HumidityOut,
        }
    }
}

/// Pending-message slot key used while notifications cannot be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    TemperatureOut,
    TemperatureReturn,
    HumidityOut,
    HumidityReturn,
}
