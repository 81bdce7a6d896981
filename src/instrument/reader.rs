/// Bounded-retry instrument reads with correction and jump confirmation
use log::{error, info, warn};
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

use crate::config::{Correction, MonitorConfig};
use crate::instrument::Instrument;
use crate::models::{Quantity, Reading};

/// Total read attempts per metric per cycle, with a reconnect between failures
pub const READ_ATTEMPTS: usize = 3;

pub struct Reader<I> {
    instrument: I,
    correction: Correction,
    reread_temperature: f64,
    reread_humidity: f64,
    reread_delay: Duration,
    last: Option<Reading>,
}

impl<I: Instrument> Reader<I> {
    pub fn new(
        instrument: I,
        correction: Correction,
        reread_temperature: f64,
        reread_humidity: f64,
        reread_delay: Duration,
    ) -> Self {
        Self {
            instrument,
            correction,
            reread_temperature,
            reread_humidity,
            reread_delay,
            last: None,
        }
    }

    pub fn from_config(instrument: I, config: &MonitorConfig) -> Self {
        Self::new(
            instrument,
            config.correction,
            config.reread_temperature,
            config.reread_humidity,
            config.reread_delay,
        )
    }

    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    /// Take one corrected reading.
    ///
    /// A metric that cannot be read carries its last good value forward. If
    /// neither metric can be read (or there is no earlier value to carry),
    /// no reading is produced for this cycle.
    pub async fn sample(&mut self, now: OffsetDateTime) -> Option<Reading> {
        let previous = self.last;
        let temperature = self
            .read(Quantity::Temperature, previous.map(|r| r.temperature))
            .await;
        let humidity = self
            .read(Quantity::Humidity, previous.map(|r| r.humidity))
            .await;

        let (temperature, humidity) = match (temperature, humidity, previous) {
            (None, None, _) => return None,
            (Some(t), Some(h), _) => (t, h),
            (Some(t), None, Some(prev)) => {
                warn!("Carrying humidity {:.2} forward", prev.humidity);
                (t, prev.humidity)
            }
            (None, Some(h), Some(prev)) => {
                warn!("Carrying temperature {:.2} forward", prev.temperature);
                (prev.temperature, h)
            }
            _ => return None,
        };

        let reading = Reading {
            time: now,
            temperature,
            humidity,
        };
        self.last = Some(reading);
        Some(reading)
    }

    /// Read one metric, confirming implausible jumps with a delayed re-read.
    pub async fn read(&mut self, quantity: Quantity, previous: Option<f64>) -> Option<f64> {
        let value = self.read_with_retry(quantity).await?;

        let limit = match quantity {
            Quantity::Temperature => self.reread_temperature,
            Quantity::Humidity => self.reread_humidity,
        };
        match previous {
            Some(prev) if (value - prev).abs() > limit => {
                info!(
                    "Suspect {} read {:.2} (previous {:.2}), reading again",
                    quantity, value, prev
                );
                sleep(self.reread_delay).await;
                Some(self.read_with_retry(quantity).await.unwrap_or(value))
            }
            _ => Some(value),
        }
    }

    async fn read_with_retry(&mut self, quantity: Quantity) -> Option<f64> {
        for attempt in 1..=READ_ATTEMPTS {
            let result = match quantity {
                Quantity::Temperature => self.instrument.read_temperature().await,
                Quantity::Humidity => self.instrument.read_humidity().await,
            };
            match result {
                Ok(raw) => {
                    let offset = match quantity {
                        Quantity::Temperature => self.correction.temperature,
                        Quantity::Humidity => self.correction.humidity,
                    };
                    return Some(raw + offset);
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{}: failed to read {}: {}",
                        attempt, READ_ATTEMPTS, quantity, e
                    );
                    if attempt < READ_ATTEMPTS {
                        if let Err(e) = self.instrument.reconnect().await {
                            warn!("Reconnect failed: {}", e);
                        }
                    }
                }
            }
        }
        error!("Communications with instrument failed while reading {}", quantity);
        None
    }
}
