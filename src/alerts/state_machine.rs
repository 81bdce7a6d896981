//! Per-quantity alert state machine.
//!
//! One [`AlertState`] exists for temperature and one for humidity. Each
//! sampling cycle the monitor hands it the previous and current reading and
//! it returns the alert intents that cycle produced. Rules run in order:
//!
//! 1. Outage entry: two consecutive out-of-range readings raise the status to
//!    `Warning` and emit [`AlertKind::Outage`]. While already in `Warning`
//!    they cancel any running recovery timer instead.
//! 2. Incremental escalation: two consecutive readings outside the band either
//!    reset the band (reading back in range) or move it one step with the drift
//!    and emit [`AlertKind::Incremental`].
//! 3. Recovery: an in-range reading while in `Warning` starts the recovery
//!    timer; once it has run for the configured wait, [`AlertKind::Return`]
//!    is emitted and the state resets.

use log::{debug, info};
use time::{Duration, OffsetDateTime};

use crate::alerts::classifier::{classify, classify_incremental, Band};
use crate::models::{AlertIntent, AlertKind, Quantity, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Normal,
    Warning,
}

#[derive(Debug, Clone)]
pub struct AlertState {
    quantity: Quantity,
    thresholds: Thresholds,
    status: Status,
    band: Band,
    recovery_started: Option<OffsetDateTime>,
}

impl AlertState {
    pub fn new(quantity: Quantity, thresholds: Thresholds) -> Self {
        Self {
            quantity,
            thresholds,
            status: Status::Normal,
            band: Band::initial(&thresholds),
            recovery_started: None,
        }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn recovery_started(&self) -> Option<OffsetDateTime> {
        self.recovery_started
    }

    /// Run one cycle of the state machine.
    pub fn evaluate(
        &mut self,
        previous: f64,
        current: f64,
        now: OffsetDateTime,
        recovery_wait: Duration,
    ) -> Vec<AlertIntent> {
        let mut intents = Vec::new();
        let current_in = classify(current, &self.thresholds);
        let previous_in = classify(previous, &self.thresholds);

        if !current_in && !previous_in {
            match self.status {
                Status::Normal => {
                    info!(
                        "{} outage detected: {:.2} {} outside [{}, {}]",
                        self.quantity,
                        current,
                        self.quantity.unit(),
                        self.thresholds.min,
                        self.thresholds.max
                    );
                    self.status = Status::Warning;
                    intents.push(self.intent(AlertKind::Outage));
                }
                Status::Warning => {
                    if self.recovery_started.take().is_some() {
                        debug!("{} out of range again, recovery timer reset", self.quantity);
                    }
                }
            }
        }

        let current_band = classify_incremental(current, &self.band);
        let previous_band = classify_incremental(previous, &self.band);
        if !current_band.within_band && !previous_band.within_band {
            if current_in {
                debug!("{} back within limits, incremental band reset", self.quantity);
                self.band = Band::initial(&self.thresholds);
            } else if let Some(direction) = current_band.direction {
                self.band.widen(direction, self.thresholds.step);
                info!(
                    "{} drifted {:?}, incremental band now [{:.2}, {:.2}]",
                    self.quantity, direction, self.band.low, self.band.high
                );
                intents.push(self.intent(AlertKind::Incremental(direction)));
            }
        }

        if current_in && self.status == Status::Warning {
            match self.recovery_started {
                None => {
                    debug!("{} within limits, recovery timer started", self.quantity);
                    self.recovery_started = Some(now);
                }
                Some(started) if now - started >= recovery_wait => {
                    info!("{} returned to normal", self.quantity);
                    self.status = Status::Normal;
                    self.band = Band::initial(&self.thresholds);
                    self.recovery_started = None;
                    intents.push(self.intent(AlertKind::Return));
                }
                Some(_) => {}
            }
        }

        intents
    }

    fn intent(&self, kind: AlertKind) -> AlertIntent {
        AlertIntent {
            quantity: self.quantity,
            kind,
        }
    }
}
