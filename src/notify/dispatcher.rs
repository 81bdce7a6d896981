//! Notification dispatch with per-category pending slots.
//!
//! Every contact is attempted independently and the outcome of each attempt is
//! collected into a [`DeliveryReport`]. When any send fails the dispatcher
//! stores the notice's delayed text in the slot for its [`Category`] (newer
//! notices overwrite older ones) and enters the internet-outage state.
//!
//! While in that state, [`Dispatcher::retry_pending`] re-sends every stored
//! slot to every contact once per cycle. A single successful send marks the
//! connection as working again, and [`Dispatcher::end_cycle`] then clears all
//! slots and leaves the outage state.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info, warn};

use crate::models::Category;
use crate::notify::messages::transcript;
use crate::notify::Transport;

/// An alert ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub category: Category,
    pub body: String,
    /// Text stored for redelivery if this notice cannot be sent
    pub delayed_body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub address: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    pub fn delivered(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.success)
            .map(|o| o.address.as_str())
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered().count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    fn extend(&mut self, other: DeliveryReport) {
        self.outcomes.extend(other.outcomes);
    }
}

pub struct Dispatcher<T> {
    transport: T,
    lab_id: String,
    log_address: String,
    pending: BTreeMap<Category, String>,
    under_outage: bool,
    any_sent_since_outage: bool,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, lab_id: impl Into<String>, log_address: impl Into<String>) -> Self {
        Self {
            transport,
            lab_id: lab_id.into(),
            log_address: log_address.into(),
            pending: BTreeMap::new(),
            under_outage: false,
            any_sent_since_outage: false,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn under_outage(&self) -> bool {
        self.under_outage
    }

    pub fn any_sent_since_outage(&self) -> bool {
        self.any_sent_since_outage
    }

    pub fn pending(&self, category: Category) -> Option<&str> {
        self.pending.get(&category).map(String::as_str)
    }

    /// Send `notice` with the chart attached to every contact.
    pub async fn dispatch(&mut self, notice: &Notice, contacts: &[String], image: &Path) -> DeliveryReport {
        let report = self.send_to_all(&notice.body, contacts, image).await;

        let mut stored = None;
        if report.failed_count() > 0 {
            if self.pending.insert(notice.category, notice.delayed_body.clone()).is_some() {
                info!("Replaced pending {:?} message with newer event", notice.category);
            }
            if !self.under_outage {
                warn!("Notification delivery failing, entering internet outage state");
            }
            self.under_outage = true;
            stored = Some(notice.delayed_body.as_str());
        }

        info!(
            "{:?} alert: {} delivered, {} queued/failed",
            notice.category,
            report.delivered_count(),
            report.failed_count()
        );
        let delivered: Vec<&str> = report.delivered().collect();
        let log = transcript(&self.lab_id, &notice.body, &delivered, stored);
        self.send_log(&log).await;
        report
    }

    /// Re-send every pending slot to every contact. Does nothing outside an
    /// internet outage.
    pub async fn retry_pending(&mut self, contacts: &[String], image: &Path) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if !self.under_outage {
            return report;
        }

        let pending: Vec<(Category, String)> = self
            .pending
            .iter()
            .map(|(category, body)| (*category, body.clone()))
            .collect();
        for (category, body) in pending {
            let attempt = self.send_to_all(&body, contacts, image).await;
            if attempt.delivered_count() > 0 {
                self.any_sent_since_outage = true;
            }
            let delivered: Vec<&str> = attempt.delivered().collect();
            info!(
                "Retried pending {:?} message: {} delivered",
                category,
                delivered.len()
            );
            let log = transcript(&self.lab_id, &body, &delivered, None);
            self.send_log(&log).await;
            report.extend(attempt);
        }
        report
    }

    /// Close out a cycle. Returns true when connectivity was found to be
    /// restored, in which case every pending slot is cleared.
    pub fn end_cycle(&mut self) -> bool {
        if self.under_outage && self.any_sent_since_outage {
            info!("Internet connection reestablished");
            self.pending.clear();
            self.under_outage = false;
            self.any_sent_since_outage = false;
            return true;
        }
        false
    }

    /// Send a message to every contact without pending-slot bookkeeping.
    pub async fn broadcast(&mut self, body: &str, contacts: &[String], image: &Path) -> DeliveryReport {
        let report = self.send_to_all(body, contacts, image).await;
        let delivered: Vec<&str> = report.delivered().collect();
        let log = transcript(&self.lab_id, body, &delivered, None);
        self.send_log(&log).await;
        report
    }

    async fn send_to_all(&self, body: &str, contacts: &[String], image: &Path) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for address in contacts {
            let outcome = match self.transport.send_mms_with_image(address, body, image).await {
                Ok(()) => DeliveryOutcome {
                    address: address.clone(),
                    success: true,
                    error: None,
                },
                Err(e) => {
                    warn!("Failed to notify {}: {}", address, e);
                    DeliveryOutcome {
                        address: address.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        report
    }

    async fn send_log(&self, log: &str) {
        if let Err(e) = self.transport.send_text(&self.log_address, log).await {
            // Best effort only
            debug!("Operations log not delivered: {}", e);
        }
    }
}
