//! The sampling loop.
//!
//! [`Monitor`] owns every piece of mutable state: the rolling window, one
//! alert state per quantity, the dispatcher's pending slots, and the self-test
//! latch. Each cycle runs read, render, persist, evaluate, and dispatch in
//! sequence, then sleeps for whatever is left of the sampling period.

use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, error, info, warn};
use time::OffsetDateTime;
use tokio::time::{sleep, Instant};

use crate::alerts::AlertState;
use crate::buffer::SampleBuffer;
use crate::chart::ChartRenderer;
use crate::config::MonitorConfig;
use crate::contacts::{read_no_contact, resolve_contacts};
use crate::instrument::{Instrument, Reader};
use crate::models::{AlertIntent, Quantity, Reading};
use crate::notify::messages::{alert_message, delayed_message, test_message};
use crate::notify::{DeliveryReport, Dispatcher, Notice, Transport};
use crate::selftest::SelfTest;
use crate::storage::CsvSink;
use crate::utils::{format_datetime, Clock};

/// What happened during one cycle.
#[derive(Debug, Default)]
pub struct CycleSummary {
    pub reading: Option<Reading>,
    pub intents: Vec<AlertIntent>,
    pub reports: Vec<DeliveryReport>,
    pub retry: DeliveryReport,
    pub test_sent: bool,
    pub connection_restored: bool,
}

pub struct Monitor<I, T, R> {
    lab_id: String,
    reader: Reader<I>,
    buffer: SampleBuffer,
    temperature: AlertState,
    humidity: AlertState,
    dispatcher: Dispatcher<T>,
    renderer: R,
    sink: CsvSink,
    self_test: SelfTest,
    lab_users: Vec<String>,
    directory: HashMap<String, Vec<String>>,
    no_contact_path: PathBuf,
    snapshot_path: PathBuf,
    recovery_wait: time::Duration,
    period: std::time::Duration,
    clock: Clock,
}

impl<I, T, R> Monitor<I, T, R>
where
    I: Instrument,
    T: Transport,
    R: ChartRenderer,
{
    pub fn new(config: &MonitorConfig, instrument: I, transport: T, renderer: R, clock: Clock) -> Self {
        Self {
            lab_id: config.lab_id.clone(),
            reader: Reader::from_config(instrument, config),
            buffer: SampleBuffer::new(config.graph_points()),
            temperature: AlertState::new(Quantity::Temperature, config.temperature),
            humidity: AlertState::new(Quantity::Humidity, config.humidity),
            dispatcher: Dispatcher::new(transport, &config.lab_id, &config.smtp.log_address),
            renderer,
            sink: CsvSink::new(&config.data_dir, config.temperature, config.humidity),
            self_test: SelfTest::new(config.test_schedule),
            lab_users: config.lab_users.clone(),
            directory: config.directory.clone(),
            no_contact_path: config.no_contact_path.clone(),
            snapshot_path: config.snapshot_path.clone(),
            recovery_wait: config.recovery_wait,
            period: config.sample_period(),
            clock,
        }
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn state(&self, quantity: Quantity) -> &AlertState {
        match quantity {
            Quantity::Temperature => &self.temperature,
            Quantity::Humidity => &self.humidity,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Fill the first slot of the window so every cycle has a previous reading.
    /// Retries once per sampling period until the instrument answers.
    pub async fn bootstrap(&mut self) {
        loop {
            if let Some(reading) = self.reader.sample(self.clock.now()).await {
                info!(
                    "Initial reading: {:.2} deg. C, {:.2} %RH",
                    reading.temperature, reading.humidity
                );
                self.buffer.push(reading);
                return;
            }
            error!(
                "No initial reading, retrying in {} seconds",
                self.period.as_secs()
            );
            sleep(self.period).await;
        }
    }

    /// Run one sampling cycle at `now`.
    pub async fn run_cycle(&mut self, now: OffsetDateTime) -> CycleSummary {
        let mut summary = CycleSummary::default();

        let reading = self.reader.sample(now).await;
        match reading {
            Some(reading) => {
                self.buffer.push(reading);
                debug!(
                    "{}: {:.2} deg. C, {:.2} %RH",
                    format_datetime(&reading.time),
                    reading.temperature,
                    reading.humidity
                );
                if let Err(e) = self.renderer.render(&self.buffer, &self.snapshot_path) {
                    warn!("{}", e);
                }
                if let Err(e) = self.sink.record(&reading) {
                    error!("Failed to log reading: {}", e);
                }
            }
            None => warn!("No reading this cycle, alert evaluation skipped"),
        }
        summary.reading = reading;

        let excluded = read_no_contact(&self.no_contact_path);
        let contacts = resolve_contacts(&self.lab_users, &self.directory, &excluded);

        if self.self_test.due(now) {
            info!("Sending scheduled test message to users");
            let message = test_message(&self.lab_id, self.buffer.latest());
            self.dispatcher
                .broadcast(&message, &contacts, &self.snapshot_path)
                .await;
            summary.test_sent = true;
        }

        if reading.is_some() {
            if let Some((previous, current)) = self.buffer.last_pair() {
                let (previous, current) = (*previous, *current);
                let mut intents = Vec::new();
                for quantity in [Quantity::Temperature, Quantity::Humidity] {
                    let state = match quantity {
                        Quantity::Temperature => &mut self.temperature,
                        Quantity::Humidity => &mut self.humidity,
                    };
                    intents.extend(state.evaluate(
                        quantity.value_of(&previous),
                        quantity.value_of(&current),
                        now,
                        self.recovery_wait,
                    ));
                }

                for intent in &intents {
                    let notice = self.notice(intent, &current);
                    let report = self
                        .dispatcher
                        .dispatch(&notice, &contacts, &self.snapshot_path)
                        .await;
                    summary.reports.push(report);
                }
                summary.intents = intents;
            }
        }

        summary.retry = self
            .dispatcher
            .retry_pending(&contacts, &self.snapshot_path)
            .await;
        summary.connection_restored = self.dispatcher.end_cycle();
        summary
    }

    fn notice(&self, intent: &AlertIntent, reading: &Reading) -> Notice {
        let limits = self.state(intent.quantity).thresholds();
        Notice {
            category: intent.category(),
            body: alert_message(&self.lab_id, intent, limits, reading),
            delayed_body: delayed_message(&self.lab_id, intent, limits, reading),
        }
    }

    /// Sample forever. A cycle that overruns the period is followed
    /// immediately by the next one.
    pub async fn run(mut self) {
        info!("Starting environment monitoring for {}", self.lab_id);
        self.bootstrap().await;

        loop {
            let started = Instant::now();
            let summary = self.run_cycle(self.clock.now()).await;
            if !summary.intents.is_empty() {
                info!("Cycle raised {} alert(s)", summary.intents.len());
            }

            let elapsed = started.elapsed();
            if elapsed < self.period {
                sleep(self.period - elapsed).await;
            } else {
                warn!(
                    "Cycle took {:.1}s, longer than the {:.1}s sampling period",
                    elapsed.as_secs_f64(),
                    self.period.as_secs_f64()
                );
            }
        }
    }
}
