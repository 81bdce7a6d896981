//! Integration tests for the sampling loop.
//!
//! Drives [`Monitor`] cycle by cycle with a scripted instrument, an in-memory
//! transport, and a renderer that only touches the snapshot file.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use time::{Duration, OffsetDateTime};

use lab_env_monitor::alerts::Status;
use lab_env_monitor::buffer::SampleBuffer;
use lab_env_monitor::chart::ChartRenderer;
use lab_env_monitor::config::{LabTables, MonitorConfig};
use lab_env_monitor::error::{ChartError, InstrumentError, NotifyError};
use lab_env_monitor::instrument::Instrument;
use lab_env_monitor::models::{AlertKind, Category, Quantity};
use lab_env_monitor::monitor::Monitor;
use lab_env_monitor::notify::Transport;
use lab_env_monitor::utils::Clock;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Replays (temperature, humidity) pairs, repeating the last one forever.
struct ScriptedInstrument {
    script: VecDeque<(f64, f64)>,
    current: (f64, f64),
    pending_humidity: Option<f64>,
}

impl ScriptedInstrument {
    fn new(values: &[(f64, f64)]) -> Self {
        Self {
            script: values.iter().copied().collect(),
            current: values[0],
            pending_humidity: None,
        }
    }
}

impl Instrument for ScriptedInstrument {
    async fn read_temperature(&mut self) -> Result<f64, InstrumentError> {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        self.pending_humidity = Some(self.current.1);
        Ok(self.current.0)
    }

    async fn read_humidity(&mut self) -> Result<f64, InstrumentError> {
        Ok(self.pending_humidity.take().unwrap_or(self.current.1))
    }

    async fn reconnect(&mut self) -> Result<(), InstrumentError> {
        Ok(())
    }
}

#[derive(Default)]
struct FakeTransport {
    offline: Cell<bool>,
    unreachable: RefCell<HashSet<String>>,
    mms: RefCell<Vec<(String, String)>>,
    texts: RefCell<Vec<(String, String)>>,
}

impl Transport for FakeTransport {
    async fn send_text(&self, address: &str, body: &str) -> Result<(), NotifyError> {
        if self.offline.get() {
            return Err(NotifyError::Delivery("network unreachable".into()));
        }
        self.texts.borrow_mut().push((address.into(), body.into()));
        Ok(())
    }

    async fn send_mms_with_image(
        &self,
        address: &str,
        body: &str,
        _image: &Path,
    ) -> Result<(), NotifyError> {
        if self.offline.get() || self.unreachable.borrow().contains(address) {
            return Err(NotifyError::Delivery("network unreachable".into()));
        }
        self.mms.borrow_mut().push((address.into(), body.into()));
        Ok(())
    }
}

#[derive(Default)]
struct CountingRenderer {
    renders: Cell<usize>,
}

impl ChartRenderer for CountingRenderer {
    fn render(&self, _buffer: &SampleBuffer, _path: &Path) -> Result<(), ChartError> {
        self.renders.set(self.renders.get() + 1);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

const TABLES: &str = r#"{
    "labs": {
        "219/A022": {"temperature": [19.5, 20.5], "humidity": [10.0, 60.0], "users": ["alice", "bob"]}
    },
    "corrections": {"": [0, 0]},
    "contacts": {
        "alice": ["5550001111@vtext.com"],
        "bob": ["5550002222@vtext.com"]
    }
}"#;

fn config(dir: &TempDir, extra: &[(&str, &str)]) -> MonitorConfig {
    let data_dir = dir.path().join("EnvironmentData");
    let no_contact = dir.path().join("NoContact.list");
    let snapshot = dir.path().join("outage.png");
    let mut env: HashMap<String, String> = [
        ("LAB_ID", "219/A022"),
        ("INSTRUMENT_PORT", "/dev/null"),
        ("SMTP_HOST", "localhost"),
        ("FROM_ADDRESS", "alerts@example.com"),
        ("LOG_ADDRESS", "ops@example.com"),
        ("REREAD_DELAY_SECS", "0"),
        ("NORMAL_STATUS_WAIT_MINUTES", "10"),
        ("DATA_DIR", data_dir.to_str().unwrap()),
        ("NO_CONTACT_PATH", no_contact.to_str().unwrap()),
        ("SNAPSHOT_PATH", snapshot.to_str().unwrap()),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    let tables: LabTables = serde_json::from_str(TABLES).unwrap();
    MonitorConfig::from_parts(move |key| env.get(key).cloned(), tables).unwrap()
}

type TestMonitor = Monitor<ScriptedInstrument, FakeTransport, CountingRenderer>;

async fn monitor(dir: &TempDir, values: &[(f64, f64)]) -> TestMonitor {
    let config = config(dir, &[]);
    let mut monitor = Monitor::new(
        &config,
        ScriptedInstrument::new(values),
        FakeTransport::default(),
        CountingRenderer::default(),
        Clock::with_offset(time::UtcOffset::UTC),
    );
    monitor.bootstrap().await;
    monitor
}

fn minute(n: i64) -> OffsetDateTime {
    time::macros::datetime!(2026-10-16 08:00:00 UTC) + Duration::minutes(n)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Two high readings in a row raise the outage on the second cycle and
/// notify every contact.
#[tokio::test]
async fn outage_fires_on_second_consecutive_high_reading() {
    let dir = tempfile::tempdir().unwrap();
    let mut monitor = monitor(&dir, &[(20.0, 40.0), (20.6, 40.0), (20.7, 40.0)]).await;

    let first = monitor.run_cycle(minute(1)).await;
    assert!(first.intents.is_empty());
    assert_eq!(monitor.state(Quantity::Temperature).status(), Status::Normal);

    let second = monitor.run_cycle(minute(2)).await;
    assert_eq!(second.intents.len(), 1);
    assert_eq!(second.intents[0].kind, AlertKind::Outage);
    assert_eq!(second.intents[0].quantity, Quantity::Temperature);
    assert_eq!(monitor.state(Quantity::Temperature).status(), Status::Warning);
    assert_eq!(monitor.state(Quantity::Humidity).status(), Status::Normal);

    let transport = monitor.dispatcher().transport();
    let mms = transport.mms.borrow();
    assert_eq!(mms.len(), 2);
    assert!(mms[0].1.starts_with("Temperature OUT OF RANGE in 219/A022."));
    // Operations transcript goes to the log address.
    assert!(transport
        .texts
        .borrow()
        .iter()
        .any(|(to, body)| to == "ops@example.com" && body.starts_with("Start log for 219/A022")));
}

/// Recovery needs the full wait: nothing at nine minutes, one return at ten.
#[tokio::test]
async fn return_fires_only_after_recovery_wait() {
    let dir = tempfile::tempdir().unwrap();
    let mut monitor = monitor(
        &dir,
        &[(20.6, 40.0), (20.7, 40.0), (20.0, 40.0)],
    )
    .await;

    monitor.run_cycle(minute(0)).await;
    assert_eq!(monitor.state(Quantity::Temperature).status(), Status::Warning);

    // Back in range: the timer starts at minute 1.
    assert!(monitor.run_cycle(minute(1)).await.intents.is_empty());
    assert!(monitor.run_cycle(minute(10)).await.intents.is_empty());

    let summary = monitor.run_cycle(minute(11)).await;
    assert_eq!(summary.intents.len(), 1);
    assert_eq!(summary.intents[0].kind, AlertKind::Return);
    assert_eq!(monitor.state(Quantity::Temperature).status(), Status::Normal);

    assert!(monitor.run_cycle(minute(30)).await.intents.is_empty());
}

/// Delivery fails for everyone during an outage, then one contact gets
/// through on the next cycle and the outage state clears.
#[tokio::test]
async fn pending_message_survives_network_outage() {
    let dir = tempfile::tempdir().unwrap();
    let mut monitor = monitor(&dir, &[(20.6, 40.0), (20.7, 40.0)]).await;
    monitor.dispatcher().transport().offline.set(true);

    let summary = monitor.run_cycle(minute(1)).await;
    assert_eq!(summary.intents[0].kind, AlertKind::Outage);
    assert_eq!(summary.reports[0].failed_count(), 2);
    assert!(!summary.connection_restored);
    assert!(monitor.dispatcher().under_outage());
    let pending = monitor
        .dispatcher()
        .pending(Category::TemperatureOut)
        .unwrap()
        .to_string();
    assert!(pending.starts_with("DELAYED ALERT: Temperature in 219/A022"));

    let transport = monitor.dispatcher().transport();
    transport.offline.set(false);
    transport
        .unreachable
        .borrow_mut()
        .insert("5550001111@vtext.com".into());

    let summary = monitor.run_cycle(minute(2)).await;
    assert!(summary.intents.is_empty());
    assert_eq!(summary.retry.delivered_count(), 1);
    assert!(summary.connection_restored);
    assert!(!monitor.dispatcher().under_outage());
    assert!(!monitor.dispatcher().any_sent_since_outage());
    assert_eq!(monitor.dispatcher().pending(Category::TemperatureOut), None);

    let mms = monitor.dispatcher().transport().mms.borrow().clone();
    assert_eq!(mms, vec![("5550002222@vtext.com".to_string(), pending)]);
}

/// Users on the do-not-contact list are skipped, re-read every cycle.
#[tokio::test]
async fn do_not_contact_list_is_reread_each_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut monitor = monitor(&dir, &[(20.0, 70.0), (20.0, 70.0)]).await;
    std::fs::write(dir.path().join("NoContact.list"), "alice\n").unwrap();

    let summary = monitor.run_cycle(minute(1)).await;
    assert_eq!(summary.intents[0].quantity, Quantity::Humidity);
    let recipients: Vec<String> = summary.reports[0]
        .outcomes
        .iter()
        .map(|o| o.address.clone())
        .collect();
    assert_eq!(recipients, vec!["5550002222@vtext.com".to_string()]);
}

/// Every reading lands in the monthly log; out-of-range ones also in the
/// outage log. The chart is redrawn each cycle.
#[tokio::test]
async fn readings_are_persisted_and_charted() {
    let dir = tempfile::tempdir().unwrap();
    let mut monitor = monitor(&dir, &[(20.0, 40.0), (20.1, 40.0), (20.6, 40.0)]).await;

    let first = monitor.run_cycle(minute(1)).await.reading.unwrap();
    monitor.run_cycle(minute(2)).await;

    let data_dir: PathBuf = dir.path().join("EnvironmentData");
    let stem = first
        .time
        .format(time::macros::format_description!("[month repr:long][year]"))
        .unwrap();
    let all = std::fs::read_to_string(data_dir.join(format!("{}-all.env.csv", stem))).unwrap();
    assert_eq!(all.lines().count(), 3);
    let outages =
        std::fs::read_to_string(data_dir.join(format!("{}-outages.env.csv", stem))).unwrap();
    assert_eq!(outages.lines().count(), 2);
    assert!(outages.lines().nth(1).unwrap().ends_with("TEMPERATURE OUTAGE,"));

    assert_eq!(monitor.buffer().len(), 3);
    assert_eq!(monitor.renderer().renders.get(), 2);
}

/// The scheduled test message goes out once inside its window.
#[tokio::test]
async fn scheduled_test_message_is_sent_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, &[("TEST_MESSAGE_AT", "October 16, 2026 08:30:00")]);
    let mut monitor = Monitor::new(
        &config,
        ScriptedInstrument::new(&[(20.0, 40.0)]),
        FakeTransport::default(),
        CountingRenderer::default(),
        Clock::with_offset(time::UtcOffset::UTC),
    );
    monitor.bootstrap().await;

    assert!(!monitor.run_cycle(minute(0)).await.test_sent);
    assert!(monitor.run_cycle(minute(5)).await.test_sent);
    assert!(!monitor.run_cycle(minute(6)).await.test_sent);

    let mms = monitor.dispatcher().transport().mms.borrow().clone();
    assert_eq!(mms.len(), 2);
    assert!(mms[0].1.starts_with("Scheduled test"));
}
