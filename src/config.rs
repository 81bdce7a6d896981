use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use serde::Deserialize;
use time::macros::format_description;
use time::{PrimitiveDateTime, Time};

use crate::error::ConfigError;
use crate::models::Thresholds;

/// Upper bound on readings kept in the rolling window.
pub const MAX_GRAPH_POINTS: usize = 1_000_000;

/// Static lookup tables: per-lab limits and users, per-sensor corrections,
/// and the user directory.
#[derive(Debug, Clone, Deserialize)]
pub struct LabTables {
    pub labs: HashMap<String, LabEntry>,
    #[serde(default)]
    pub corrections: HashMap<String, [f64; 2]>,
    #[serde(default)]
    pub contacts: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabEntry {
    /// [min, max] in deg. C
    pub temperature: [f64; 2],
    /// [min, max] in %RH
    pub humidity: [f64; 2],
    #[serde(default)]
    pub users: Vec<String>,
}

impl LabTables {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::TablesIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::TablesFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Additive per-sensor offsets applied at ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Correction {
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestSchedule {
    Once(PrimitiveDateTime),
    Daily(Time),
}

#[derive(Debug, Clone)]
pub struct InstrumentSettings {
    pub port: String,
    pub baud: u32,
    pub slave: u8,
    pub temperature_register: u16,
    pub humidity_register: u16,
    pub scale: f64,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    /// Operations mailbox receiving a transcript of every dispatch
    pub log_address: String,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub lab_id: String,
    pub sensor_serial: String,
    pub temperature: Thresholds,
    pub humidity: Thresholds,
    pub correction: Correction,
    pub lab_users: Vec<String>,
    pub directory: HashMap<String, Vec<String>>,
    pub no_contact_path: PathBuf,
    pub data_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub instrument: InstrumentSettings,
    pub points_per_hour: f64,
    pub graph_hours: f64,
    window_points: usize,
    sample_period: std::time::Duration,
    pub reread_temperature: f64,
    pub reread_humidity: f64,
    pub reread_delay: std::time::Duration,
    pub recovery_wait: time::Duration,
    pub test_schedule: Option<TestSchedule>,
    pub smtp: SmtpSettings,
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::Invalid {
                    name,
                    reason: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}

/// Like `parse_or`, but the value must be a finite number above zero.
fn positive_or<F>(lookup: &F, name: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: f64 = parse_or(lookup, name, default)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: format!("must be a positive number, got {}", value),
        })
    }
}

fn flag_or<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                reason: format!("expected a boolean, got '{}'", v),
            }),
        },
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}

/// Parse a schedule like `October 16, 2026 09:00:00`. With `daily` set only
/// the time of day is kept.
pub fn parse_test_schedule(raw: &str, daily: bool) -> Result<TestSchedule, ConfigError> {
    let format = format_description!("[month repr:long] [day], [year] [hour]:[minute]:[second]");
    let at = PrimitiveDateTime::parse(raw.trim(), format).map_err(|e| ConfigError::Invalid {
        name: "TEST_MESSAGE_AT",
        reason: e.to_string(),
    })?;
    Ok(if daily {
        TestSchedule::Daily(at.time())
    } else {
        TestSchedule::Once(at)
    })
}

impl MonitorConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tables_path = PathBuf::from(
            optional(&lookup, "LAB_TABLES_PATH").unwrap_or_else(|| "lab_tables.json".into()),
        );
        let tables = LabTables::load(&tables_path)?;
        Self::from_parts(lookup, tables)
    }

    /// Build the configuration from already-loaded lab tables.
    pub fn from_parts<F>(lookup: F, tables: LabTables) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lab_id = required(&lookup, "LAB_ID")?;
        let lab = tables
            .labs
            .get(&lab_id)
            .ok_or_else(|| ConfigError::UnknownLab(lab_id.clone()))?;

        let temperature_step = positive_or(&lookup, "TEMPERATURE_INCREMENT", 0.5)?;
        let humidity_step = positive_or(&lookup, "HUMIDITY_INCREMENT", 5.0)?;
        let temperature = Thresholds {
            min: lab.temperature[0],
            max: lab.temperature[1],
            step: temperature_step,
        };
        let humidity = Thresholds {
            min: lab.humidity[0],
            max: lab.humidity[1],
            step: humidity_step,
        };
        for (name, limits) in [("temperature", &temperature), ("humidity", &humidity)] {
            if limits.min > limits.max {
                return Err(ConfigError::Invalid {
                    name: "LAB_TABLES_PATH",
                    reason: format!("{} limits for {} are inverted", name, lab_id),
                });
            }
        }

        let sensor_serial = lookup("SENSOR_SERIAL").unwrap_or_default().trim().to_string();
        let correction = tables
            .corrections
            .get(&sensor_serial)
            .or_else(|| tables.corrections.get(""))
            .map(|[t, rh]| Correction {
                temperature: *t,
                humidity: *rh,
            })
            .unwrap_or_default();

        let points_per_hour = positive_or(&lookup, "POINTS_PER_HOUR", 60.0)?;
        let sample_period = std::time::Duration::try_from_secs_f64(3600.0 / points_per_hour)
            .map_err(|e| ConfigError::Invalid {
                name: "POINTS_PER_HOUR",
                reason: format!("sampling period out of range: {}", e),
            })?;
        let graph_hours = positive_or(&lookup, "GRAPH_HOURS", 24.0)?;
        let window = (graph_hours * points_per_hour).round();
        if window < 2.0 {
            return Err(ConfigError::Invalid {
                name: "GRAPH_HOURS",
                reason: "window must hold at least two readings".into(),
            });
        }
        if window > MAX_GRAPH_POINTS as f64 {
            return Err(ConfigError::Invalid {
                name: "GRAPH_HOURS",
                reason: format!("window of {} readings exceeds {}", window, MAX_GRAPH_POINTS),
            });
        }

        let wait_minutes: u32 = parse_or(&lookup, "NORMAL_STATUS_WAIT_MINUTES", 10)?;
        let reread_delay_secs: u64 = parse_or(&lookup, "REREAD_DELAY_SECS", 10)?;

        let test_schedule = match optional(&lookup, "TEST_MESSAGE_AT") {
            Some(raw) => Some(parse_test_schedule(
                &raw,
                flag_or(&lookup, "TEST_MESSAGE_DAILY", false)?,
            )?),
            None => None,
        };

        let instrument = InstrumentSettings {
            port: required(&lookup, "INSTRUMENT_PORT")?,
            baud: parse_or(&lookup, "INSTRUMENT_BAUD", 9600)?,
            slave: parse_or(&lookup, "MODBUS_SLAVE", 1)?,
            temperature_register: parse_or(&lookup, "TEMPERATURE_REGISTER", 0)?,
            humidity_register: parse_or(&lookup, "HUMIDITY_REGISTER", 1)?,
            scale: positive_or(&lookup, "REGISTER_SCALE", 10.0)?,
        };

        let smtp = SmtpSettings {
            host: required(&lookup, "SMTP_HOST")?,
            port: parse_or(&lookup, "SMTP_PORT", 25)?,
            starttls: flag_or(&lookup, "SMTP_STARTTLS", true)?,
            username: optional(&lookup, "SMTP_USERNAME"),
            password: optional(&lookup, "SMTP_PASSWORD"),
            from_address: required(&lookup, "FROM_ADDRESS")?,
            log_address: required(&lookup, "LOG_ADDRESS")?,
        };

        let path_or = |name: &str, default: &str| {
            PathBuf::from(optional(&lookup, name).unwrap_or_else(|| default.to_string()))
        };

        Ok(MonitorConfig {
            lab_users: lab.users.clone(),
            lab_id,
            sensor_serial,
            temperature,
            humidity,
            correction,
            directory: tables.contacts,
            no_contact_path: path_or("NO_CONTACT_PATH", "NoContact.list"),
            data_dir: path_or("DATA_DIR", "EnvironmentData"),
            snapshot_path: path_or("SNAPSHOT_PATH", "tmpimg/outage.png"),
            instrument,
            points_per_hour,
            graph_hours,
            window_points: window as usize,
            sample_period,
            reread_temperature: positive_or(&lookup, "REREAD_TEMPERATURE_DELTA", 1.0)?,
            reread_humidity: positive_or(&lookup, "REREAD_HUMIDITY_DELTA", 10.0)?,
            reread_delay: std::time::Duration::from_secs(reread_delay_secs),
            recovery_wait: time::Duration::minutes(i64::from(wait_minutes)),
            test_schedule,
            smtp,
        })
    }

    /// Number of readings kept in the rolling window.
    pub fn graph_points(&self) -> usize {
        self.window_points
    }

    pub fn sample_period(&self) -> std::time::Duration {
        self.sample_period
    }

    pub fn log_config(&self) {
        info!("Configuration loaded:");
        info!("  Lab            : {}", self.lab_id);
        info!(
            "  Sensor         : '{}' (correction {:+.2} deg. C, {:+.2} %RH)",
            self.sensor_serial, self.correction.temperature, self.correction.humidity
        );
        info!(
            "  Temperature    : [{}, {}] step {}",
            self.temperature.min, self.temperature.max, self.temperature.step
        );
        info!(
            "  Humidity       : [{}, {}] step {}",
            self.humidity.min, self.humidity.max, self.humidity.step
        );
        info!(
            "  Sampling       : {} pts/hr, window {} points",
            self.points_per_hour,
            self.graph_points()
        );
        info!("  Instrument     : {} @ {} baud", self.instrument.port, self.instrument.baud);
        info!(
            "  SMTP           : {}:{} user={} password={}",
            self.smtp.host,
            self.smtp.port,
            self.smtp.username.as_deref().unwrap_or("-"),
            if self.smtp.password.is_some() { "****" } else { "-" }
        );
        info!("  Lab users      : {}", self.lab_users.join(", "));
        if let Some(schedule) = &self.test_schedule {
            info!("  Test message   : {:?}", schedule);
        }
    }
}
