/// Month-bucketed CSV logs of every reading and of out-of-range readings
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use time::macros::format_description;

use crate::alerts::classify;
use crate::error::StorageError;
use crate::models::{Reading, Thresholds};
use crate::utils::format_datetime;

pub const ALL_HEADER: &str = "time,Temperature (deg. C),Humidity (%RH)";
pub const OUTAGE_HEADER: &str =
    "time,Temperature (deg. C),Humidity (%RH),Temperature Outage?,Humidity Outage?";

pub struct CsvSink {
    directory: PathBuf,
    temperature: Thresholds,
    humidity: Thresholds,
}

impl CsvSink {
    pub fn new(directory: impl Into<PathBuf>, temperature: Thresholds, humidity: Thresholds) -> Self {
        Self {
            directory: directory.into(),
            temperature,
            humidity,
        }
    }

    /// File stem for the month the reading falls in, e.g. `October2026`.
    pub fn period_stem(reading: &Reading) -> Result<String, StorageError> {
        Ok(reading
            .time
            .format(format_description!("[month repr:long][year]"))?)
    }

    pub fn all_path(&self, reading: &Reading) -> Result<PathBuf, StorageError> {
        Ok(self
            .directory
            .join(format!("{}-all.env.csv", Self::period_stem(reading)?)))
    }

    pub fn outage_path(&self, reading: &Reading) -> Result<PathBuf, StorageError> {
        Ok(self
            .directory
            .join(format!("{}-outages.env.csv", Self::period_stem(reading)?)))
    }

    /// Append the reading to the monthly log, and to the outage log when
    /// either quantity is out of range.
    pub fn record(&self, reading: &Reading) -> Result<(), StorageError> {
        fs::create_dir_all(&self.directory).map_err(|source| StorageError::Io {
            path: self.directory.clone(),
            source,
        })?;

        let time = format_datetime(&reading.time);
        let row = format!("{},{},{}", time, reading.temperature, reading.humidity);
        append_row(&self.all_path(reading)?, ALL_HEADER, &row)?;

        let temperature_out = !classify(reading.temperature, &self.temperature);
        let humidity_out = !classify(reading.humidity, &self.humidity);
        if temperature_out || humidity_out {
            let row = format!(
                "{},{},{},{},{}",
                time,
                reading.temperature,
                reading.humidity,
                if temperature_out { "TEMPERATURE OUTAGE" } else { "" },
                if humidity_out { "HUMIDITY OUTAGE" } else { "" },
            );
            append_row(&self.outage_path(reading)?, OUTAGE_HEADER, &row)?;
            debug!("Outage row recorded at {}", time);
        }
        Ok(())
    }
}

/// Append `row`, writing `header` first if the file is new.
fn append_row(path: &Path, header: &str, row: &str) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    let is_new = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    if is_new {
        writeln!(file, "{}", header).map_err(io_err)?;
    }
    writeln!(file, "{}", row).map_err(io_err)
}
