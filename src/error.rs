/// Error types for the monitor's collaborators
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Lab {0} has no entry in the lab tables")]
    UnknownLab(String),

    #[error("Failed to read lab tables {path}: {source}")]
    TablesIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse lab tables {path}: {source}")]
    TablesFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("Modbus transport error: {0}")]
    Transport(String),

    #[error("Modbus exception: {0}")]
    Exception(String),

    #[error("Instrument returned no register data")]
    EmptyResponse,

    #[error("Instrument not connected")]
    NotConnected,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to format timestamp: {0}")]
    Format(#[from] time::error::Format),
}

#[derive(Debug, thiserror::Error)]
#[error("Chart rendering failed: {0}")]
pub struct ChartError(pub String);
