//! Laboratory environment monitor.
//!
//! Polls a temperature/humidity instrument, keeps a rolling window of
//! readings, logs them to monthly CSV files, and sends SMS/MMS alerts through
//! email gateways when either quantity leaves its limits. The binary in
//! `main.rs` wires the concrete collaborators together; everything here is
//! exposed for integration testing.

pub mod alerts;
pub mod buffer;
pub mod chart;
pub mod config;
pub mod contacts;
pub mod error;
pub mod instrument;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod selftest;
pub mod storage;
pub mod utils;
