/// Message catalogue for alerts, delayed alerts, and the scheduled test
use crate::models::{AlertIntent, AlertKind, Direction, Quantity, Reading, Thresholds};
use crate::utils::format_datetime;

fn latest(reading: &Reading) -> String {
    format!(
        "Latest reading at {}: {:.2} deg. C, {:.2} %RH",
        format_datetime(&reading.time),
        reading.temperature,
        reading.humidity
    )
}

fn label(quantity: Quantity) -> &'static str {
    match quantity {
        Quantity::Temperature => "Temperature",
        Quantity::Humidity => "Humidity",
    }
}

/// Body sent to lab contacts when an alert intent fires.
pub fn alert_message(
    lab_id: &str,
    intent: &AlertIntent,
    limits: &Thresholds,
    reading: &Reading,
) -> String {
    let name = label(intent.quantity);
    let unit = intent.quantity.unit();
    let headline = match intent.kind {
        AlertKind::Outage => format!("{} OUT OF RANGE in {}.", name, lab_id),
        AlertKind::Incremental(Direction::Above) => {
            format!("{} in {} has INCREASED further.", name, lab_id)
        }
        AlertKind::Incremental(Direction::Below) => {
            format!("{} in {} has DECREASED further.", name, lab_id)
        }
        AlertKind::Return => format!("{} in {} has RETURNED to normal.", name, lab_id),
    };
    format!(
        "{}\nLimits: {} to {} {}\n{}",
        headline,
        limits.min,
        limits.max,
        unit,
        latest(reading)
    )
}

/// Body stored while notifications cannot be delivered. It is sent once
/// connectivity returns, so it says the alert was delayed.
pub fn delayed_message(
    lab_id: &str,
    intent: &AlertIntent,
    limits: &Thresholds,
    reading: &Reading,
) -> String {
    let event = match intent.kind {
        AlertKind::Return => "returned to normal",
        _ => "went out of range",
    };
    format!(
        "DELAYED ALERT: {} in {} {} while the monitor could not reach the network.\n\
         Limits: {} to {} {}\n{}\nCheck the attached chart for the current state.",
        label(intent.quantity),
        lab_id,
        event,
        limits.min,
        limits.max,
        intent.quantity.unit(),
        latest(reading)
    )
}

pub fn test_message(lab_id: &str, reading: Option<&Reading>) -> String {
    let mut message = format!(
        "Scheduled test of the environment alert system for {}. No action is needed.",
        lab_id
    );
    if let Some(reading) = reading {
        message.push('\n');
        message.push_str(&latest(reading));
    }
    message
}

/// Compiled transcript sent to the operations mailbox after a dispatch.
pub fn transcript(lab_id: &str, message: &str, delivered: &[&str], delayed: Option<&str>) -> String {
    let mut log = format!("Start log for {}\n\n{}\n", lab_id, message);
    for address in delivered {
        log.push('\n');
        log.push_str(address);
    }
    if let Some(delayed) = delayed {
        log.push('\n');
        log.push_str(delayed);
    }
    log
}
