/// Outbound notifications: transport trait, message catalogue, dispatcher
pub mod dispatcher;
pub mod messages;
pub mod smtp;

use std::path::Path;

pub use dispatcher::{DeliveryOutcome, DeliveryReport, Dispatcher, Notice};
pub use smtp::SmtpTransport;

use crate::error::NotifyError;

/// Message transport. Each call delivers to one recipient and fails
/// independently of every other call.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send_text(&self, address: &str, body: &str) -> Result<(), NotifyError>;

    async fn send_mms_with_image(
        &self,
        address: &str,
        body: &str,
        image: &Path,
    ) -> Result<(), NotifyError>;
}
