/// SMTP delivery to email-to-SMS/MMS gateways
use std::path::Path;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpSettings;
use crate::error::NotifyError;
use crate::notify::Transport;

pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    lab_id: String,
}

impl SmtpTransport {
    pub fn new(settings: &SmtpSettings, lab_id: &str) -> Result<Self, NotifyError> {
        let mut builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };
        builder = builder.port(settings.port);
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from: settings.from_address.parse()?,
            lab_id: lab_id.to_string(),
        })
    }

    fn envelope(&self, address: &str, subject: String) -> Result<lettre::message::MessageBuilder, NotifyError> {
        Ok(Message::builder()
            .from(self.from.clone())
            .to(address.parse()?)
            .subject(subject))
    }
}

fn image_content_type(image: &Path) -> ContentType {
    let mime = match image.extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("bmp") => "image/bmp",
        _ => "image/png",
    };
    ContentType::parse(mime).unwrap_or(ContentType::TEXT_PLAIN)
}

impl Transport for SmtpTransport {
    async fn send_text(&self, address: &str, body: &str) -> Result<(), NotifyError> {
        let message = self
            .envelope(address, format!("DMG Alert: {} event log", self.lab_id))?
            .singlepart(SinglePart::plain(body.to_string()))?;
        self.mailer.send(message).await?;
        Ok(())
    }

    async fn send_mms_with_image(
        &self,
        address: &str,
        body: &str,
        image: &Path,
    ) -> Result<(), NotifyError> {
        let bytes = tokio::fs::read(image).await?;
        let filename = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("chart.png")
            .to_string();
        let attachment = Attachment::new(filename).body(bytes, image_content_type(image));

        let message = self
            .envelope(address, format!("DMG Alert: {} Environment Event", self.lab_id))?
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(attachment),
            )?;
        self.mailer.send(message).await?;
        Ok(())
    }
}
