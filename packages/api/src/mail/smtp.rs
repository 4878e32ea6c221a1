use anyhow::{Context, anyhow};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};

use super::{EmailMessage, MailClient};

pub struct SmtpMailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
}

impl SmtpMailClient {
    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`,
    /// `MAIL_FROM_EMAIL` and `MAIL_FROM_NAME`. Returns `None` when no
    /// `SMTP_HOST` is configured.
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            return Ok(None);
        };
        let port: u16 = std::env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .context("Invalid SMTP_PORT")?;
        let username = std::env::var("SMTP_USERNAME").context("SMTP_USERNAME not set")?;
        let password = std::env::var("SMTP_PASSWORD").context("SMTP_PASSWORD not set")?;
        let from_email =
            std::env::var("MAIL_FROM_EMAIL").context("MAIL_FROM_EMAIL not set")?;
        let from_name =
            std::env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Retail Hub".to_string());

        let creds = Credentials::new(username, password);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(port)
            .credentials(creds)
            .build();

        Ok(Some(Self {
            transport,
            from_email,
            from_name,
        }))
    }
}

#[async_trait::async_trait]
impl MailClient for SmtpMailClient {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        let from_address = format!("{} <{}>", self.from_name, self.from_email);

        let email = Message::builder()
            .from(
                from_address
                    .parse()
                    .map_err(|e| anyhow!("Invalid from address: {}", e))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body)
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email via SMTP: {}", e))?;

        Ok(())
    }

    fn from_email(&self) -> &str {
        &self.from_email
    }

    fn from_name(&self) -> &str {
        &self.from_name
    }
}
