use std::sync::Arc;

pub mod smtp;
pub mod templates;

pub use smtp::SmtpMailClient;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait::async_trait]
pub trait MailClient: Send + Sync {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()>;
    fn from_email(&self) -> &str;
    fn from_name(&self) -> &str;
}

pub type DynMailClient = Arc<dyn MailClient>;

/// Build the mail client from `SMTP_*` env vars. Returns `None` when
/// `SMTP_HOST` is unset, in which case order emails are skipped.
pub fn mail_client_from_env() -> anyhow::Result<Option<DynMailClient>> {
    match SmtpMailClient::from_env()? {
        Some(client) => Ok(Some(Arc::new(client))),
        None => Ok(None),
    }
}
