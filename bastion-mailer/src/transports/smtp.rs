use std::str::FromStr;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::{Deserialize, Serialize};

use crate::{Email, Mailer, MailerError};

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpSecurity {
    /// Plaintext, for local mail catchers only.
    None,
    #[default]
    StartTls,
    Tls,
}

impl FromStr for SmtpSecurity {
    type Err = MailerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "plain" => Ok(SmtpSecurity::None),
            "starttls" => Ok(SmtpSecurity::StartTls),
            "tls" => Ok(SmtpSecurity::Tls),
            other => Err(MailerError::Config(format!("Unknown SMTP security mode: {other}"))),
        }
    }
}

/// Delivers mail through an SMTP relay. The connection is opened on first send.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    relay: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(
        host: &str,
        port: Option<u16>,
        security: SmtpSecurity,
        login: Option<(String, String)>,
    ) -> Result<Self, MailerError> {
        let mut relay = match security {
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
        };

        if let Some(port) = port {
            relay = relay.port(port);
        }
        if let Some((username, password)) = login {
            relay = relay.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            relay: relay.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpTransport {
    async fn send_email(&self, email: Email) -> Result<(), MailerError> {
        self.relay.send(email.into_message()?).await?;
        Ok(())
    }
}
