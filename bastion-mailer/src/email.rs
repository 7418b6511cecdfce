use std::fmt;

use lettre::Message;
use lettre::message::{Mailbox, MultiPart, SinglePart};

use crate::MailerError;

/// The mailbox bastion sends from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub address: String,
    pub name: Option<String>,
}

impl Sender {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn mailbox(&self) -> Result<Mailbox, MailerError> {
        Ok(Mailbox::new(self.name.clone(), self.address.parse()?))
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// A rendered message for a single account holder.
///
/// Every message has a plain-text body. The HTML part is an optional
/// alternative and is sent as `multipart/alternative` when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub from: Sender,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

impl Email {
    pub fn new(
        from: Sender,
        to: impl Into<String>,
        subject: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Self, MailerError> {
        let email = Self {
            to: to.into(),
            from,
            subject: subject.into(),
            text: text.into(),
            html: None,
        };

        if email.to.trim().is_empty() {
            return Err(MailerError::Compose("Recipient is required".to_string()));
        }
        if email.subject.trim().is_empty() {
            return Err(MailerError::Compose("Subject is required".to_string()));
        }
        if email.text.trim().is_empty() {
            return Err(MailerError::Compose("Text body is required".to_string()));
        }

        Ok(email)
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub(crate) fn into_message(self) -> Result<Message, MailerError> {
        let builder = Message::builder()
            .from(self.from.mailbox()?)
            .to(Mailbox::new(None, self.to.parse()?))
            .subject(self.subject);

        let message = match self.html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(self.text, html))?,
            None => builder.singlepart(SinglePart::plain(self.text))?,
        };

        Ok(message)
    }
}
