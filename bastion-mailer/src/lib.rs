//! Email delivery for bastion.
//!
//! Provides the single-recipient [`Email`] value, the [`Mailer`] transport trait with
//! SMTP and file-backed implementations, and the rendered messages bastion sends:
//! [`VerificationCodeEmail`] and [`PasswordResetEmail`].
pub mod config;
pub mod email;
pub mod error;
pub mod mailer;
pub mod messages;
pub mod templates;
pub mod transports;

pub use config::{MailerConfig, TransportConfig};
pub use email::{Email, Sender};
pub use error::MailerError;
pub use mailer::Mailer;
pub use messages::{PasswordResetEmail, VerificationCodeEmail};
pub use templates::TemplateContext;
pub use transports::{FileTransport, SmtpSecurity, SmtpTransport};

pub mod prelude {
    pub use crate::{
        Email, FileTransport, Mailer, MailerConfig, MailerError, PasswordResetEmail, Sender,
        SmtpTransport, TemplateContext, VerificationCodeEmail,
    };
}
