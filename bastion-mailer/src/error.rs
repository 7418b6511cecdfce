use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to compose email: {0}")]
    Compose(String),

    #[error("Failed to render email template: {0}")]
    Render(#[from] askama::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Failed to spool email to disk: {0}")]
    Spool(String),

    #[error("Invalid mailer configuration: {0}")]
    Config(String),
}

impl From<lettre::error::Error> for MailerError {
    fn from(e: lettre::error::Error) -> Self {
        MailerError::Compose(e.to_string())
    }
}

impl From<lettre::transport::file::Error> for MailerError {
    fn from(e: lettre::transport::file::Error) -> Self {
        MailerError::Spool(e.to_string())
    }
}

impl From<std::io::Error> for MailerError {
    fn from(e: std::io::Error) -> Self {
        MailerError::Spool(e.to_string())
    }
}
