use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::Transport;
use lettre::transport::file::FileTransport as EmlSpool;

use crate::{Email, Mailer, MailerError};

/// Spools each message as an `.eml` file so codes and reset links can be read
/// off disk in development.
#[derive(Debug, Clone)]
pub struct FileTransport {
    spool: EmlSpool,
    output_dir: PathBuf,
}

impl FileTransport {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self, MailerError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            spool: EmlSpool::new(&output_dir),
            output_dir,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl Mailer for FileTransport {
    async fn send_email(&self, email: Email) -> Result<(), MailerError> {
        let message = email.into_message()?;
        let spool = self.spool.clone();

        let id = tokio::task::spawn_blocking(move || spool.send(&message))
            .await
            .map_err(|e| MailerError::Spool(e.to_string()))??;

        tracing::debug!(dir = %self.output_dir.display(), id = %id, "Spooled email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sender;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_send_writes_eml_file() {
        let dir = tempdir().unwrap();
        let transport = FileTransport::new(dir.path()).unwrap();

        let email = Email::new(
            Sender::new("no-reply@bastion.local"),
            "alice@example.com",
            "Your verification code",
            "Your code is 482913",
        )
        .unwrap();
        transport.send_email(email).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_new_creates_output_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("outbox").join("dev");

        let transport = FileTransport::new(&nested).unwrap();

        assert!(nested.is_dir());
        assert_eq!(transport.output_dir(), nested.as_path());
    }
}
