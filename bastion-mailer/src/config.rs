use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{FileTransport, Mailer, MailerError, Sender, SmtpSecurity, SmtpTransport, TemplateContext};

/// Where outgoing bastion mail goes and how it is branded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub transport: TransportConfig,
    pub from_address: String,
    pub from_name: Option<String>,
    pub app_name: String,
    /// Base URL that password reset links point at.
    pub app_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Smtp {
        host: String,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        #[serde(default)]
        security: SmtpSecurity,
    },
    File {
        output_dir: PathBuf,
    },
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl MailerConfig {
    /// Read configuration from `BASTION_MAILER_*` environment variables.
    ///
    /// SMTP is selected when `BASTION_MAILER_SMTP_HOST` is set; otherwise mail is
    /// spooled to `BASTION_MAILER_FILE_OUTPUT_DIR` (default `./emails`).
    pub fn from_env() -> Result<Self, MailerError> {
        let transport = match env("BASTION_MAILER_SMTP_HOST") {
            Some(host) => TransportConfig::Smtp {
                host,
                port: env("BASTION_MAILER_SMTP_PORT")
                    .map(|port| {
                        port.parse().map_err(|_| {
                            MailerError::Config(format!("Invalid BASTION_MAILER_SMTP_PORT: {port}"))
                        })
                    })
                    .transpose()?,
                username: env("BASTION_MAILER_SMTP_USERNAME"),
                password: env("BASTION_MAILER_SMTP_PASSWORD"),
                security: env("BASTION_MAILER_SMTP_TLS")
                    .map(|mode| mode.parse())
                    .transpose()?
                    .unwrap_or_default(),
            },
            None => TransportConfig::File {
                output_dir: env("BASTION_MAILER_FILE_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./emails")),
            },
        };

        let defaults = Self::default();
        Ok(Self {
            transport,
            from_address: env("BASTION_MAILER_FROM_ADDRESS").unwrap_or(defaults.from_address),
            from_name: env("BASTION_MAILER_FROM_NAME"),
            app_name: env("BASTION_MAILER_APP_NAME").unwrap_or(defaults.app_name),
            app_url: env("BASTION_MAILER_APP_URL").unwrap_or(defaults.app_url),
        })
    }

    pub fn build_transport(&self) -> Result<Box<dyn Mailer>, MailerError> {
        match &self.transport {
            TransportConfig::Smtp {
                host,
                port,
                username,
                password,
                security,
            } => {
                let login = username.clone().zip(password.clone());
                Ok(Box::new(SmtpTransport::new(host, *port, *security, login)?))
            }
            TransportConfig::File { output_dir } => Ok(Box::new(FileTransport::new(output_dir)?)),
        }
    }

    pub fn sender(&self) -> Sender {
        let sender = Sender::new(&self.from_address);
        match &self.from_name {
            Some(name) => sender.named(name),
            None => sender,
        }
    }

    /// Template context for a message addressed to `user_name`.
    pub fn template_context(&self, user_name: Option<&str>) -> TemplateContext {
        TemplateContext {
            app_name: self.app_name.clone(),
            app_url: self.app_url.clone(),
            user_name: user_name.map(str::to_string),
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::File {
                output_dir: PathBuf::from("./emails"),
            },
            from_address: "no-reply@bastion.local".to_string(),
            from_name: None,
            app_name: "Bastion".to_string(),
            app_url: "http://localhost:3000".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MailerConfig::default();
        assert_eq!(config.from_address, "no-reply@bastion.local");

        match config.transport {
            TransportConfig::File { output_dir } => {
                assert_eq!(output_dir, PathBuf::from("./emails"));
            }
            _ => panic!("Expected file transport"),
        }
    }

    #[test]
    fn test_sender() {
        let mut config = MailerConfig::default();
        assert_eq!(config.sender().to_string(), "no-reply@bastion.local");

        config.from_name = Some("Bastion".to_string());
        assert_eq!(config.sender().to_string(), "Bastion <no-reply@bastion.local>");
    }

    #[test]
    fn test_smtp_security_defaults_to_starttls() {
        let transport: TransportConfig =
            serde_json::from_str(r#"{"type": "smtp", "host": "smtp.example.com"}"#).unwrap();
        match transport {
            TransportConfig::Smtp { security, .. } => assert_eq!(security, SmtpSecurity::StartTls),
            TransportConfig::File { .. } => panic!("Expected SMTP transport"),
        }
    }

    #[test]
    fn test_template_context_carries_user_name() {
        let config = MailerConfig::default();
        let context = config.template_context(Some("alice"));
        assert_eq!(context.app_name, "Bastion");
        assert_eq!(context.user_name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_build_file_transport() {
        let dir = tempfile::tempdir().unwrap();
        let config = MailerConfig {
            transport: TransportConfig::File {
                output_dir: dir.path().to_path_buf(),
            },
            ..MailerConfig::default()
        };
        assert!(config.build_transport().is_ok());
    }
}
