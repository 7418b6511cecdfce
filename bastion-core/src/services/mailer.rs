#[cfg(feature = "mailer")]
pub use self::mailer_impl::*;

#[cfg(feature = "mailer")]
mod mailer_impl {
    use async_trait::async_trait;
    use bastion_mailer::prelude::*;

    use crate::{
        error::DispatchError,
        notification::{Notification, Notifier},
    };

    /// [`Notifier`] that renders the bastion email templates and sends them
    /// through a [`Mailer`] transport.
    pub struct MailerNotifier {
        transport: Box<dyn Mailer>,
        config: MailerConfig,
    }

    impl MailerNotifier {
        pub fn new(config: MailerConfig) -> Result<Self, DispatchError> {
            let transport = config
                .build_transport()
                .map_err(|e| DispatchError::Delivery(e.to_string()))?;
            Ok(Self { transport, config })
        }

        pub fn with_transport(transport: Box<dyn Mailer>, config: MailerConfig) -> Self {
            Self { transport, config }
        }

        pub fn from_env() -> Result<Self, DispatchError> {
            let config =
                MailerConfig::from_env().map_err(|e| DispatchError::Delivery(e.to_string()))?;
            Self::new(config)
        }

        fn render(&self, to: &str, notification: &Notification) -> Result<Email, MailerError> {
            let from = self.config.sender();
            match notification {
                Notification::VerificationCode {
                    username,
                    code,
                    expires_in_minutes,
                } => VerificationCodeEmail::build(
                    &from,
                    to,
                    code,
                    *expires_in_minutes,
                    &self.config.template_context(Some(username)),
                ),
                Notification::PasswordReset {
                    username,
                    token,
                    expires_in_hours,
                } => PasswordResetEmail::build(
                    &from,
                    to,
                    token,
                    *expires_in_hours,
                    &self.config.template_context(Some(username)),
                ),
            }
        }
    }

    #[async_trait]
    impl Notifier for MailerNotifier {
        async fn notify(&self, to: &str, notification: Notification) -> Result<(), DispatchError> {
            let email = self
                .render(to, &notification)
                .map_err(|e| DispatchError::Delivery(e.to_string()))?;

            self.transport
                .send_email(email)
                .await
                .map_err(|e| DispatchError::Delivery(e.to_string()))
        }
    }

}
