use askama::Template;

use crate::{
    Email, MailerError, Sender,
    templates::{
        PasswordResetHtml, PasswordResetText, TemplateContext, VerificationCodeHtml,
        VerificationCodeText,
    },
};

pub struct VerificationCodeEmail;

impl VerificationCodeEmail {
    pub fn build(
        from: &Sender,
        to: &str,
        code: &str,
        expires_in_minutes: i64,
        context: &TemplateContext,
    ) -> Result<Email, MailerError> {
        let html_body = VerificationCodeHtml {
            app_name: &context.app_name,
            app_url: &context.app_url,
            user_name: &context.user_name,
            code,
            expires_in_minutes,
        }
        .render()?;
        let text_body = VerificationCodeText {
            app_name: &context.app_name,
            user_name: &context.user_name,
            code,
            expires_in_minutes,
        }
        .render()?;

        let subject = format!("Your {} verification code", context.app_name);
        Ok(Email::new(from.clone(), to, subject, text_body)?.with_html(html_body))
    }
}

pub struct PasswordResetEmail;

impl PasswordResetEmail {
    /// Build the reset message. The link is `{app_url}/reset-password?token={token}`.
    pub fn build(
        from: &Sender,
        to: &str,
        token: &str,
        expires_in_hours: i64,
        context: &TemplateContext,
    ) -> Result<Email, MailerError> {
        let reset_link = format!(
            "{}/reset-password?token={}",
            context.app_url.trim_end_matches('/'),
            token
        );

        let html_body = PasswordResetHtml {
            app_name: &context.app_name,
            user_name: &context.user_name,
            reset_link: &reset_link,
            expires_in_hours,
        }
        .render()?;
        let text_body = PasswordResetText {
            app_name: &context.app_name,
            user_name: &context.user_name,
            reset_link: &reset_link,
            expires_in_hours,
        }
        .render()?;

        let subject = format!("Reset your {} password", context.app_name);
        Ok(Email::new(from.clone(), to, subject, text_body)?.with_html(html_body))
    }
}
