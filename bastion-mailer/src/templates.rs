use askama::Template;
use serde::{Deserialize, Serialize};

/// Values shared by every rendered message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub app_name: String,
    pub app_url: String,
    pub user_name: Option<String>,
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self {
            app_name: "Bastion".to_string(),
            app_url: "http://localhost:3000".to_string(),
            user_name: None,
        }
    }
}

#[derive(Template)]
#[template(
    source = r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Verify your email - {{ app_name }}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 20px; background-color: #f4f4f4; }
        .container { max-width: 600px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; }
        .code { font-size: 32px; letter-spacing: 8px; font-family: monospace; text-align: center; background: #f8f9fa; padding: 16px; border-radius: 4px; }
        .footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="container">
        <h1>{{ app_name }}</h1>

        <p>{% if let Some(name) = user_name %}Hello {{ name }},{% else %}Hello,{% endif %}</p>

        <p>Use the code below to verify your email address. It expires in {{ expires_in_minutes }} minutes.</p>

        <p class="code">{{ code }}</p>

        <p>If you didn't ask for this code, you can ignore this email. Nobody can verify your address without it.</p>

        <div class="footer">
            <p>This email was sent by {{ app_name }} ({{ app_url }}).</p>
        </div>
    </div>
</body>
</html>
"#,
    ext = "html"
)]
pub struct VerificationCodeHtml<'a> {
    pub app_name: &'a str,
    pub app_url: &'a str,
    pub user_name: &'a Option<String>,
    pub code: &'a str,
    pub expires_in_minutes: i64,
}

#[derive(Template)]
#[template(
    source = r#"{% if let Some(name) = user_name %}Hello {{ name }},{% else %}Hello,{% endif %}

Your {{ app_name }} verification code is: {{ code }}

It expires in {{ expires_in_minutes }} minutes. If you didn't ask for this code, you can ignore this email.
"#,
    ext = "txt"
)]
pub struct VerificationCodeText<'a> {
    pub app_name: &'a str,
    pub user_name: &'a Option<String>,
    pub code: &'a str,
    pub expires_in_minutes: i64,
}

#[derive(Template)]
#[template(
    source = r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Reset your password - {{ app_name }}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 20px; background-color: #f4f4f4; }
        .container { max-width: 600px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; }
        .button { display: inline-block; padding: 12px 24px; background-color: #dc3545; color: white; text-decoration: none; border-radius: 4px; margin: 20px 0; }
        .footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="container">
        <h1>{{ app_name }}</h1>

        <p>{% if let Some(name) = user_name %}Hello {{ name }},{% else %}Hello,{% endif %}</p>

        <p>We received a request to reset your password. The link below can be used once and expires in {{ expires_in_hours }} hours.</p>

        <div style="text-align: center;">
            <a href="{{ reset_link }}" class="button">Reset Password</a>
        </div>

        <p>Or copy and paste this URL into your browser:</p>
        <p style="word-break: break-all; background: #f8f9fa; padding: 10px; border-radius: 4px; font-family: monospace;">{{ reset_link }}</p>

        <p>If you didn't request a password reset, you can ignore this email. Your password will not change.</p>

        <div class="footer">
            <p>This email was sent by {{ app_name }}.</p>
        </div>
    </div>
</body>
</html>
"#,
    ext = "html"
)]
pub struct PasswordResetHtml<'a> {
    pub app_name: &'a str,
    pub user_name: &'a Option<String>,
    pub reset_link: &'a str,
    pub expires_in_hours: i64,
}

#[derive(Template)]
#[template(
    source = r#"{% if let Some(name) = user_name %}Hello {{ name }},{% else %}Hello,{% endif %}

We received a request to reset your {{ app_name }} password. Open the link below to choose a new one:

{{ reset_link }}

The link can be used once and expires in {{ expires_in_hours }} hours. If you didn't request a reset, you can ignore this email.
"#,
    ext = "txt"
)]
pub struct PasswordResetText<'a> {
    pub app_name: &'a str,
    pub user_name: &'a Option<String>,
    pub reset_link: &'a str,
    pub expires_in_hours: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_code_html_renders_code() {
        let user_name = Some("alice".to_string());
        let html = VerificationCodeHtml {
            app_name: "Bastion",
            app_url: "https://bastion.test",
            user_name: &user_name,
            code: "482913",
            expires_in_minutes: 15,
        }
        .render()
        .unwrap();

        assert!(html.contains("482913"));
        assert!(html.contains("Hello alice,"));
        assert!(html.contains("15 minutes"));
    }

    #[test]
    fn test_reset_text_without_name() {
        let text = PasswordResetText {
            app_name: "Bastion",
            user_name: &None,
            reset_link: "https://bastion.test/reset-password?token=abc",
            expires_in_hours: 24,
        }
        .render()
        .unwrap();

        assert!(text.starts_with("Hello,"));
        assert!(text.contains("https://bastion.test/reset-password?token=abc"));
    }

    #[test]
    fn test_html_escapes_user_name() {
        let user_name = Some("<script>".to_string());
        let html = PasswordResetHtml {
            app_name: "Bastion",
            user_name: &user_name,
            reset_link: "https://bastion.test/r",
            expires_in_hours: 24,
        }
        .render()
        .unwrap();

        assert!(!html.contains("<script>"));
    }
}
