use super::sendmail::send_email;

/// One-time code for the forgot-password flow. The code expires ten minutes
/// after issue; the template states that so the mail matches the server.
pub async fn send_otp_email(
    to_email: &str,
    name: &str,
    otp: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "Password Reset Code";
    let template_path = "src/mail/templates/Otp-email.html";
    let placeholders = vec![
        ("{{name}}".to_string(), name.to_string()),
        ("{{otp}}".to_string(), otp.to_string()),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_welcome_email(
    to_email: &str,
    name: &str,
    frontend_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "Welcome aboard";
    let template_path = "src/mail/templates/Welcome-email.html";
    let placeholders = vec![
        ("{{name}}".to_string(), name.to_string()),
        ("{{frontend_url}}".to_string(), frontend_url.to_string()),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}
