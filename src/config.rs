use anyhow::bail;
use serde::Deserialize;

/// The weak default the original deployment shipped with. Refusing it at
/// startup is cheaper than discovering it in an incident report.
const PLACEHOLDER_SECRET: &str = "change-this-secret-in-production";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub frontend_url: String,
}

impl MailConfig {
    /// True when enough SMTP settings are present to actually deliver mail.
    /// The well-known sample values from the project template count as absent.
    pub fn is_configured(&self) -> bool {
        let real = |v: &Option<String>, sample: &str| {
            v.as_deref()
                .map(|s| !s.is_empty() && s != sample)
                .unwrap_or(false)
        };
        self.smtp_host.as_deref().map(|h| !h.is_empty()).unwrap_or(false)
            && real(&self.smtp_username, "your-email@gmail.com")
            && real(&self.smtp_password, "your-app-specific-password-here")
            && self.from_address.as_deref().map(|f| !f.is_empty()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub signup_max: u32,
    pub signup_window_seconds: u64,
    pub login_max: u32,
    pub login_window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub rate_limit: RateLimitConfig,
    /// Surface the raw reset token in the forgot-password response when mail
    /// is unconfigured. Development convenience only; must stay off in
    /// production.
    pub expose_reset_token: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) => s,
            Err(_) => bail!("JWT_SECRET must be set"),
        };
        if secret.is_empty() || secret == PLACEHOLDER_SECRET {
            bail!("JWT_SECRET is empty or still the placeholder value; refusing to start");
        }
        let jwt = JwtConfig {
            secret,
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST").ok(),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            smtp_username: std::env::var("EMAIL_USER").ok(),
            smtp_password: std::env::var("EMAIL_PASS").ok(),
            from_address: std::env::var("EMAIL_FROM")
                .ok()
                .or_else(|| std::env::var("EMAIL_USER").ok()),
            from_name: std::env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "StayEasy".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        };

        let rate_limit = RateLimitConfig {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| v != "false")
                .unwrap_or(true),
            signup_max: env_u32("RATE_LIMIT_SIGNUP_MAX", 5),
            signup_window_seconds: env_u64("RATE_LIMIT_SIGNUP_WINDOW_SECONDS", 3600),
            login_max: env_u32("RATE_LIMIT_LOGIN_MAX", 5),
            login_window_seconds: env_u64("RATE_LIMIT_LOGIN_WINDOW_SECONDS", 900),
        };

        let expose_reset_token = std::env::var("EXPOSE_RESET_TOKEN")
            .map(|v| v == "true")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            jwt,
            mail,
            rate_limit,
            expose_reset_token,
        })
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config() -> MailConfig {
        MailConfig {
            smtp_host: Some("smtp.example.com".into()),
            smtp_port: 587,
            smtp_username: Some("mailer@example.com".into()),
            smtp_password: Some("hunter2".into()),
            from_address: Some("mailer@example.com".into()),
            from_name: "StayEasy".into(),
            frontend_url: "http://localhost:3000".into(),
        }
    }

    #[test]
    fn mail_configured_with_full_settings() {
        assert!(mail_config().is_configured());
    }

    #[test]
    fn mail_not_configured_without_host() {
        let mut cfg = mail_config();
        cfg.smtp_host = None;
        assert!(!cfg.is_configured());
    }

    #[test]
    fn mail_treats_template_samples_as_unconfigured() {
        let mut cfg = mail_config();
        cfg.smtp_username = Some("your-email@gmail.com".into());
        assert!(!cfg.is_configured());

        let mut cfg = mail_config();
        cfg.smtp_password = Some("your-app-specific-password-here".into());
        assert!(!cfg.is_configured());
    }
}
