use crate::{env_or_default, env_parse_or, env_required, ConfigError, FromEnv};

/// Outbound SMTP configuration.
///
/// The transport is built once at startup and shared by every send: a pooled
/// connection set plus a token-bucket rate limit over a configurable window.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Use TLS (relay) instead of a plaintext connection (Mailpit/Mailhog).
    pub secure: bool,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    /// Maximum pooled connections held against the relay.
    pub pool_max_connections: u32,
    /// Maximum sends allowed per rate window.
    pub rate_limit_max: u32,
    /// Rate window duration in milliseconds.
    pub rate_limit_window_ms: u64,
}

impl FromEnv for SmtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_required("SMTP_HOST")?,
            port: env_parse_or("SMTP_PORT", 587)?,
            secure: env_or_default("SMTP_SECURE", "true")
                .eq_ignore_ascii_case("true"),
            username: env_or_default("SMTP_USERNAME", ""),
            password: env_or_default("SMTP_PASSWORD", ""),
            from_email: env_required("EMAIL_FROM_ADDRESS")?,
            from_name: env_or_default("EMAIL_FROM_NAME", "Mercado"),
            pool_max_connections: env_parse_or("SMTP_POOL_MAX_CONNECTIONS", 5)?,
            rate_limit_max: env_parse_or("SMTP_RATE_LIMIT_MAX", 100)?,
            rate_limit_window_ms: env_parse_or("SMTP_RATE_LIMIT_WINDOW_MS", 1000)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars(
            [
                ("SMTP_HOST", Some("smtp.example.com")),
                ("EMAIL_FROM_ADDRESS", Some("noreply@example.com")),
                ("SMTP_PORT", None),
                ("SMTP_SECURE", None),
                ("SMTP_POOL_MAX_CONNECTIONS", None),
                ("SMTP_RATE_LIMIT_MAX", None),
                ("SMTP_RATE_LIMIT_WINDOW_MS", None),
            ],
            || {
                let config = SmtpConfig::from_env().unwrap();
                assert_eq!(config.host, "smtp.example.com");
                assert_eq!(config.port, 587);
                assert!(config.secure);
                assert_eq!(config.pool_max_connections, 5);
                assert_eq!(config.rate_limit_max, 100);
                assert_eq!(config.rate_limit_window_ms, 1000);
            },
        );
    }

    #[test]
    fn test_from_env_missing_host() {
        temp_env::with_var_unset("SMTP_HOST", || {
            assert!(SmtpConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_secure_flag_parsing() {
        temp_env::with_vars(
            [
                ("SMTP_HOST", Some("localhost")),
                ("EMAIL_FROM_ADDRESS", Some("dev@localhost")),
                ("SMTP_SECURE", Some("false")),
            ],
            || {
                let config = SmtpConfig::from_env().unwrap();
                assert!(!config.secure);
            },
        );
    }
}
