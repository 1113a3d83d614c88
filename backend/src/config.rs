use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct ClerkSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    /// PEM-encoded RSA public key used to verify session tokens.
    pub jwt_public_key: String,
    pub jwt_issuer: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RazorpaySettings {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
}

#[derive(Clone, Debug)]
pub struct EmailSettings {
    pub resend_api_key: String,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct RateLimitSettings {
    pub per_millisecond: u64,
    pub burst: u32,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    /// Public base URL used in e-mail links.
    pub app_url: String,
    pub bind_addr: String,
    pub http_timeout: Duration,
    pub clerk: ClerkSettings,
    pub razorpay: RazorpaySettings,
    pub email: EmailSettings,
    pub rate_limit: RateLimitSettings,
}

const DEFAULT_FROM_EMAIL: &str = "noreply@zyntic.com";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let frontend_origin = required("FRONTEND_ORIGIN")?;
        let app_url = optional("APP_URL").unwrap_or_else(|| frontend_origin.clone());

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            app_url: app_url.trim_end_matches('/').to_string(),
            frontend_origin,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string()),
            http_timeout: Duration::from_secs(parsed("HTTP_TIMEOUT_SECONDS", 15)?),
            clerk: ClerkSettings {
                secret_key: required("CLERK_SECRET_KEY")?,
                webhook_secret: required("CLERK_WEBHOOK_SECRET")?,
                // PEM keys are often stored with literal "\n" in .env files
                jwt_public_key: required("CLERK_JWT_KEY")?.replace("\\n", "\n"),
                jwt_issuer: optional("CLERK_JWT_ISSUER"),
            },
            razorpay: RazorpaySettings {
                key_id: required("RAZORPAY_KEY_ID")?,
                key_secret: required("RAZORPAY_KEY_SECRET")?,
                webhook_secret: required("RAZORPAY_WEBHOOK_SECRET")?,
            },
            email: EmailSettings {
                resend_api_key: required("RESEND_API_KEY")?,
                from: optional("RESEND_FROM_EMAIL")
                    .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            },
            rate_limit: RateLimitSettings {
                // Default: 200ms/token (~5 req/sec)
                per_millisecond: parsed("RATE_LIMITER_MILLISECONDS", 200)?,
                burst: parsed("RATE_LIMITER_BURST", 20)?,
            },
        })
    }

    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard", self.app_url)
    }
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        frontend_origin: "http://localhost:3001".into(),
        app_url: "https://app.zyntic.test".into(),
        bind_addr: "127.0.0.1:0".into(),
        http_timeout: Duration::from_secs(5),
        clerk: ClerkSettings {
            secret_key: "sk_test_stub".into(),
            webhook_secret: "whsec_dGVzdC13ZWJob29rLXNlY3JldA==".into(),
            jwt_public_key: String::new(),
            jwt_issuer: None,
        },
        razorpay: RazorpaySettings {
            key_id: "rzp_test_key".into(),
            key_secret: "rzp_test_secret".into(),
            webhook_secret: "rzp_webhook_secret".into(),
        },
        email: EmailSettings {
            resend_api_key: "re_test".into(),
            from: DEFAULT_FROM_EMAIL.into(),
        },
        rate_limit: RateLimitSettings {
            per_millisecond: 200,
            burst: 20,
        },
    }
}
