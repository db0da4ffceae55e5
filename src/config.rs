// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! Everything is sourced from environment variables. Where older
//! deployments used a different variable name, the legacy alias is consulted
//! when the primary name is absent.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default Cloudflare Turnstile verification endpoint.
pub const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Invalid URL for {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

/// Configuration for the contact relay service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    pub bind_addr: String,

    /// Honour `CF-Connecting-IP` / `X-Forwarded-For` / `X-Real-IP`.
    /// Only safe behind a proxy that overwrites them (default: false)
    pub trust_proxy_headers: bool,

    /// Allowed CORS origin; `None` allows any origin
    pub cors_allow_origin: Option<String>,

    pub abuse: AbuseConfig,
    pub validation: ValidationConfig,
    pub smtp: SmtpConfig,
    pub captcha: CaptchaConfig,
    pub i18n: I18nConfig,
}

/// Limits for the abuse tracker.
#[derive(Debug, Clone)]
pub struct AbuseConfig {
    /// Accepted attempts allowed per IP inside the rate window (default: 5)
    pub rate_limit_max: usize,

    /// Rate window in seconds (default: 60)
    pub rate_window_secs: u64,

    /// Bad events that trigger a block (default: 8)
    pub bad_event_threshold: usize,

    /// Bad-event window in seconds (default: 600)
    pub bad_event_window_secs: u64,

    /// Block duration in seconds (default: 3600)
    pub block_secs: u64,
}

/// Field limits and heuristics thresholds.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Accepted request media types (default: application/json)
    pub require_content_type: Vec<String>,

    pub max_name_chars: usize,
    pub max_email_chars: usize,
    pub max_organization_chars: usize,
    pub max_interest_chars: usize,
    pub max_message_chars: usize,
    pub max_token_chars: usize,

    /// Minimum message length in characters (default: 20)
    pub min_message_chars: usize,

    /// Maximum URLs tolerated in a message (default: 3)
    pub max_message_urls: usize,
}

/// Outbound SMTP relay settings.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS (SMTPS); otherwise opportunistic STARTTLS
    pub secure: bool,
    pub user: Option<String>,
    pub pass: Option<String>,
    /// Recipient of contact messages (falls back to `user`)
    pub contact_to: Option<String>,
    pub from_name: String,
    pub timeout_secs: u64,
}

/// Turnstile verification settings.
#[derive(Clone)]
pub struct CaptchaConfig {
    pub secret: Option<String>,
    pub verify_url: String,
    pub timeout_secs: u64,
}

/// Translation dictionaries served to the browser.
#[derive(Debug, Clone)]
pub struct I18nConfig {
    pub dir: String,
    pub languages: Vec<String>,
    pub default_language: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_content_types() -> Vec<String> {
    vec!["application/json".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            trust_proxy_headers: false,
            cors_allow_origin: None,
            abuse: AbuseConfig::default(),
            validation: ValidationConfig::default(),
            smtp: SmtpConfig::default(),
            captcha: CaptchaConfig::default(),
            i18n: I18nConfig::default(),
        }
    }
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            rate_limit_max: 5,
            rate_window_secs: 60,
            bad_event_threshold: 8,
            bad_event_window_secs: 600,
            block_secs: 3600,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_content_type: default_content_types(),
            max_name_chars: 120,
            max_email_chars: 254,
            max_organization_chars: 200,
            max_interest_chars: 120,
            max_message_chars: 5000,
            max_token_chars: 2048,
            min_message_chars: 20,
            max_message_urls: 3,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            secure: true,
            user: None,
            pass: None,
            contact_to: None,
            from_name: "Website Contact Form".to_string(),
            timeout_secs: 20,
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret: None,
            verify_url: TURNSTILE_VERIFY_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            dir: "i18n".to_string(),
            languages: vec!["en".to_string(), "es".to_string()],
            default_language: "en".to_string(),
        }
    }
}

impl AbuseConfig {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn bad_event_window(&self) -> Duration {
        Duration::from_secs(self.bad_event_window_secs)
    }

    pub fn block_duration(&self) -> Duration {
        Duration::from_secs(self.block_secs)
    }
}

impl SmtpConfig {
    /// Username and password, when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.user.as_deref(), self.pass.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// Address contact messages are delivered to.
    pub fn recipient(&self) -> Option<&str> {
        self.contact_to.as_deref().or(self.user.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CaptchaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .field("contact_to", &self.contact_to)
            .field("from_name", &self.from_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for CaptchaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptchaConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("verify_url", &self.verify_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let defaults = Config::default();

        let abuse = AbuseConfig {
            rate_limit_max: env.parse("RATE_LIMIT_MAX")?.unwrap_or(defaults.abuse.rate_limit_max),
            rate_window_secs: env
                .parse("RATE_LIMIT_WINDOW_SECS")?
                .unwrap_or(defaults.abuse.rate_window_secs),
            bad_event_threshold: env
                .parse("BAD_EVENT_THRESHOLD")?
                .unwrap_or(defaults.abuse.bad_event_threshold),
            bad_event_window_secs: env
                .parse("BAD_EVENT_WINDOW_SECS")?
                .unwrap_or(defaults.abuse.bad_event_window_secs),
            block_secs: env.parse("BLOCK_SECS")?.unwrap_or(defaults.abuse.block_secs),
        };

        // Port and secure flag default from each other, as most relays pair
        // 465 with implicit TLS and 587 with STARTTLS.
        let secure_flag = env.first_flag(&["SMTP_SECURE", "MAIL_SECURE"])?;
        let port: Option<u16> = env.first_parse(&["SMTP_PORT", "MAIL_PORT"])?;
        let (port, secure) = match (port, secure_flag) {
            (Some(port), Some(secure)) => (port, secure),
            (Some(port), None) => (port, port == 465),
            (None, Some(true)) => (465, true),
            (None, Some(false)) => (587, false),
            (None, None) => (defaults.smtp.port, defaults.smtp.secure),
        };

        let smtp = SmtpConfig {
            host: env
                .first(&["SMTP_HOST", "MAIL_HOST"])
                .unwrap_or(defaults.smtp.host),
            port,
            secure,
            user: env.first(&["SMTP_USER", "SMTP_USERNAME", "MAIL_USER", "EMAIL_USER"]),
            pass: env.first(&["SMTP_PASS", "SMTP_PASSWORD", "MAIL_PASS", "EMAIL_PASS"]),
            contact_to: env.first(&["CONTACT_TO", "CONTACT_EMAIL", "MAIL_TO", "TO_EMAIL"]),
            from_name: env
                .first(&["CONTACT_FROM_NAME"])
                .unwrap_or(defaults.smtp.from_name),
            timeout_secs: env
                .parse("SMTP_TIMEOUT_SECS")?
                .unwrap_or(defaults.smtp.timeout_secs),
        };

        let verify_url = env
            .first(&["TURNSTILE_VERIFY_URL"])
            .unwrap_or(defaults.captcha.verify_url);
        if Url::parse(&verify_url).is_err() {
            return Err(ConfigError::InvalidUrl {
                var: "TURNSTILE_VERIFY_URL",
                value: verify_url,
            });
        }

        let captcha = CaptchaConfig {
            secret: env.first(&["TURNSTILE_SECRET_KEY", "TURNSTILE_SECRET", "CF_TURNSTILE_SECRET"]),
            verify_url,
            timeout_secs: env
                .parse("TURNSTILE_TIMEOUT_SECS")?
                .unwrap_or(defaults.captcha.timeout_secs),
        };

        let default_language = env
            .first(&["I18N_DEFAULT_LANG"])
            .map(|l| l.to_lowercase())
            .unwrap_or(defaults.i18n.default_language);
        let mut languages: Vec<String> = env
            .first(&["I18N_LANGUAGES"])
            .map(|list| {
                list.split(',')
                    .map(|l| l.trim().to_lowercase())
                    .filter(|l| !l.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.i18n.languages);
        if !languages.contains(&default_language) {
            languages.insert(0, default_language.clone());
        }

        let i18n = I18nConfig {
            dir: env.first(&["I18N_DIR"]).unwrap_or(defaults.i18n.dir),
            languages,
            default_language,
        };

        Ok(Config {
            bind_addr: env.first(&["BIND_ADDR"]).unwrap_or(defaults.bind_addr),
            trust_proxy_headers: env
                .first_flag(&["TRUST_PROXY_HEADERS"])?
                .unwrap_or(defaults.trust_proxy_headers),
            cors_allow_origin: env.first(&["CORS_ALLOW_ORIGIN"]).filter(|o| o != "*"),
            abuse,
            validation: defaults.validation,
            smtp,
            captcha,
            i18n,
        })
    }
}

/// Variable lookup with alias fallback. Empty values count as absent.
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn first(&self, names: &[&'static str]) -> Option<String> {
        names.iter().find_map(|name| self.get(name))
    }

    fn first_named(&self, names: &[&'static str]) -> Option<(&'static str, String)> {
        names
            .iter()
            .find_map(|name| self.get(name).map(|value| (*name, value)))
    }

    fn parse<T: std::str::FromStr>(&self, name: &'static str) -> Result<Option<T>, ConfigError> {
        self.first_parse(&[name])
    }

    fn first_parse<T: std::str::FromStr>(
        &self,
        names: &[&'static str],
    ) -> Result<Option<T>, ConfigError> {
        match self.first_named(names) {
            Some((var, value)) => value
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { var, value }),
            None => Ok(None),
        }
    }

    fn first_flag(&self, names: &[&'static str]) -> Result<Option<bool>, ConfigError> {
        match self.first_named(names) {
            Some((var, value)) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(ConfigError::InvalidValue { var, value }),
            },
            None => Ok(None),
        }
    }
}
