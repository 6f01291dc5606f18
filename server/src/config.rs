//! Configuration loaded from environment variables.
//!
//! Required keys are validated together; a failure names every missing or
//! invalid key at once.

use reqwest::Url;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Keys that are missing or fail validation, in declaration order.
    #[error("Missing required environment variables: {}", keys.join(", "))]
    Invalid {
        /// Offending keys.
        keys: Vec<String>,
    },
}

/// Deployment environment (`APP_ENV`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Local development.
    Development,
    /// Test runs.
    Test,
    /// Production.
    Production,
}

impl Environment {
    /// Whether this is `development`.
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Whether this is `production`.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Whether this is `test`.
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        })
    }
}

/// Hosted database and auth service.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Base URL
    pub url: String,
    /// Public API key
    pub anon_key: String,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[redacted]")
            .finish()
    }
}

/// Request rate limiting.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Redis endpoint
    pub redis_url: String,
    /// Redis credential
    pub redis_token: String,
    /// Requests allowed per window
    pub requests: u32,
    /// Sliding window length
    pub window: Duration,
}

impl fmt::Debug for RateLimitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("redis_url", &self.redis_url)
            .field("redis_token", &"[redacted]")
            .field("requests", &self.requests)
            .field("window", &self.window)
            .finish()
    }
}

/// HTTP listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

impl ServerConfig {
    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment
    pub environment: Environment,
    /// Database and auth service
    pub supabase: SupabaseConfig,
    /// Rate limiter
    pub rate_limit: RateLimitConfig,
    /// HTTP listener
    pub server: ServerConfig,
    /// Key the rate limiter by `X-Forwarded-For`/`X-Real-IP`; only behind a
    /// proxy that overwrites them
    pub trust_proxy_headers: bool,
}

impl Config {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming every missing or invalid key.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through `lookup`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming every missing or invalid key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = Reader {
            lookup,
            invalid: Vec::new(),
        };

        let environment = reader.required_with("APP_ENV", |v| v.parse::<Environment>().ok());
        let supabase_url = reader.required_with("SUPABASE_URL", parse_url);
        let anon_key = reader.required("SUPABASE_ANON_KEY");
        let redis_url = reader.required_with("RATE_LIMIT_REDIS_URL", parse_redis_url);
        let redis_token = reader.required("RATE_LIMIT_REDIS_TOKEN");

        let host = reader.optional("HOST", |v| Some(v.to_string()), || "0.0.0.0".to_string());
        let port = reader.optional("PORT", |v| v.parse::<u16>().ok(), || 3000);
        let requests = reader.optional("RATE_LIMIT_REQUESTS", |v| v.parse::<u32>().ok(), || 10);
        let window_secs = reader.optional("RATE_LIMIT_WINDOW_SECS", |v| v.parse::<u64>().ok(), || 10);
        let trust_proxy_headers =
            reader.optional("TRUST_PROXY_HEADERS", |v| v.parse::<bool>().ok(), || false);

        match (environment, supabase_url, anon_key, redis_url, redis_token) {
            (Some(environment), Some(url), Some(anon_key), Some(redis_url), Some(redis_token))
                if reader.invalid.is_empty() =>
            {
                Ok(Self {
                    environment,
                    supabase: SupabaseConfig { url, anon_key },
                    rate_limit: RateLimitConfig {
                        redis_url,
                        redis_token,
                        requests,
                        window: Duration::from_secs(window_secs),
                    },
                    server: ServerConfig { host, port },
                    trust_proxy_headers,
                })
            },
            _ => Err(ConfigError::Invalid {
                keys: reader.invalid,
            }),
        }
    }
}

struct Reader<F> {
    lookup: F,
    invalid: Vec<String>,
}

impl<F> Reader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&mut self, key: &str) -> Option<String> {
        self.required_with(key, |v| Some(v.to_string()))
    }

    fn required_with<T>(&mut self, key: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let value = (self.lookup)(key).and_then(|v| parse(&v));
        if value.is_none() {
            self.invalid.push(key.to_string());
        }
        value
    }

    fn optional<T>(
        &mut self,
        key: &str,
        parse: impl FnOnce(&str) -> Option<T>,
        default: impl FnOnce() -> T,
    ) -> T {
        match (self.lookup)(key) {
            None => default(),
            Some(raw) => parse(&raw).unwrap_or_else(|| {
                self.invalid.push(key.to_string());
                default()
            }),
        }
    }
}

fn parse_url(value: &str) -> Option<String> {
    Url::parse(value).ok().map(|_| value.to_string())
}

/// The limiter speaks the Redis protocol, not a REST gateway.
fn parse_redis_url(value: &str) -> Option<String> {
    Url::parse(value)
        .ok()
        .filter(|url| matches!(url.scheme(), "redis" | "rediss"))
        .map(|_| value.to_string())
}
