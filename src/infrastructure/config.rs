use std::env;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::startup::StartupError;

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    /// Full connection string; takes precedence over the individual parts
    pub url: Option<SecretString>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: SecretString,
}

impl DatabaseSettings {
    /// Connection string for the configured database.
    pub fn connection_url(&self) -> Result<SecretString, StartupError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let invalid = |part: &str| StartupError::Config(format!("invalid database {}", part));

        let mut url = Url::parse("postgres://localhost")
            .map_err(|e| StartupError::Config(e.to_string()))?;
        url.set_host(Some(&self.host)).map_err(|_| invalid("host"))?;
        url.set_port(Some(self.port)).map_err(|_| invalid("port"))?;
        url.set_username(&self.user).map_err(|_| invalid("user"))?;
        let password = self.password.expose_secret();
        if !password.is_empty() {
            url.set_password(Some(password))
                .map_err(|_| invalid("password"))?;
        }
        url.set_path(&self.name);

        Ok(SecretString::new(url.to_string()))
    }
}

/// Retry policy of the wait-for-db step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    pub attempts: u32,
    pub interval: Duration,
    /// Upper bound on a single connection attempt
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            attempts: 60,
            interval: Duration::from_millis(1000),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub secret_key: SecretString,
    pub debug: bool,
    pub database: DatabaseSettings,
    pub port: u16,
    pub media_root: PathBuf,
    pub cors_allowed_origins: Vec<String>,
    pub wait: WaitPolicy,
    pub seed_demo: bool,
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment
    /// in production, a map in tests). Unparseable numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let defaults = WaitPolicy::default();

        Self {
            secret_key: SecretString::new(lookup("SECRET_KEY").unwrap_or_default()),
            debug: lookup("DEBUG").map(|v| truthy(&v)).unwrap_or(false),
            database: DatabaseSettings {
                url: lookup("DATABASE_URL")
                    .filter(|v| !v.trim().is_empty())
                    .map(SecretString::new),
                host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: number("DB_PORT")
                    .and_then(|p| u16::try_from(p).ok())
                    .unwrap_or(5432),
                name: lookup("DB_NAME").unwrap_or_else(|| "app".to_string()),
                user: lookup("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                password: SecretString::new(lookup("DB_PASS").unwrap_or_default()),
            },
            port: number("PORT")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(8000),
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            wait: WaitPolicy {
                attempts: number("DB_WAIT_ATTEMPTS")
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(defaults.attempts)
                    .max(1),
                interval: number("DB_WAIT_INTERVAL_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.interval),
                timeout: number("DB_WAIT_TIMEOUT_MS")
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.timeout),
            },
            seed_demo: lookup("SEED_DEMO").map(|v| truthy(&v)).unwrap_or(false),
        }
    }

    /// Default `RUST_LOG` directive when none is set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "school_registry=debug,tower_http=debug"
        } else {
            "school_registry=info,tower_http=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_container_ports() {
        let cfg = config(&[]);
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.database.port, 5432);
        assert!(!cfg.debug);
        assert_eq!(cfg.wait, WaitPolicy::default());
    }

    #[test]
    fn database_url_is_built_from_parts() {
        let cfg = config(&[
            ("DB_HOST", "db"),
            ("DB_NAME", "devdb"),
            ("DB_USER", "devuser"),
            ("DB_PASS", "p@ss/word"),
        ]);
        let url = cfg.database.connection_url().unwrap();
        assert_eq!(
            url.expose_secret(),
            "postgres://devuser:p%40ss%2Fword@db:5432/devdb"
        );
    }

    #[test]
    fn database_url_override_wins() {
        let cfg = config(&[("DATABASE_URL", "sqlite::memory:"), ("DB_HOST", "db")]);
        assert_eq!(
            cfg.database.connection_url().unwrap().expose_secret(),
            "sqlite::memory:"
        );
    }

    #[test]
    fn debug_and_wait_policy_are_parsed() {
        let cfg = config(&[
            ("DEBUG", "1"),
            ("DB_WAIT_ATTEMPTS", "0"),
            ("DB_WAIT_INTERVAL_MS", "250"),
            ("DB_WAIT_TIMEOUT_MS", "0"),
            ("PORT", "not-a-port"),
        ]);
        assert!(cfg.debug);
        assert_eq!(cfg.wait.attempts, 1);
        assert_eq!(cfg.wait.interval, Duration::from_millis(250));
        assert_eq!(cfg.wait.timeout, Duration::from_secs(5));
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.default_log_filter(), "school_registry=debug,tower_http=debug");
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let cfg = config(&[("SECRET_KEY", "changeme"), ("DB_PASS", "hunter2")]);
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("changeme"));
        assert!(!printed.contains("hunter2"));
    }
}
