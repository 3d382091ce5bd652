use std::str::FromStr;

use anyhow::{bail, Context};
use clap::ValueEnum;
use sqlx::postgres::PgConnectOptions;

pub const DATABASE_NAME: &str = "evaluacion_docente";

const PROD_DASHBOARD_URL: &str = "https://application.colmayor.edu.co/evaluacion_docente/dashboard";
const LOCAL_DASHBOARD_URL: &str = "http://localhost/evaluacion_docente/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Local,
}

/// How a survey table is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReplaceStrategy {
    /// Lock, truncate and insert inside one transaction; failures roll back.
    #[default]
    Atomic,
    /// Commit the truncate first, then insert and commit once at the end.
    /// A failed insert leaves the table empty.
    TruncateFirst,
}

#[derive(Debug, Clone)]
pub enum StoreTarget {
    Url(String),
    Server {
        host: String,
        port: u16,
        user: String,
        password: String,
    },
}

/// Everything needed to reach the store and build redirects. Built once at
/// startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub environment: Environment,
    pub target: StoreTarget,
    pub database: String,
    pub dashboard_base_url: String,
    pub strategy: ReplaceStrategy,
}

impl StoreConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let environment = match lookup("ENV").as_deref() {
            Some("PROD") => Environment::Production,
            _ => Environment::Local,
        };

        let target = if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
            StoreTarget::Url(url)
        } else {
            match environment {
                Environment::Production => StoreTarget::Server {
                    host: lookup("DDBB_HOST").context("DDBB_HOST must be set when ENV=PROD")?,
                    port: parse_port(lookup("DDBB_PORT"))?,
                    user: lookup("DDBB_USER").context("DDBB_USER must be set when ENV=PROD")?,
                    password: lookup("DDBB_PASSWORD")
                        .context("DDBB_PASSWORD must be set when ENV=PROD")?,
                },
                Environment::Local => StoreTarget::Server {
                    host: "localhost".to_string(),
                    port: parse_port(lookup("DDBB_PORT"))?,
                    user: "root".to_string(),
                    password: String::new(),
                },
            }
        };

        let dashboard_base_url = lookup("DASHBOARD_BASE_URL").unwrap_or_else(|| {
            match environment {
                Environment::Production => PROD_DASHBOARD_URL,
                Environment::Local => LOCAL_DASHBOARD_URL,
            }
            .to_string()
        });

        let strategy = match lookup("REPLACE_STRATEGY") {
            Some(value) => match <ReplaceStrategy as ValueEnum>::from_str(&value, true) {
                Ok(strategy) => strategy,
                Err(_) => bail!("unknown REPLACE_STRATEGY '{value}'"),
            },
            None => ReplaceStrategy::default(),
        };

        Ok(Self {
            environment,
            target,
            database: DATABASE_NAME.to_string(),
            dashboard_base_url,
            strategy,
        })
    }

    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        let options = match &self.target {
            StoreTarget::Url(url) => {
                PgConnectOptions::from_str(url).context("DATABASE_URL is not a valid Postgres URL")?
            }
            StoreTarget::Server {
                host,
                port,
                user,
                password,
            } => PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password),
        };
        Ok(options.database(&self.database))
    }

    /// Host shown in logs; never includes credentials.
    pub fn display_host(&self) -> String {
        match &self.target {
            StoreTarget::Url(_) => "DATABASE_URL".to_string(),
            StoreTarget::Server { host, port, .. } => format!("{host}:{port}"),
        }
    }
}

fn parse_port(value: Option<String>) -> anyhow::Result<u16> {
    match value {
        Some(port) => port
            .parse()
            .with_context(|| format!("DDBB_PORT '{port}' is not a valid port")),
        None => Ok(5432),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<StoreConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_local_store() {
        let config = config(&[]).unwrap();
        assert_eq!(config.environment, Environment::Local);
        assert_eq!(config.database, "evaluacion_docente");
        assert_eq!(config.strategy, ReplaceStrategy::Atomic);
        assert_eq!(config.dashboard_base_url, LOCAL_DASHBOARD_URL);
        match config.target {
            StoreTarget::Server {
                host,
                user,
                password,
                ..
            } => {
                assert_eq!(host, "localhost");
                assert_eq!(user, "root");
                assert!(password.is_empty());
            }
            StoreTarget::Url(_) => panic!("expected server target"),
        }
    }

    #[test]
    fn production_reads_credentials() {
        let config = config(&[
            ("ENV", "PROD"),
            ("DDBB_HOST", "db.internal"),
            ("DDBB_USER", "loader"),
            ("DDBB_PASSWORD", "secret"),
            ("DDBB_PORT", "6543"),
        ])
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.dashboard_base_url, PROD_DASHBOARD_URL);
        assert_eq!(config.display_host(), "db.internal:6543");
    }

    #[test]
    fn production_without_host_fails() {
        let err = config(&[("ENV", "PROD"), ("DDBB_USER", "u"), ("DDBB_PASSWORD", "p")])
            .unwrap_err();
        assert!(err.to_string().contains("DDBB_HOST"));
    }

    #[test]
    fn database_url_takes_precedence() {
        let config = config(&[
            ("ENV", "PROD"),
            ("DATABASE_URL", "postgres://u:p@db/other"),
        ])
        .unwrap();
        assert!(matches!(config.target, StoreTarget::Url(_)));
        assert_eq!(config.display_host(), "DATABASE_URL");
    }

    #[test]
    fn strategy_is_configurable() {
        let truncate_first = config(&[("REPLACE_STRATEGY", "truncate-first")]).unwrap();
        assert_eq!(truncate_first.strategy, ReplaceStrategy::TruncateFirst);
        assert!(config(&[("REPLACE_STRATEGY", "merge")]).is_err());
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(config(&[("DDBB_PORT", "abc")]).is_err());
    }
}
