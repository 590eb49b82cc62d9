//! Database connection settings.
//!
//! A Kingfisher database can be reached in three ways, checked in order:
//! 1. `database_url_env` - name of an environment variable holding the URL
//! 2. `database_url` - the URL itself
//! 3. Individual fields (host, port, database, username, password)

use serde::{Deserialize, Serialize};

/// Connection settings for the Kingfisher Postgres database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Environment variable containing the full connection URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,

    /// Full connection URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable containing the password. Wins over `password`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(default)]
    pub ssl_mode: SslMode,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            database_url_env: None,
            database_url: None,
            host: default_host(),
            port: default_port(),
            database: default_database(),
            username: default_username(),
            password: None,
            password_env: None,
            ssl_mode: SslMode::default(),
        }
    }
}

/// SSL mode passed through to the connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    Allow,
    #[default]
    Prefer,
    Require,
    #[serde(rename = "verify-ca")]
    VerifyCa,
    #[serde(rename = "verify-full")]
    VerifyFull,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }
}

impl UpstreamConfig {
    /// Build a connection config from the four arguments a notebook user
    /// types in: database, user, password and host. Port defaults to 5432.
    pub fn from_parts(
        database: impl Into<String>,
        username: impl Into<String>,
        password: Option<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            username: username.into(),
            password,
            host: host.into(),
            ..Default::default()
        }
    }

    /// Build a PostgreSQL connection string.
    pub fn connection_string(&self) -> String {
        if let Some(env_var) = &self.database_url_env
            && let Ok(url) = std::env::var(env_var)
        {
            return url;
        }

        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let credentials = match self.password() {
            Some(password) => format!("{}:{}", self.username, password),
            None => self.username.clone(),
        };
        let mut url = format!(
            "postgresql://{}@{}:{}/{}",
            credentials, self.host, self.port, self.database
        );
        if self.ssl_mode != SslMode::Prefer {
            url.push_str("?sslmode=");
            url.push_str(self.ssl_mode.as_str());
        }
        url
    }

    /// The connection target with any password removed, for log lines.
    pub fn redacted(&self) -> String {
        if self.database_url_env.is_some() || self.database_url.is_some() {
            let url = self.connection_string();
            return match (url.find("://"), url.rfind('@')) {
                (Some(scheme), Some(at)) if at > scheme => {
                    format!("{}://***{}", &url[..scheme], &url[at..])
                }
                _ => url,
            };
        }
        format!(
            "postgresql://{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }

    fn password(&self) -> Option<String> {
        if let Some(env_var) = &self.password_env
            && let Ok(password) = std::env::var(env_var)
        {
            return Some(password);
        }
        self.password.clone()
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_username() -> String {
    "postgres".to_string()
}
