use anyhow::{Context, Result, bail};

use crate::store::MysqlConfig;

/// Process-wide configuration, read once from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub mysql: MysqlConfig,
    pub ai_query_api_url: Option<String>,
    pub log_level: String,
    pub port: u16,
}

impl Config {
    /// Build a [`Config`] from environment variables.
    ///
    /// The `DB_*_PYTHON` group is all-or-nothing: if any one of them is set
    /// the rest are required, matching the original service's startup check.
    pub fn from_env() -> Result<Self> {
        let mysql = MysqlConfig::from_env().context("failed to load database configuration")?;
        let ai_query_api_url = std::env::var("V50MCP_AI_QUERY_API_URL").ok();
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
        let port = std::env::var("PORT")
            .ok()
            .map(|raw| raw.parse::<u16>())
            .transpose()
            .context("PORT must be a valid port number")?
            .unwrap_or(5001);
        Ok(Self {
            mysql,
            ai_query_api_url,
            log_level,
            port,
        })
    }
}

impl MysqlConfig {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("DB_HOST_PYTHON").ok();
        let user = std::env::var("DB_USER_PYTHON").ok();
        let password = std::env::var("DB_PASSWORD_PYTHON").ok();
        let name = std::env::var("DB_NAME_PYTHON").ok();
        let port = std::env::var("DB_PORT_PYTHON").ok();

        let present = [&host, &user, &password, &name, &port]
            .iter()
            .filter(|v| v.is_some())
            .count();
        if present == 0 {
            bail!(
                "none of DB_HOST_PYTHON, DB_USER_PYTHON, DB_PASSWORD_PYTHON, DB_NAME_PYTHON, DB_PORT_PYTHON are set"
            );
        }
        if present < 5 {
            bail!(
                "DB_HOST_PYTHON, DB_USER_PYTHON, DB_PASSWORD_PYTHON, DB_NAME_PYTHON and DB_PORT_PYTHON must all be set together"
            );
        }
        let port: u16 = port
            .unwrap()
            .parse()
            .context("DB_PORT_PYTHON must be a valid port number")?;
        Ok(Self {
            host: host.unwrap(),
            user: user.unwrap(),
            password: password.unwrap(),
            database: name.unwrap(),
            port,
        })
    }
}
