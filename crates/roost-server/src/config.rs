use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Which browser origins may call the API.
#[derive(Debug, PartialEq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub cors_origins: CorsOrigins,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("ROOST_JWT_SECRET").unwrap_or_else(|_| {
            warn!("ROOST_JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        Ok(Self {
            host: try_load("ROOST_HOST", "0.0.0.0")?,
            port: try_load("ROOST_PORT", "8001")?,
            db_path: try_load("ROOST_DB_PATH", "roost.db")?,
            jwt_secret,
            cors_origins: parse_origins(&try_load::<String>("ROOST_CORS_ORIGINS", "*")?),
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

fn parse_origins(raw: &str) -> CorsOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}
