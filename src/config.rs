use std::str::FromStr;

use serde::Deserialize;

/// Settings for verifying bearer tokens issued by the auth gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Which rows occupy an email address.
///
/// `Active`: only non-deleted users; a deactivated user's email can be
/// registered again. `AllTime`: an email stays taken once used, even after
/// the owner is deactivated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailUniqueness {
    #[default]
    Active,
    AllTime,
}

impl FromStr for EmailUniqueness {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "all_time" | "all-time" | "alltime" => Ok(Self::AllTime),
            other => anyhow::bail!("unknown EMAIL_UNIQUENESS value: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub skip_migrate: bool,
    pub email_uniqueness: EmailUniqueness,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);
        let skip_migrate = std::env::var("SKIP_MIGRATE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let email_uniqueness = match std::env::var("EMAIL_UNIQUENESS") {
            Ok(v) => v.parse()?,
            Err(_) => EmailUniqueness::default(),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "invoicer".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "invoicer-users".into()),
        };
        Ok(Self {
            database_url,
            max_connections,
            host,
            port,
            skip_migrate,
            email_uniqueness,
            jwt,
        })
    }
}
