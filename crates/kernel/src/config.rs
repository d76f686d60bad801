//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Redis connection URL for the session store.
    pub redis_url: String,

    /// Directory where feature images are written (default: ./uploads).
    pub uploads_dir: PathBuf,

    /// Base URL under which uploaded files are published (default: /media).
    pub files_url: String,

    /// Optional directory of Tera templates overriding the built-in set.
    pub templates_dir: Option<PathBuf>,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "lax").
    pub cookie_same_site: String,

    /// Send the session cookie only over HTTPS (default: true).
    pub cookie_secure: bool,

    /// Site name shown in page titles and the header.
    pub site_name: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let files_url = env::var("FILES_URL").unwrap_or_else(|_| "/media".to_string());

        let templates_dir = env::var("TEMPLATES_DIR").ok().map(PathBuf::from);

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "lax".to_string())
            .to_lowercase();

        let cookie_secure = parse_bool(&env::var("COOKIE_SECURE").unwrap_or_default(), true);

        let site_name = env::var("SITE_NAME").unwrap_or_else(|_| "Scriba".to_string());

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            redis_url,
            uploads_dir,
            files_url,
            templates_dir,
            cookie_same_site,
            cookie_secure,
            site_name,
        })
    }
}

/// Parse a boolean-ish environment value, falling back to `default` when unset or unrecognised.
fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_bool;

    #[test]
    fn parse_bool_recognises_common_spellings() {
        assert!(parse_bool("TRUE", false));
        assert!(parse_bool("1", false));
        assert!(!parse_bool("off", true));
        assert!(!parse_bool("no", true));
    }

    #[test]
    fn parse_bool_falls_back_to_default() {
        assert!(parse_bool("", true));
        assert!(!parse_bool("maybe", false));
    }
}
