use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Server settings.
///
/// Read from `CSVGRID_HOST`, `CSVGRID_PORT`, `CSVGRID_MAX_UPLOAD_BYTES` and
/// `CSVGRID_TEMP_DIR`; positional `<host> <port>` arguments take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub temp_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(std::env::vars(), std::env::args().skip(1))
    }

    pub fn resolve<V, A>(vars: V, args: A) -> Result<Self, ConfigError>
    where
        V: IntoIterator<Item = (String, String)>,
        A: IntoIterator<Item = String>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let args: Vec<String> = args.into_iter().collect();
        let mut config = Config::default();

        if let Some(host) = args.first().or_else(|| vars.get("CSVGRID_HOST")) {
            config.host = host.clone();
        }
        if let Some(port) = args.get(1).or_else(|| vars.get("CSVGRID_PORT")) {
            config.port = parse_number("CSVGRID_PORT", port)?;
        }
        if let Some(limit) = vars.get("CSVGRID_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_number("CSVGRID_MAX_UPLOAD_BYTES", limit)?;
        }
        if let Some(dir) = vars.get("CSVGRID_TEMP_DIR") {
            config.temp_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}
