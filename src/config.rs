use std::{env, net::SocketAddr};

use thiserror::Error;

pub const DEFAULT_TFL_BASE_URL: &str = "https://api.tfl.gov.uk";

#[derive(Debug, Clone)]
pub struct Config {
    pub tfl_api_key: String,
    pub tfl_base_url: String,
    pub api_token: Option<String>,
    pub bind_addr: String,
    pub bind_port: u16,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TFL_API_KEY is required and must not be empty")]
    MissingApiKey,
    #[error("TFL_BASE_URL must be an absolute http(s) URL")]
    InvalidBaseUrl,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let tfl_api_key = env::var("TFL_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let tfl_base_url = env::var("TFL_BASE_URL")
            .ok()
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_TFL_BASE_URL.to_string());
        if !tfl_base_url.starts_with("http://") && !tfl_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl);
        }

        // When unset the /mcp endpoint is served without bearer auth.
        let api_token = env::var("MCP_API_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let bind_port = env::var("BIND_PORT")
            .ok()
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8000);

        let config = Self {
            tfl_api_key,
            tfl_base_url,
            api_token,
            bind_addr,
            bind_port,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        env::set_var("TFL_API_KEY", "abc");
        env::remove_var("TFL_BASE_URL");
        env::remove_var("MCP_API_TOKEN");
        env::remove_var("BIND_ADDR");
        env::remove_var("BIND_PORT");

        let config = Config::from_env().expect("config should parse");
        assert_eq!(config.tfl_base_url, DEFAULT_TFL_BASE_URL);
        assert_eq!(config.api_token, None);
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.bind_port, 8000);
    }

    #[test]
    fn missing_api_key_fails() {
        env::remove_var("TFL_API_KEY");

        let err = Config::from_env().expect_err("expected missing key error");
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        env::set_var("TFL_API_KEY", "abc");
        env::set_var("TFL_BASE_URL", "https://api.example.test/");

        let config = Config::from_env().expect("config should parse");
        assert_eq!(config.tfl_base_url, "https://api.example.test");
        env::remove_var("TFL_BASE_URL");
    }

    #[test]
    fn invalid_base_url_fails() {
        env::set_var("TFL_API_KEY", "abc");
        env::set_var("TFL_BASE_URL", "not-a-url");

        let err = Config::from_env().expect_err("expected invalid base url error");
        assert!(matches!(err, ConfigError::InvalidBaseUrl));
        env::remove_var("TFL_BASE_URL");
    }
}
