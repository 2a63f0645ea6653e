use std::env;

use super::constants::TOKEN_FILE_DEFAULT;

const API_URL_KEY: &str = "EXPENSIO_API_URL";
const WS_URL_KEY: &str = "EXPENSIO_WS_URL";
const TOKEN_FILE_KEY: &str = "EXPENSIO_TOKEN_FILE";

const API_URL_DEFAULT: &str = "http://localhost:5000/api";
const WS_URL_DEFAULT: &str = "ws://localhost:5000";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub ws_url: String,
    pub token_file: String,
}

impl Config {
    // Reads config from the environment, falling back to local defaults.
    pub fn from_env() -> Self {
        Self {
            api_url: try_load(API_URL_KEY, API_URL_DEFAULT),
            ws_url: try_load(WS_URL_KEY, WS_URL_DEFAULT),
            token_file: try_load(TOKEN_FILE_KEY, TOKEN_FILE_DEFAULT),
        }
    }
}

fn try_load(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_used_when_env_absent() {
        env::remove_var(API_URL_KEY);
        env::remove_var(WS_URL_KEY);
        env::remove_var(TOKEN_FILE_KEY);

        let config = Config::from_env();
        assert_eq!(config.api_url, API_URL_DEFAULT);
        assert_eq!(config.ws_url, WS_URL_DEFAULT);
        assert_eq!(config.token_file, TOKEN_FILE_DEFAULT);
    }
}
