use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub amadeus: AmadeusConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AmadeusConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_flex_days")]
    pub flex_days: i64,
    #[serde(default = "default_origin")]
    pub default_origin: String,
    #[serde(default = "default_destination")]
    pub default_destination: String,
}

fn default_base_url() -> String {
    "https://test.api.amadeus.com".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_max_results() -> u32 {
    50
}

fn default_flex_days() -> i64 {
    1
}

fn default_origin() -> String {
    "CLT".to_string()
}

fn default_destination() -> String {
    "DXB".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of FAREWATCH)
            // Eg.. `FAREWATCH__SERVER__PORT=8080` would set the server port
            .add_source(config::Environment::with_prefix("FAREWATCH").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
