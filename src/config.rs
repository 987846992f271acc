use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::toggle::IconScope;

#[derive(Parser, Debug)]
#[command(name = "blogmark")]
#[command(about = "Runs the blogmark service and its bookmark toggle client", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the blog (default)
    Serve,
    /// Create an account that can log in and bookmark posts
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        password: String,
    },
    /// Click a single bookmark button against a running server
    Toggle {
        /// Value of the button's data-url attribute
        #[arg(long)]
        url: Option<String>,
        /// Value of the button's data-pk attribute
        #[arg(long)]
        pk: Option<String>,
        /// Value of the page's csrfmiddlewaretoken input
        #[arg(long)]
        csrf: Option<String>,
        /// Session key sent as the sessionid cookie
        #[arg(long)]
        session: Option<String>,
        #[arg(long, value_enum)]
        scope: Option<IconScope>,
    },
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".blogmark")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    database: String,
    port: i32,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
    #[serde(default)]
    pub turso_url: Option<String>,
    #[serde(default)]
    pub turso_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

fn default_session_ttl() -> i64 {
    24 * 14
}

fn default_sync_interval() -> u64 {
    60
}

impl Default for App {
    fn default() -> Self {
        App {
            database: "blogmark.db".to_string(),
            port: 8000,
            session_ttl_hours: default_session_ttl(),
            turso_url: None,
            turso_auth_token: None,
            sync_interval_seconds: default_sync_interval(),
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> i32 {
        self.port
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Client {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub icon_scope: IconScope,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub session: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for Client {
    fn default() -> Self {
        Client {
            base_url: default_base_url(),
            icon_scope: IconScope::default(),
            timeout_seconds: None,
            session: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub client: Client,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    /// Loads the config file when it exists and falls back to defaults otherwise.
    pub fn new_or_default(path: &str) -> Result<Self> {
        if fs::metadata(path).is_err() {
            tracing::warn!(path, "config file not found, using defaults");
            return Ok(Config::default());
        }
        Config::new(path)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::parse(&yaml_str)
    }

    pub fn parse(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find('}') {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!(var = var_name, "environment variable not found");
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}
