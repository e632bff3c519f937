use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL of the backend-owned database. When unset
    /// (or unreachable) the service runs on the simulated dataset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of recommendations returned when a request omits top_n
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,

    /// Simulated dataset size: users
    #[serde(default = "default_simulated_users")]
    pub simulated_users: usize,

    /// Simulated dataset size: contents
    #[serde(default = "default_simulated_contents")]
    pub simulated_contents: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_top_n() -> usize {
    10
}

fn default_simulated_users() -> usize {
    100
}

fn default_simulated_contents() -> usize {
    50
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
