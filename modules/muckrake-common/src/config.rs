use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Persistence (PocketBase)
    pub pocketbase_url: String,
    pub pocketbase_token: String,

    // AI provider
    pub anthropic_api_key: String,
    pub model: String,

    // Ingestion
    pub feed_url: String,
    pub max_items_per_run: usize,
    pub ingest_interval_minutes: u64,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Admin
    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            pocketbase_url: required_env("POCKETBASE_URL"),
            pocketbase_token: required_env("POCKETBASE_TOKEN"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            model: env::var("MUCKRAKE_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            feed_url: required_env("FEED_URL"),
            max_items_per_run: env::var("MAX_ITEMS_PER_RUN")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .expect("MAX_ITEMS_PER_RUN must be a number"),
            ingest_interval_minutes: env::var("INGEST_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .expect("INGEST_INTERVAL_MINUTES must be a number"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: required_env("ADMIN_PASSWORD"),
        }
    }

    /// Interval ingestion is opt-in; zero means disabled.
    pub fn scheduler_enabled(&self) -> bool {
        self.ingest_interval_minutes > 0
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
