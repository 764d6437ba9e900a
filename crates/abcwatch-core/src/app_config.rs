#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub bot_token: String,
    pub telegram_api_base: String,
    pub search_url: String,
    pub store_locator_url: String,
    pub check_interval_minutes: u64,
    pub inter_keyword_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_results: usize,
    pub city_cache_ttl_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("bot_token", &"[redacted]")
            .field("telegram_api_base", &self.telegram_api_base)
            .field("search_url", &self.search_url)
            .field("store_locator_url", &self.store_locator_url)
            .field("check_interval_minutes", &self.check_interval_minutes)
            .field("inter_keyword_delay_ms", &self.inter_keyword_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_results", &self.max_results)
            .field("city_cache_ttl_secs", &self.city_cache_ttl_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
