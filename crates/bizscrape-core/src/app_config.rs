use std::net::SocketAddr;
use std::time::Duration;

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

pub const DEFAULT_USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];

pub const DEFAULT_JUNK_TITLE_KEYWORDS: [&str; 11] = [
    "contact", "privacy", "terms", "login", "register", "sitemap", "cookie", "about", "support",
    "export", "news",
];

pub const DEFAULT_JUNK_URL_KEYWORDS: [&str; 12] = [
    "contact",
    "privacy",
    "terms",
    "login",
    "register",
    "sitemap",
    "cookie",
    "about",
    "support",
    "export",
    "newsletter",
    "blog",
];

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_max_concurrency: usize,
    pub fetch_timeout_ms: u64,
    pub fetch_max_attempts: u32,
    pub fetch_backoff_base_ms: u64,
    pub host_min_interval_ms: u64,
    pub session_timeout_secs: u64,
    pub request_max_urls: usize,
    pub user_agents: Vec<String>,
    pub junk_title_keywords: Vec<String>,
    pub junk_url_keywords: Vec<String>,
    pub min_title_words: usize,
    pub scheduler_enabled: bool,
    pub scheduler_interval_hours: f64,
    pub seed_urls: Vec<String>,
}

impl AppConfig {
    /// Projects the settings consumed by the fetch/extract/dedup pipeline.
    #[must_use]
    pub fn scraper_settings(&self) -> ScraperSettings {
        ScraperSettings {
            max_concurrency: self.fetch_max_concurrency.max(1),
            request_timeout: Duration::from_millis(self.fetch_timeout_ms),
            max_attempts: self.fetch_max_attempts.max(1),
            backoff_base: Duration::from_millis(self.fetch_backoff_base_ms),
            host_min_interval: Duration::from_millis(self.host_min_interval_ms),
            session_timeout: (self.session_timeout_secs > 0)
                .then(|| Duration::from_secs(self.session_timeout_secs)),
            request_max_urls: self.request_max_urls,
            user_agents: self.user_agents.clone(),
            junk_title_keywords: self.junk_title_keywords.clone(),
            junk_url_keywords: self.junk_url_keywords.clone(),
            min_title_words: self.min_title_words,
        }
    }

    /// Projects the scheduler settings. Scheduling is always off in the
    /// `test` environment.
    #[must_use]
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        let hours = self.scheduler_interval_hours.max(0.1);
        SchedulerSettings {
            enabled: self.scheduler_enabled && self.env != Environment::Test,
            interval: Duration::from_secs_f64(hours * 3600.0),
            seed_urls: self.seed_urls.clone(),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_max_concurrency", &self.fetch_max_concurrency)
            .field("fetch_timeout_ms", &self.fetch_timeout_ms)
            .field("fetch_max_attempts", &self.fetch_max_attempts)
            .field("fetch_backoff_base_ms", &self.fetch_backoff_base_ms)
            .field("host_min_interval_ms", &self.host_min_interval_ms)
            .field("session_timeout_secs", &self.session_timeout_secs)
            .field("request_max_urls", &self.request_max_urls)
            .field("user_agents", &self.user_agents.len())
            .field("junk_title_keywords", &self.junk_title_keywords)
            .field("junk_url_keywords", &self.junk_url_keywords)
            .field("min_title_words", &self.min_title_words)
            .field("scheduler_enabled", &self.scheduler_enabled)
            .field("scheduler_interval_hours", &self.scheduler_interval_hours)
            .field("seed_urls", &self.seed_urls)
            .finish()
    }
}

/// Immutable settings for one scraper pipeline instance.
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// Hard ceiling on in-flight fetches; a request may only lower it.
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    /// Total attempts per URL, including the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub host_min_interval: Duration,
    pub session_timeout: Option<Duration>,
    pub request_max_urls: usize,
    pub user_agents: Vec<String>,
    pub junk_title_keywords: Vec<String>,
    pub junk_url_keywords: Vec<String>,
    pub min_title_words: usize,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            request_timeout: Duration::from_secs(20),
            max_attempts: 3,
            backoff_base: Duration::from_millis(750),
            host_min_interval: Duration::from_millis(250),
            session_timeout: None,
            request_max_urls: 50,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| (*s).to_string()).collect(),
            junk_title_keywords: DEFAULT_JUNK_TITLE_KEYWORDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            junk_url_keywords: DEFAULT_JUNK_URL_KEYWORDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            min_title_words: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub seed_urls: Vec<String>,
}
