pub mod app_config;
pub mod config;
pub mod listing;
pub mod run;

pub use app_config::{AppConfig, Environment, SchedulerSettings, ScraperSettings};
pub use config::{load_app_config, load_app_config_from_env};
pub use listing::BusinessRecord;
pub use run::{
    ErrorStage, ScrapeErrorEntry, ScrapeMeta, ScrapeRunAudit, ScrapeRunResult, TriggerSource,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
