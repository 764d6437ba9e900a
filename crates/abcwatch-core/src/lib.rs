use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod diff;
pub mod inventory;
pub mod locations;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use diff::{decide, ChangeDecision, Snapshot};
pub use inventory::InventoryRecord;
pub use locations::{classify, total_stock, LocationInfo};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
