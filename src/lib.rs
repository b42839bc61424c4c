pub mod cache;
pub mod chart;
pub mod chart_data;
pub mod chart_export;
pub mod cli;
pub mod compress;
pub mod config;
pub mod exec;
pub mod extract;
pub mod llm;
pub mod prompt;
pub mod session;
pub mod store;

pub use cache::CacheManager;
pub use chart::{ChartSpec, ChartType};
pub use chart_export::DEFAULT_CHART_SIZE;
pub use cli::Args;
pub use compress::CompressionFormat;
pub use config::{AppConfig, ConfigManager, LlmConfig};
pub use exec::QueryOutcome;
pub use llm::CompletionClient;
pub use session::{Answer, ChartAnswer, Session};
pub use store::{LoadOptions, TabularStore, TABLE_NAME};

/// Application name used for config and cache directories
pub const APP_NAME: &str = "askdata";
