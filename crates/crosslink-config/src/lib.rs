pub mod config;
pub mod dispatch;
pub mod error;
pub mod links;
pub mod templates;

pub use config::Config;
pub use dispatch::{DispatchConfig, DispatchMode};
pub use error::ConfigError;
pub use links::LinksConfig;
