pub mod loader;

pub use fieldmark_core::config::schema;
pub use loader::{ConfigError, ConfigLoader};
