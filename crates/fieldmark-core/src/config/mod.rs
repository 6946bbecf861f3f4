pub mod schema;

pub use schema::{FieldmarkConfig, LearningConfig, ObserveOptions, StoreConfig, WatcherConfig};
