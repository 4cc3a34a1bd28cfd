pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod platform;
pub mod progress;
pub mod rules;
pub mod scanner;
pub mod storage;

pub use config::AppConfig;
pub use engine::ArchiveEngine;
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
