pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod hasher;
pub mod platform;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod storage;
pub mod timestamp;

pub use config::AppConfig;
pub use engine::{Pipeline, RunSummary};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
