pub mod analyzer;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod template;
pub mod ui;

pub use analyzer::{AnalysisResult, Analyzer};
pub use config::Config;
pub use error::{FlexVersionError, Result};
