pub mod analyzers;
pub mod chart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod report;
pub mod sheet;

pub use error::{AnalysisError, Result};
