pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod stock;
pub mod versions;

pub use error::{PipelineError, Result};
