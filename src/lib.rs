pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod fetch;
pub mod model;
pub mod pipeline;
pub mod transform;

pub use config::Config;
pub use error::EtlError;
pub use model::{RateRecord, RawResponse};
pub use pipeline::{Pipeline, RunOutcome, RunSummary, Stage};
