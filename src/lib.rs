pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod render;
pub mod utils;

pub use adapters::storage::LocalStorage;
pub use config::{Cli, CliConfig, Command};
pub use core::{accumulate::AccumulatePipeline, etl::EtlEngine};
pub use utils::error::{EtlError, Result};
