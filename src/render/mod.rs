// Render layer: turns the durable CSV table into charts and the README table.

pub mod counts;
pub mod delays;
pub mod links;

use crate::core::accumulate::CSV_FILE;
use crate::core::table::PrTable;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::{EtlError, Result};

pub(crate) fn chart_err<E: std::fmt::Display>(e: E) -> EtlError {
    EtlError::Chart {
        message: e.to_string(),
    }
}

/// Load the CSV table and filter it to the configured head-repo subset.
/// A missing table is an error: accumulate has to run first.
pub(crate) async fn load_filtered_table<S, C>(storage: &S, config: &C) -> Result<PrTable>
where
    S: Storage,
    C: ConfigProvider,
{
    let bytes = storage.read_file(CSV_FILE).await.map_err(|e| match e {
        EtlError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => EtlError::Processing {
            message: format!("CSV file '{}' not found - run accumulate first", CSV_FILE),
        },
        other => other,
    })?;
    let table = PrTable::from_csv(&bytes)?;
    Ok(table.filter_head_repo(config.filter_repo()))
}
