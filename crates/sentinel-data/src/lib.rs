//! Data sources and persistence.

mod csv_source;
mod replay;
mod store;

pub use csv_source::{write_csv, CsvBarSource};
pub use replay::ReplayFeed;
pub use store::JsonlStore;

use sentinel_core::error::DataError;
use sentinel_core::types::Bar;
use std::path::Path;

/// Load bars from a CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    CsvBarSource::open(path)?.load()
}
