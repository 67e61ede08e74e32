use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{CanonicalSample, Dataset};
use crate::data::column_detection::{DetectedColumns, detect_columns};
use crate::data::RawTable;
use crate::error::SegResult;

/// Options applied to the working copy of a table before detection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Positional replacement for every column name.
    #[serde(default)]
    pub column_names: Option<Vec<String>>,
}

/// A table turned into a dataset, plus how its columns were read.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedData {
    pub dataset: Dataset,
    pub columns: DetectedColumns,
    pub column_names: Vec<String>,
}

/// Runs detection over `table` and builds the canonical dataset.
///
/// Rows dropped by the detector never reach the dataset. Source rows are
/// carried with their original (un-renamed) keys so exports mirror the file.
pub fn build_dataset(table: &RawTable, options: &LoadOptions) -> SegResult<LoadedData> {
    let renamed;
    let working = match &options.column_names {
        Some(names) => {
            renamed = table.with_column_names(names)?;
            &renamed
        }
        None => table,
    };

    let mut numeric = working.numeric();
    let columns = detect_columns(&mut numeric);
    let canonical = columns.require_canonical()?;

    let samples: Vec<CanonicalSample> = numeric
        .row_ids()
        .iter()
        .enumerate()
        .map(|(i, &source)| CanonicalSample {
            x: numeric.value(canonical.x, i),
            y: numeric.value(canonical.y, i),
            z: canonical.z.map_or(0.0, |z| numeric.value(z, i)),
            pressure: numeric.value(canonical.pressure, i),
            time: numeric.value(canonical.time, i),
            row: table.rows()[source].clone(),
        })
        .collect();

    // The time key is looked up in source rows, so name it as the file does.
    let time_name = table.columns()[canonical.time].clone();

    let dataset = Dataset::from_samples(samples)?.with_time_column(time_name);
    debug!(
        samples = dataset.len(),
        source_rows = table.len(),
        "dataset built from table"
    );
    Ok(LoadedData {
        dataset,
        columns,
        column_names: working.columns().to_vec(),
    })
}
