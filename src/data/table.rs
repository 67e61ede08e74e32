use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{SegError, SegResult};

/// One source record: column name to JSON value, in source column order.
pub type RawRow = IndexMap<String, Value>;

/// Rows of a loaded file plus their column names.
///
/// The table is kept verbatim for export; detection works on a
/// [`NumericTable`] view derived from it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<RawRow>,
}

impl RawTable {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { columns, rows }
    }

    /// Takes the column list from the first row's keys.
    pub fn from_rows(rows: Vec<RawRow>) -> SegResult<Self> {
        let first = rows.first().ok_or(SegError::EmptyData)?;
        let columns = first.keys().cloned().collect();
        Ok(Self { columns, rows })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy of the table with every column renamed positionally.
    ///
    /// The override must name every column; otherwise it is rejected.
    pub fn with_column_names(&self, names: &[String]) -> SegResult<Self> {
        if names.len() != self.columns.len() {
            return Err(SegError::InvalidData(format!(
                "column override has {} names but the data has {} columns",
                names.len(),
                self.columns.len()
            )));
        }
        let rows = self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(names)
                    .map(|(old, new)| (new.clone(), row.get(old).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect();
        Ok(Self {
            columns: names.to_vec(),
            rows,
        })
    }

    /// Column-major numeric view; unparsable cells become `NaN`.
    #[must_use]
    pub fn numeric(&self) -> NumericTable {
        let columns = self
            .columns
            .iter()
            .map(|name| {
                self.rows
                    .iter()
                    .map(|row| row.get(name).map_or(f64::NAN, coerce_f64))
                    .collect()
            })
            .collect();
        NumericTable {
            names: self.columns.clone(),
            columns,
            row_ids: (0..self.rows.len()).collect(),
        }
    }
}

/// Numbers pass through, numeric strings are parsed, everything else is `NaN`.
#[must_use]
pub fn coerce_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Column-major `f64` matrix with a mapping back to source row indices.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTable {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    row_ids: Vec<usize>,
}

impl NumericTable {
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    /// Source row index for every retained row.
    #[must_use]
    pub fn row_ids(&self) -> &[usize] {
        &self.row_ids
    }

    #[must_use]
    pub fn value(&self, column: usize, row: usize) -> f64 {
        self.columns[column][row]
    }

    /// Keeps rows whose position satisfies `keep`.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(usize) -> bool) {
        let mask: Vec<bool> = (0..self.n_rows()).map(&mut keep).collect();
        for column in &mut self.columns {
            let mut i = 0;
            column.retain(|_| {
                let k = mask[i];
                i += 1;
                k
            });
        }
        let mut i = 0;
        self.row_ids.retain(|_| {
            let k = mask[i];
            i += 1;
            k
        });
    }
}
