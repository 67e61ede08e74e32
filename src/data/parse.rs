use std::path::Path;

use serde_json::{Number, Value};
use tracing::debug;

use crate::data::{RawRow, RawTable};
use crate::error::{SegError, SegResult};

/// Field separator inferred from the first non-blank line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
    Whitespace,
}

impl Delimiter {
    #[must_use]
    pub fn detect(line: &str) -> Self {
        if line.contains(',') {
            Self::Comma
        } else if line.contains('\t') {
            Self::Tab
        } else {
            Self::Whitespace
        }
    }
}

/// Parses a loaded file into rows.
///
/// `.json` files must hold an array of flat objects. Anything else is read as
/// delimited text: a header row is assumed unless every cell of the first
/// line is numeric, in which case columns are named `V1..Vn`.
pub fn parse_text(raw_text: &str, file_name: &str) -> SegResult<RawTable> {
    let is_json = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let rows: Vec<RawRow> = serde_json::from_str(raw_text)?;
        return RawTable::from_rows(rows);
    }
    parse_delimited(raw_text)
}

pub fn parse_delimited(raw_text: &str) -> SegResult<RawTable> {
    let lines: Vec<&str> = raw_text
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    let Some(first_line) = lines.first() else {
        return Err(SegError::EmptyData);
    };

    let delimiter = Delimiter::detect(first_line);
    let records = split_records(&lines, delimiter)?;
    let Some(first) = records.first() else {
        return Err(SegError::EmptyData);
    };

    let has_header = !first.iter().all(|cell| is_numeric(cell));
    let (header, body) = if has_header {
        (first.clone(), &records[1..])
    } else {
        let names = (1..=first.len()).map(|i| format!("V{i}")).collect();
        (names, &records[..])
    };

    let rows: Vec<RawRow> = body
        .iter()
        .map(|record| {
            header
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), record.get(i).map_or(Value::Null, |c| cell(c))))
                .collect()
        })
        .collect();

    debug!(
        columns = header.len(),
        rows = rows.len(),
        has_header,
        ?delimiter,
        "parsed delimited text"
    );
    Ok(RawTable::new(header, rows))
}

fn split_records(lines: &[&str], delimiter: Delimiter) -> SegResult<Vec<Vec<String>>> {
    let byte = match delimiter {
        Delimiter::Comma => b',',
        Delimiter::Tab => b'\t',
        Delimiter::Whitespace => {
            return Ok(lines
                .iter()
                .map(|line| line.split_whitespace().map(str::to_owned).collect())
                .collect());
        }
    };

    let joined = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(byte)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(joined.as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_owned).collect())
                .map_err(|e| SegError::InvalidData(format!("malformed delimited row: {e}")))
        })
        .collect()
}

fn is_numeric(cell: &str) -> bool {
    let trimmed = cell.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

/// Keeps a cell as a JSON number only when that number prints back as the
/// same text; anything else (`007`, `1e3`, labels) stays a string and is
/// coerced later by the numeric view.
fn cell(text: &str) -> Value {
    let trimmed = text.trim();
    let number = trimmed
        .parse::<i64>()
        .ok()
        .map(Number::from)
        .or_else(|| trimmed.parse::<f64>().ok().and_then(Number::from_f64))
        .filter(|n| n.to_string() == trimmed);
    match number {
        Some(n) => Value::Number(n),
        None => Value::String(trimmed.to_owned()),
    }
}
