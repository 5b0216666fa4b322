use crate::error::{RecordsError, Result};
use layout_protocol::{NodeKind, PositionRecord};
use std::path::Path;

/// `name,type,parentPath,x,y[,width[,height]]`
const EXTENDED_MIN_COLUMNS: usize = 5;
/// `name,x,y[,width[,height]]`
const SIMPLE_MIN_COLUMNS: usize = 3;

pub fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// Split one CSV line. A double quote toggles quoting and is dropped; commas
/// inside quotes do not split. Fields are trimmed.
pub fn split_line(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                values.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    values.push(current.trim().to_string());
    values
}

/// Parse a whole CSV body. The first non-blank line is the header. Lines
/// with non-numeric coordinates are dropped.
pub fn parse_records(content: &str) -> Vec<PositionRecord> {
    let mut records = Vec::new();
    let lines = strip_bom(content)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .skip(1);

    for (line_no, line) in lines {
        let values = split_line(line);
        match record_from_values(&values) {
            Some(record) => records.push(record),
            None => log::debug!("Skipping CSV line {}: {line}", line_no + 1),
        }
    }

    records
}

/// Read, strip and parse a CSV file. Zero records is an error.
pub async fn load_records(path: impl AsRef<Path>) -> Result<Vec<PositionRecord>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| RecordsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8_lossy(&bytes);
    let records = parse_records(&content);
    if records.is_empty() {
        return Err(RecordsError::Empty(path.to_path_buf()));
    }
    log::info!("Parsed {} position records from {}", records.len(), path.display());
    Ok(records)
}

fn record_from_values(values: &[String]) -> Option<PositionRecord> {
    let declared = values.get(1).and_then(|raw| NodeKind::from_column(raw));

    let (name, kind, parent_path, rest) = match declared {
        Some(kind) => {
            if values.len() < EXTENDED_MIN_COLUMNS {
                return None;
            }
            (
                unquote(&values[0]),
                kind,
                unquote(&values[2]),
                &values[3..],
            )
        }
        None => {
            if values.len() < SIMPLE_MIN_COLUMNS {
                return None;
            }
            (unquote(&values[0]), NodeKind::Layer, String::new(), &values[1..])
        }
    };

    let x = coordinate(&rest[0])?;
    let y = coordinate(&rest[1])?;

    Some(PositionRecord {
        name,
        kind,
        parent_path,
        x,
        y,
        width: rest.get(2).and_then(|raw| coordinate(raw)),
        height: rest.get(3).and_then(|raw| coordinate(raw)),
    })
}

fn coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Drop one wrapping quote at each end.
fn unquote(raw: &str) -> String {
    let raw = raw.strip_prefix('"').unwrap_or(raw);
    raw.strip_suffix('"').unwrap_or(raw).to_string()
}
