//! CSV import and export of journal entries.
//!
//! The column headers are fixed Russian labels so files stay compatible with
//! spreadsheets produced by earlier releases of the journal.

use crate::journal::Entry;
use crate::validation::{ValidationError, validate_entry};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

pub const COL_DATE: &str = "Дата";
pub const COL_EXERCISE: &str = "Упражнение";
pub const COL_WEIGHT: &str = "Вес";
pub const COL_REPETITIONS: &str = "Повторения";

const COLUMNS: [&str; 4] = [COL_DATE, COL_EXERCISE, COL_WEIGHT, COL_REPETITIONS];

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Дата")]
    date: String,
    #[serde(rename = "Упражнение")]
    exercise: String,
    #[serde(rename = "Вес")]
    weight: String,
    #[serde(rename = "Повторения")]
    repetitions: String,
}

impl From<&Entry> for CsvRow {
    fn from(e: &Entry) -> Self {
        Self {
            date: e.datetime.clone(),
            exercise: e.exercise.clone(),
            weight: e.weight.clone(),
            repetitions: e.repetitions.clone(),
        }
    }
}

#[derive(Debug)]
pub enum InterchangeError {
    Io(std::io::Error),
    Csv(csv::Error),
    NoData,
    MissingColumns(Vec<String>),
    /// A row the CSV reader could not split into the four columns.
    MalformedRow { line: u64, source: csv::Error },
    InvalidRow { line: u64, reason: ValidationError },
}

impl std::fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterchangeError::Io(e) => write!(f, "{e}"),
            InterchangeError::Csv(e) => write!(f, "CSV error: {e}"),
            InterchangeError::NoData => write!(f, "No data to transfer"),
            InterchangeError::MissingColumns(cols) => write!(
                f,
                "Malformed file: missing column(s) {}; expected {}",
                cols.join(", "),
                COLUMNS.join(", ")
            ),
            InterchangeError::MalformedRow { line, source } => {
                write!(f, "Malformed row on line {line}: {source}")
            }
            InterchangeError::InvalidRow { line, reason } => {
                write!(f, "Invalid data on line {line}: {reason}")
            }
        }
    }
}

impl std::error::Error for InterchangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InterchangeError::Io(e) => Some(e),
            InterchangeError::Csv(e) => Some(e),
            InterchangeError::MalformedRow { source, .. } => Some(source),
            InterchangeError::InvalidRow { reason, .. } => Some(reason),
            InterchangeError::NoData | InterchangeError::MissingColumns(_) => None,
        }
    }
}

impl From<std::io::Error> for InterchangeError {
    fn from(e: std::io::Error) -> Self {
        InterchangeError::Io(e)
    }
}

impl From<csv::Error> for InterchangeError {
    fn from(e: csv::Error) -> Self {
        InterchangeError::Csv(e)
    }
}

pub fn export_csv(writer: impl Write, entries: &[Entry]) -> Result<(), InterchangeError> {
    if entries.is_empty() {
        return Err(InterchangeError::NoData);
    }
    let mut wtr = csv::Writer::from_writer(writer);
    for e in entries {
        wtr.serialize(CsvRow::from(e))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_csv_file<P: AsRef<Path>>(path: P, entries: &[Entry]) -> Result<(), InterchangeError> {
    let path = path.as_ref();
    if entries.is_empty() {
        return Err(InterchangeError::NoData);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    export_csv(std::fs::File::create(path)?, entries)?;
    log::info!("Exported {} entries to {}", entries.len(), path.display());
    Ok(())
}

/// Parse and validate every row of a CSV file.
///
/// The import is all-or-nothing: the first invalid row aborts it. Rows go
/// through the same checks as the entry form.
pub fn import_csv<R: Read>(reader: R) -> Result<Vec<Entry>, InterchangeError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h.trim() == **c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(InterchangeError::MissingColumns(missing));
    }

    let mut entries = Vec::new();
    for (idx, result) in rdr.deserialize::<CsvRow>().enumerate() {
        // Header occupies line 1.
        let line = idx as u64 + 2;
        let row = result.map_err(|source| InterchangeError::MalformedRow {
            line: source.position().map_or(line, |p| p.line()),
            source,
        })?;
        let entry = validate_entry(&row.date, &row.exercise, &row.weight, &row.repetitions)
            .map_err(|reason| InterchangeError::InvalidRow { line, reason })?;
        entries.push(entry);
    }

    if entries.is_empty() {
        return Err(InterchangeError::NoData);
    }
    Ok(entries)
}

pub fn import_csv_file<P: AsRef<Path>>(path: P) -> Result<Vec<Entry>, InterchangeError> {
    let path = path.as_ref();
    let entries = import_csv(std::fs::File::open(path)?)?;
    log::info!("Read {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(datetime: &str, exercise: &str, weight: &str, reps: &str) -> Entry {
        Entry {
            datetime: datetime.into(),
            exercise: exercise.into(),
            weight: weight.into(),
            repetitions: reps.into(),
        }
    }

    #[test]
    fn export_writes_russian_header() {
        let mut buf = Vec::new();
        export_csv(&mut buf, &[entry("01/03/2024 10:00", "Присед, low bar", "100", "5")]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Дата,Упражнение,Вес,Повторения"));
        assert_eq!(lines.next(), Some("01/03/2024 10:00,\"Присед, low bar\",100,5"));
    }

    #[test]
    fn export_then_import_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("files").join("out.csv");
        let entries = vec![
            entry("01/03/2024 10:00", "Squat", "100", "5"),
            entry("02/03/2024 18:30", "Жим \"узкий\"", "62.5", "12"),
        ];
        export_csv_file(&path, &entries).unwrap();
        assert_eq!(import_csv_file(&path).unwrap(), entries);
    }

    #[test]
    fn export_empty_is_no_data() {
        assert!(matches!(
            export_csv(Vec::new(), &[]),
            Err(InterchangeError::NoData)
        ));
    }

    #[test]
    fn import_reports_missing_columns() {
        let data = "Дата,Упражнение,Weight\n01/03/2024 10:00,Squat,100\n";
        match import_csv(data.as_bytes()) {
            Err(InterchangeError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["Вес".to_string(), "Повторения".to_string()])
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn import_aborts_on_out_of_range_weight() {
        let data = "Дата,Упражнение,Вес,Повторения\n\
01/03/2024 10:00,Squat,100,5\n\
02/03/2024 10:00,Squat,250,5\n";
        match import_csv(data.as_bytes()) {
            Err(InterchangeError::InvalidRow { line, reason }) => {
                assert_eq!(line, 3);
                assert_eq!(reason, ValidationError::WeightOutOfRange(250.0));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn import_rejects_bad_repetitions_and_dates() {
        let reps = "Дата,Упражнение,Вес,Повторения\n01/03/2024 10:00,Squat,100,0\n";
        assert!(matches!(
            import_csv(reps.as_bytes()),
            Err(InterchangeError::InvalidRow {
                reason: ValidationError::InvalidRepetitions(_),
                ..
            })
        ));
        let date = "Дата,Упражнение,Вес,Повторения\n2024-03-01,Squat,100,5\n";
        assert!(matches!(
            import_csv(date.as_bytes()),
            Err(InterchangeError::InvalidRow {
                reason: ValidationError::InvalidDateTime(_),
                ..
            })
        ));
    }

    #[test]
    fn import_tolerates_spaced_header() {
        let data = "Дата, Упражнение, Вес, Повторения\n01/03/2024 10:00,Squat,100,5\n";
        let entries = import_csv(data.as_bytes()).unwrap();
        assert_eq!(entries, vec![entry("01/03/2024 10:00", "Squat", "100", "5")]);
    }

    #[test]
    fn import_header_only_is_no_data() {
        let data = "Дата,Упражнение,Вес,Повторения\n";
        assert!(matches!(
            import_csv(data.as_bytes()),
            Err(InterchangeError::NoData)
        ));
    }

    #[test]
    fn import_rejects_blank_exercise() {
        let data = "Дата,Упражнение,Вес,Повторения
01/03/2024 10:00,Squat,100,5
02/03/2024 10:00,   ,100,5
";
        match import_csv(data.as_bytes()) {
            Err(InterchangeError::InvalidRow { line, reason }) => {
                assert_eq!(line, 3);
                assert_eq!(reason, ValidationError::EmptyField);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn import_reports_line_of_short_row() {
        let data = "Дата,Упражнение,Вес,Повторения
01/03/2024 10:00,Squat,100,5
02/03/2024 10:00,Squat,100
";
        let err = import_csv(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
        match err {
            InterchangeError::MalformedRow { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
