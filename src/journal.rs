//! Workout entries and the JSON-backed journal that stores them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Timestamp format used by the date/time picker, the JSON file and CSV files.
pub const DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// A single workout record.
///
/// Numeric fields are kept as the strings the user typed so the journal file
/// stays byte-compatible with files written by earlier versions of the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(alias = "date")]
    pub datetime: String,
    pub exercise: String,
    pub weight: String,
    pub repetitions: String,
}

impl Entry {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.datetime.trim(), DATETIME_FORMAT).ok()
    }

    pub fn weight_kg(&self) -> Option<f64> {
        self.weight.trim().parse::<f64>().ok()
    }

    pub fn reps(&self) -> Option<u32> {
        self.repetitions.trim().parse::<u32>().ok()
    }
}

#[derive(Debug)]
pub enum JournalError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    NotFound,
}

impl std::fmt::Display for JournalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JournalError::Io(e) => write!(f, "journal file error: {e}"),
            JournalError::Parse(e) => {
                write!(f, "failed to parse journal (the file may be empty): {e}")
            }
            JournalError::NotFound => write!(f, "entry not found in journal"),
        }
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JournalError::Io(e) => Some(e),
            JournalError::Parse(e) => Some(e),
            JournalError::NotFound => None,
        }
    }
}

impl From<std::io::Error> for JournalError {
    fn from(e: std::io::Error) -> Self {
        JournalError::Io(e)
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(e: serde_json::Error) -> Self {
        JournalError::Parse(e)
    }
}

/// How [`Journal::load`] obtained its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The file did not exist and a new empty journal was written.
    Created,
}

/// Ordered collection of workout entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Journal {
    entries: Vec<Entry>,
}

impl Journal {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Read the whole journal from `path`.
    ///
    /// A missing file is not an error: an empty journal is written in its
    /// place and [`LoadOutcome::Created`] is returned.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(Self, LoadOutcome), JournalError> {
        let path = path.as_ref();
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let journal = Journal::default();
                journal.save(path)?;
                log::warn!("Journal {} not found, created an empty one", path.display());
                return Ok((journal, LoadOutcome::Created));
            }
            Err(e) => return Err(e.into()),
        };
        let journal: Journal = serde_json::from_str(&data)?;
        log::info!(
            "Loaded {} entries from {}",
            journal.entries.len(),
            path.display()
        );
        Ok((journal, LoadOutcome::Loaded))
    }

    /// Overwrite `path` with the whole journal.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), JournalError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &self.entries)?;
        log::info!("Saved {} entries to {}", self.entries.len(), path.display());
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn extend<I: IntoIterator<Item = Entry>>(&mut self, entries: I) {
        self.entries.extend(entries);
    }

    /// Replace the first entry equal to `old` with `new`.
    pub fn update(&mut self, old: &Entry, new: Entry) -> Result<(), JournalError> {
        let slot = self
            .entries
            .iter_mut()
            .find(|e| *e == old)
            .ok_or(JournalError::NotFound)?;
        *slot = new;
        Ok(())
    }

    /// Remove every entry equal to `entry`, returning how many were removed.
    ///
    /// Entries carry no identifier, so exact duplicates are removed together.
    pub fn remove(&mut self, entry: &Entry) -> Result<usize, JournalError> {
        let before = self.entries.len();
        self.entries.retain(|e| e != entry);
        match before - self.entries.len() {
            0 => Err(JournalError::NotFound),
            n => Ok(n),
        }
    }

    /// Sorted unique exercise names.
    pub fn exercises(&self) -> Vec<String> {
        let set: std::collections::BTreeSet<&str> =
            self.entries.iter().map(|e| e.exercise.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }
}
