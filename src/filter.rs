use crate::journal::Entry;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::InvertedRange { start, end } => write!(
                f,
                "Start date {} cannot be later than end date {}",
                start.format("%d/%m/%Y"),
                end.format("%d/%m/%Y")
            ),
        }
    }
}

impl std::error::Error for FilterError {}

/// Inclusive range of whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        if start > end {
            return Err(FilterError::InvertedRange { start, end });
        }
        let end_of_day =
            NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
        Ok(Self {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_time(end_of_day),
        })
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub range: Option<DateRange>,
    pub exercise: Option<String>,
}

impl EntryFilter {
    /// Build a filter from the UI controls; blank exercise text disables
    /// exercise matching.
    pub fn from_controls(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        exercise: &str,
    ) -> Result<Self, FilterError> {
        let range = match (start, end) {
            (Some(s), Some(e)) => Some(DateRange::new(s, e)?),
            (Some(s), None) => Some(DateRange::new(s, NaiveDate::MAX)?),
            (None, Some(e)) => Some(DateRange::new(NaiveDate::MIN, e)?),
            (None, None) => None,
        };
        let exercise = Some(exercise.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self { range, exercise })
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(range) = &self.range {
            match entry.timestamp() {
                Some(ts) if range.contains(ts) => {}
                Some(_) => return false,
                None => {
                    log::warn!(
                        "Skipping entry with unreadable date {:?} ({})",
                        entry.datetime,
                        entry.exercise
                    );
                    return false;
                }
            }
        }
        if let Some(ex) = &self.exercise {
            if !entry.exercise.to_lowercase().contains(&ex.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Entries that pass `filter`, in journal order.
pub fn filter_entries(entries: &[Entry], filter: &EntryFilter) -> Vec<Entry> {
    entries.iter().filter(|e| filter.matches(e)).cloned().collect()
}
