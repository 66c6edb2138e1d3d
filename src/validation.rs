use crate::journal::{DATETIME_FORMAT, Entry};
use chrono::{NaiveDate, NaiveDateTime};

/// Heaviest weight (kg) accepted for a single entry.
pub const MAX_WEIGHT_KG: f64 = 200.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField,
    WeightNotNumber(String),
    WeightOutOfRange(f64),
    InvalidRepetitions(String),
    InvalidDateTime(String),
    InvalidHour(String),
    InvalidMinute(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyField => write!(f, "All fields must be filled in"),
            ValidationError::WeightNotNumber(w) => write!(f, "Weight must be a number, got {w:?}"),
            ValidationError::WeightOutOfRange(w) => write!(
                f,
                "Weight {w} is out of range: must be positive and at most {MAX_WEIGHT_KG} kg"
            ),
            ValidationError::InvalidRepetitions(r) => write!(
                f,
                "Repetitions must be a positive whole number, got {r:?}"
            ),
            ValidationError::InvalidDateTime(d) => {
                write!(f, "Invalid date {d:?}: expected DD/MM/YYYY HH:MM")
            }
            ValidationError::InvalidHour(h) => write!(f, "Hour must be 00-23, got {h:?}"),
            ValidationError::InvalidMinute(m) => write!(f, "Minute must be 00-59, got {m:?}"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_weight(weight: &str) -> Result<f64, ValidationError> {
    let weight = weight.trim();
    let value: f64 = weight
        .parse()
        .map_err(|_| ValidationError::WeightNotNumber(weight.to_string()))?;
    // NaN fails both comparisons, so test the accepted range directly.
    if value > 0.0 && value <= MAX_WEIGHT_KG {
        Ok(value)
    } else {
        Err(ValidationError::WeightOutOfRange(value))
    }
}

pub fn validate_repetitions(reps: &str) -> Result<u32, ValidationError> {
    let reps = reps.trim();
    let invalid = || ValidationError::InvalidRepetitions(reps.to_string());
    if reps.is_empty() || !reps.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    match reps.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid()),
    }
}

pub fn validate_datetime(datetime: &str) -> Result<NaiveDateTime, ValidationError> {
    let datetime = datetime.trim();
    NaiveDateTime::parse_from_str(datetime, DATETIME_FORMAT)
        .map_err(|_| ValidationError::InvalidDateTime(datetime.to_string()))
}

fn parse_clock_field(value: &str, max: u32) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse::<u32>().ok().filter(|v| *v <= max)
}

/// Build a journal timestamp from the date picker and the hour/minute fields.
pub fn compose_datetime(
    date: NaiveDate,
    hour: &str,
    minute: &str,
) -> Result<String, ValidationError> {
    let h = parse_clock_field(hour, 23).ok_or_else(|| ValidationError::InvalidHour(hour.into()))?;
    let m = parse_clock_field(minute, 59)
        .ok_or_else(|| ValidationError::InvalidMinute(minute.into()))?;
    Ok(format!("{} {h:02}:{m:02}", date.format("%d/%m/%Y")))
}

/// Check raw form input and turn it into a storable [`Entry`].
pub fn validate_entry(
    datetime: &str,
    exercise: &str,
    weight: &str,
    repetitions: &str,
) -> Result<Entry, ValidationError> {
    let exercise = exercise.trim();
    let weight = weight.trim();
    let repetitions = repetitions.trim();
    if exercise.is_empty() || weight.is_empty() || repetitions.is_empty() {
        return Err(ValidationError::EmptyField);
    }
    validate_datetime(datetime)?;
    validate_weight(weight)?;
    validate_repetitions(repetitions)?;
    Ok(Entry {
        datetime: datetime.trim().to_string(),
        exercise: exercise.to_string(),
        weight: weight.to_string(),
        repetitions: repetitions.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_bounds() {
        assert_eq!(validate_weight("200"), Ok(200.0));
        assert_eq!(validate_weight(" 0.5 "), Ok(0.5));
        assert_eq!(validate_weight("0"), Err(ValidationError::WeightOutOfRange(0.0)));
        assert_eq!(
            validate_weight("200.01"),
            Err(ValidationError::WeightOutOfRange(200.01))
        );
        assert_eq!(validate_weight("-5"), Err(ValidationError::WeightOutOfRange(-5.0)));
        assert!(matches!(
            validate_weight("heavy"),
            Err(ValidationError::WeightNotNumber(_))
        ));
        assert!(matches!(
            validate_weight("NaN"),
            Err(ValidationError::WeightOutOfRange(_))
        ));
    }

    #[test]
    fn repetitions_must_be_positive_integers() {
        assert_eq!(validate_repetitions("12"), Ok(12));
        for bad in ["0", "-3", "2.5", "", "ten", "+4"] {
            assert!(
                matches!(
                    validate_repetitions(bad),
                    Err(ValidationError::InvalidRepetitions(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn datetime_format() {
        assert!(validate_datetime("31/12/2024 23:59").is_ok());
        assert!(validate_datetime("2024-12-31 23:59").is_err());
        assert!(validate_datetime("31/02/2024 10:00").is_err());
    }

    #[test]
    fn compose_pads_time() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(compose_datetime(date, "7", "5").unwrap(), "07/03/2024 07:05");
        assert_eq!(
            compose_datetime(date, "24", "00"),
            Err(ValidationError::InvalidHour("24".into()))
        );
        assert_eq!(
            compose_datetime(date, "10", "60"),
            Err(ValidationError::InvalidMinute("60".into()))
        );
    }

    #[test]
    fn validate_entry_checks_everything() {
        let e = validate_entry("07/03/2024 07:05", " Squat ", "100", "5").unwrap();
        assert_eq!(e.exercise, "Squat");
        assert_eq!(
            validate_entry("07/03/2024 07:05", "", "100", "5"),
            Err(ValidationError::EmptyField)
        );
        assert_eq!(
            validate_entry("07/03/2024 07:05", "Squat", "250", "5"),
            Err(ValidationError::WeightOutOfRange(250.0))
        );
        assert!(matches!(
            validate_entry("bad", "Squat", "100", "5"),
            Err(ValidationError::InvalidDateTime(_))
        ));
    }
}
