// Summary statistics over journal entries
use crate::journal::Entry;

/// Totals for a single exercise.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExerciseTotals {
    pub sets: usize,
    pub repetitions: u64,
    pub volume: f64,
}

/// Statistics for a set of entries.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Summary {
    /// Sum of weight * repetitions in kg.
    pub total_volume: f64,
    pub total_repetitions: u64,
    /// Per-exercise totals in the order exercises first appear.
    pub exercises: Vec<(String, ExerciseTotals)>,
    /// Entries ignored because their weight or repetitions did not parse.
    pub skipped: usize,
}

impl Summary {
    pub fn total_line(&self) -> String {
        format!("Total volume: {:.2} kg", self.total_volume)
    }

    pub fn repetitions_line(&self) -> String {
        format!("Total repetitions: {}", self.total_repetitions)
    }

    pub fn exercise_lines(&self) -> Vec<String> {
        self.exercises
            .iter()
            .map(|(name, t)| format!("{name}: {:.2} kg, {} reps", t.volume, t.repetitions))
            .collect()
    }
}

/// Aggregate volume and repetitions over `entries`.
pub fn compute_summary(entries: &[Entry]) -> Summary {
    let mut summary = Summary::default();
    if entries.is_empty() {
        return summary;
    }

    log::info!("Computing statistics for {} entries", entries.len());

    for e in entries {
        let (Some(weight), Some(reps)) = (e.weight_kg(), e.reps()) else {
            log::warn!("Skipping entry with unreadable numbers: {e:?}");
            summary.skipped += 1;
            continue;
        };
        let volume = weight * reps as f64;
        summary.total_volume += volume;
        summary.total_repetitions += reps as u64;

        let idx = match summary.exercises.iter().position(|(n, _)| *n == e.exercise) {
            Some(i) => i,
            None => {
                summary
                    .exercises
                    .push((e.exercise.clone(), ExerciseTotals::default()));
                summary.exercises.len() - 1
            }
        };
        let totals = &mut summary.exercises[idx].1;
        totals.sets += 1;
        totals.repetitions += reps as u64;
        totals.volume += volume;
    }

    summary
}

/// Format a user facing message after importing entries from a file.
pub fn format_import_message(entries: usize, filename: &str) -> String {
    format!("Imported {} entries from {}", entries, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(exercise: &str, weight: &str, reps: &str) -> Entry {
        Entry {
            datetime: "01/01/2024 10:00".into(),
            exercise: exercise.into(),
            weight: weight.into(),
            repetitions: reps.into(),
        }
    }

    fn sample_entries() -> Vec<Entry> {
        vec![
            entry("Squat", "100", "5"),
            entry("Bench", "80", "5"),
            entry("Squat", "105.5", "4"),
            entry("Deadlift", "120", "3"),
        ]
    }

    #[test]
    fn test_compute_summary() {
        let s = compute_summary(&sample_entries());
        assert!((s.total_volume - (500.0 + 400.0 + 422.0 + 360.0)).abs() < 1e-9);
        assert_eq!(s.total_repetitions, 17);
        let names: Vec<&str> = s.exercises.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Squat", "Bench", "Deadlift"]);

        let squat = &s.exercises[0].1;
        assert_eq!(squat.sets, 2);
        assert_eq!(squat.repetitions, 9);
        assert!((squat.volume - 922.0).abs() < 1e-9);
        assert_eq!(s.skipped, 0);
    }

    #[test]
    fn test_unparseable_entries_are_skipped() {
        let mut entries = sample_entries();
        entries.push(entry("Curl", "light", "10"));
        let s = compute_summary(&entries);
        assert_eq!(s.skipped, 1);
        assert!(s.exercises.iter().all(|(n, _)| n != "Curl"));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(compute_summary(&[]), Summary::default());
    }

    #[test]
    fn test_display_lines() {
        let s = compute_summary(&[entry("Squat", "100", "5")]);
        assert_eq!(s.total_line(), "Total volume: 500.00 kg");
        assert_eq!(s.repetitions_line(), "Total repetitions: 5");
        assert_eq!(s.exercise_lines(), vec!["Squat: 500.00 kg, 5 reps"]);
    }

    #[test]
    fn test_format_import_message() {
        let msg = format_import_message(10, "workouts.csv");
        assert_eq!(msg, "Imported 10 entries from workouts.csv");
    }
}
