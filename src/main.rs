//! Main application logic and persistent user settings.

use dirs_next as dirs;
use eframe::{App, Frame, NativeOptions, egui};
use egui_extras::DatePickerButton;
use egui_plot::{Legend, Plot};
use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use log::{error, info, warn};

mod analysis;
use analysis::{Summary, compute_summary, format_import_message};
mod filter;
use filter::{EntryFilter, filter_entries};
mod interchange;
use interchange::{export_csv_file, import_csv_file};
mod journal;
use journal::{Entry, Journal, JournalError, LoadOutcome};
mod plotting;
use plotting::{ChartSeries, Metric, metric_line, save_charts, series, x_to_label};
mod validation;
use validation::{compose_datetime, validate_entry};

fn default_journal_path() -> String {
    "training_log.json".into()
}

fn default_csv_dir() -> String {
    "files".into()
}

fn default_image_dir() -> String {
    "images".into()
}

fn default_chart_counter() -> u32 {
    1
}

/// Persistent configuration: file locations and the last used filter.
///
/// Stored as JSON in the platform config directory. Every field carries a
/// serde default so files written by older versions keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Settings {
    #[serde(default = "default_journal_path")]
    journal_path: String,
    #[serde(default = "default_csv_dir")]
    csv_dir: String,
    #[serde(default = "default_image_dir")]
    image_dir: String,
    /// Id for the next pair of saved chart images.
    #[serde(default = "default_chart_counter")]
    chart_counter: u32,
    #[serde(default)]
    filter_start: Option<NaiveDate>,
    #[serde(default)]
    filter_end: Option<NaiveDate>,
    #[serde(default)]
    exercise_filter: String,
}

impl Settings {
    const FILE: &'static str = "training_journal_settings.json";

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => warn!("Ignoring unreadable settings {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match serde_json::to_string_pretty(self) {
                Ok(data) => {
                    if let Err(e) = std::fs::write(&path, data) {
                        error!("Failed to save settings to {}: {e}", path.display());
                    }
                }
                Err(e) => error!("Failed to serialize settings: {e}"),
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            journal_path: default_journal_path(),
            csv_dir: default_csv_dir(),
            image_dir: default_image_dir(),
            chart_counter: default_chart_counter(),
            filter_start: None,
            filter_end: None,
            exercise_filter: String::new(),
        }
    }
}

/// Values of the "new entry" form.
#[derive(Debug, Clone, PartialEq)]
struct EntryForm {
    date: NaiveDate,
    hour: String,
    minute: String,
    exercise: String,
    weight: String,
    repetitions: String,
}

impl Default for EntryForm {
    fn default() -> Self {
        Self {
            date: Local::now().date_naive(),
            hour: "00".into(),
            minute: "00".into(),
            exercise: String::new(),
            weight: String::new(),
            repetitions: String::new(),
        }
    }
}

impl EntryForm {
    fn clear_fields(&mut self) {
        self.exercise.clear();
        self.weight.clear();
        self.repetitions.clear();
    }
}

/// An entry being edited together with the values it had when the edit began.
#[derive(Debug, Clone, PartialEq)]
struct EditState {
    original: Entry,
    datetime: String,
    exercise: String,
    weight: String,
    repetitions: String,
}

impl EditState {
    fn new(entry: &Entry) -> Self {
        Self {
            original: entry.clone(),
            datetime: entry.datetime.clone(),
            exercise: entry.exercise.clone(),
            weight: entry.weight.clone(),
            repetitions: entry.repetitions.clone(),
        }
    }
}

/// Contents of the records window.
#[derive(Debug, Clone)]
struct RecordsView {
    filter: Option<EntryFilter>,
    entries: Vec<Entry>,
    selected: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
struct Message {
    kind: MessageKind,
    text: String,
}

struct ChartView {
    series: ChartSeries,
    saved: Option<(PathBuf, PathBuf)>,
}

struct JournalApp {
    journal: Journal,
    settings: Settings,
    settings_dirty: bool,
    form: EntryForm,
    exercises: Vec<String>,
    records: Option<RecordsView>,
    edit: Option<EditState>,
    confirm_delete: Option<Entry>,
    summary: Option<Summary>,
    charts: Option<ChartView>,
    message: Option<Message>,
    status: Option<String>,
    toast_start: Option<Instant>,
    /// Unreadable journal file that could not be backed up; never written to.
    save_blocked: Option<PathBuf>,
}

impl Default for JournalApp {
    fn default() -> Self {
        Self::with_settings(Settings::load())
    }
}

impl JournalApp {
    fn with_settings(settings: Settings) -> Self {
        for dir in [&settings.csv_dir, &settings.image_dir] {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!("Could not create directory {dir}: {e}");
            }
        }
        let mut app = Self {
            journal: Journal::default(),
            settings,
            settings_dirty: false,
            form: EntryForm::default(),
            exercises: Vec::new(),
            records: None,
            edit: None,
            confirm_delete: None,
            summary: None,
            charts: None,
            message: None,
            status: None,
            toast_start: None,
            save_blocked: None,
        };
        let path = app.journal_path();
        app.open_journal(&path);
        app
    }

    fn journal_path(&self) -> PathBuf {
        PathBuf::from(&self.settings.journal_path)
    }

    fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!("{text}");
        self.message = Some(Message {
            kind: MessageKind::Info,
            text,
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        error!("{text}");
        self.message = Some(Message {
            kind: MessageKind::Error,
            text,
        });
    }

    fn toast(&mut self, text: impl Into<String>) {
        self.status = Some(text.into());
        self.toast_start = Some(Instant::now());
    }

    /// Replace the in-memory journal with the contents of `path`.
    ///
    /// An unparseable file is copied to `<name>.bak` before the journal starts
    /// empty. If that copy fails, saving to `path` stays blocked until another
    /// journal is opened or the journal is saved elsewhere.
    fn open_journal(&mut self, path: &Path) {
        self.save_blocked = None;
        match Journal::load(path) {
            Ok((journal, outcome)) => {
                self.journal = journal;
                if outcome == LoadOutcome::Created {
                    self.error(format!(
                        "Journal file {} not found. A new file was created.",
                        path.display()
                    ));
                } else {
                    self.toast(format!(
                        "Loaded {} entries from {}",
                        self.journal.len(),
                        path.display()
                    ));
                }
            }
            Err(e) => {
                self.journal = Journal::default();
                let mut text = format!("{e}");
                if matches!(e, JournalError::Parse(_)) {
                    let backup = path.with_extension("json.bak");
                    match std::fs::copy(path, &backup) {
                        Ok(_) => text.push_str(&format!(
                            "\nThe unreadable file was copied to {}.",
                            backup.display()
                        )),
                        Err(copy_err) => {
                            text.push_str(&format!(
                                "\nCould not back up the unreadable file to {}: {copy_err}.\n\
                                 Changes will not be saved to {} until another journal is \
                                 opened or the journal is saved under a different name.",
                                backup.display(),
                                path.display()
                            ));
                            self.save_blocked = Some(path.to_path_buf());
                        }
                    }
                }
                self.error(text);
            }
        }
        self.refresh_exercises();
    }

    fn refresh_exercises(&mut self) {
        self.exercises = self.journal.exercises();
    }

    fn is_blocked(&self, path: &Path) -> bool {
        self.save_blocked.as_deref() == Some(path)
    }

    /// Apply `change` to a copy of the journal and save it; the live journal
    /// is replaced only once the file was written.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Journal) -> Result<T, JournalError>,
    ) -> Option<T> {
        let path = self.journal_path();
        if self.is_blocked(&path) {
            self.error(format!(
                "{} is unreadable and has no backup; use \"Save journal as...\" first.",
                path.display()
            ));
            return None;
        }
        let mut next = self.journal.clone();
        let out = match change(&mut next) {
            Ok(out) => out,
            Err(e) => {
                self.error(e.to_string());
                return None;
            }
        };
        if let Err(e) = next.save(&path) {
            self.error(format!("Failed to save journal: {e}"));
            return None;
        }
        self.journal = next;
        Some(out)
    }

    fn current_filter(&self) -> Result<EntryFilter, filter::FilterError> {
        EntryFilter::from_controls(
            self.settings.filter_start,
            self.settings.filter_end,
            &self.settings.exercise_filter,
        )
    }

    fn filtered(&mut self) -> Option<Vec<Entry>> {
        match self.current_filter() {
            Ok(f) => Some(filter_entries(self.journal.entries(), &f)),
            Err(e) => {
                self.error(e.to_string());
                None
            }
        }
    }

    fn add_entry(&mut self) {
        let datetime = match compose_datetime(self.form.date, &self.form.hour, &self.form.minute) {
            Ok(dt) => dt,
            Err(e) => return self.error(e.to_string()),
        };
        let entry = match validate_entry(
            &datetime,
            &self.form.exercise,
            &self.form.weight,
            &self.form.repetitions,
        ) {
            Ok(entry) => entry,
            Err(e) => return self.error(e.to_string()),
        };
        if self
            .commit(|journal| {
                journal.add(entry);
                Ok(())
            })
            .is_some()
        {
            self.refresh_exercises();
            self.form.clear_fields();
            self.info("Entry added.");
        }
    }

    fn view_all(&mut self) {
        self.records = Some(RecordsView {
            filter: None,
            entries: self.journal.entries().to_vec(),
            selected: None,
        });
    }

    fn apply_filter(&mut self) {
        match self.current_filter() {
            Ok(f) => {
                let entries = filter_entries(self.journal.entries(), &f);
                self.records = Some(RecordsView {
                    filter: Some(f),
                    entries,
                    selected: None,
                });
            }
            Err(e) => self.error(e.to_string()),
        }
    }

    fn refresh_records(&mut self) {
        if let Some(view) = &mut self.records {
            view.entries = match &view.filter {
                Some(f) => filter_entries(self.journal.entries(), f),
                None => self.journal.entries().to_vec(),
            };
            view.selected = None;
        }
    }

    fn selected_entry(&self) -> Option<Entry> {
        let view = self.records.as_ref()?;
        view.entries.get(view.selected?).cloned()
    }

    fn begin_edit(&mut self) {
        match self.selected_entry() {
            Some(entry) => self.edit = Some(EditState::new(&entry)),
            None => self.error("Select an entry to edit."),
        }
    }

    fn save_edit(&mut self) {
        let Some(edit) = self.edit.clone() else {
            return;
        };
        let entry = match validate_entry(
            &edit.datetime,
            &edit.exercise,
            &edit.weight,
            &edit.repetitions,
        ) {
            Ok(entry) => entry,
            Err(e) => return self.error(e.to_string()),
        };
        if self
            .commit(|journal| journal.update(&edit.original, entry))
            .is_some()
        {
            self.edit = None;
            self.refresh_exercises();
            self.refresh_records();
            self.info("Entry updated.");
        }
    }

    fn request_delete(&mut self) {
        match self.selected_entry() {
            Some(entry) => self.confirm_delete = Some(entry),
            None => self.error("Select an entry to delete."),
        }
    }

    fn delete_entry(&mut self, entry: &Entry) {
        if let Some(n) = self.commit(|journal| journal.remove(entry)) {
            self.refresh_exercises();
            self.refresh_records();
            self.info(if n == 1 {
                "Entry deleted.".to_string()
            } else {
                format!("{n} identical entries deleted.")
            });
        }
    }

    fn show_statistics(&mut self) {
        if let Some(entries) = self.filtered() {
            self.summary = Some(compute_summary(&entries));
        }
    }

    fn show_charts(&mut self) {
        let Some(entries) = self.filtered() else {
            return;
        };
        let chart_series = series(&entries);
        if chart_series.is_empty() {
            return self.info("No data to chart.");
        }
        let id = self.settings.chart_counter;
        let dir = PathBuf::from(&self.settings.image_dir);
        let saved = match save_charts(&entries, &dir, id) {
            Ok(paths) => {
                self.settings.chart_counter += 1;
                self.settings_dirty = true;
                self.info(format!(
                    "Charts saved:\n{}\n{}",
                    paths.0.display(),
                    paths.1.display()
                ));
                Some(paths)
            }
            Err(e) => {
                self.error(format!("Could not save chart images: {e}"));
                None
            }
        };
        self.charts = Some(ChartView {
            series: chart_series,
            saved,
        });
    }

    fn export_to(&mut self, path: &Path) {
        match export_csv_file(path, self.journal.entries()) {
            Ok(()) => self.info(format!("Data exported to {}", path.display())),
            Err(e) => self.error(format!("Export failed: {e}")),
        }
    }

    fn import_from(&mut self, path: &Path) {
        match import_csv_file(path) {
            Ok(entries) => {
                let count = entries.len();
                let extended = self.commit(|journal| {
                    journal.extend(entries);
                    Ok(())
                });
                if extended.is_some() {
                    self.refresh_exercises();
                    self.refresh_records();
                    let name = path
                        .file_name()
                        .map(|f| f.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string());
                    self.info(format_import_message(count, &name));
                }
            }
            Err(e) => self.error(format!("Import failed: {e}")),
        }
    }

    fn save_journal_as(&mut self, path: PathBuf) {
        if self.is_blocked(&path) {
            return self.error(format!(
                "{} is unreadable and has no backup; choose a different file.",
                path.display()
            ));
        }
        match self.journal.save(&path) {
            Ok(()) => {
                self.save_blocked = None;
                self.settings.journal_path = path.display().to_string();
                self.settings_dirty = true;
                self.toast(format!("Journal saved to {}", path.display()));
            }
            Err(e) => self.error(format!("Failed to save journal: {e}")),
        }
    }

    fn entry_form(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("entry_form").num_columns(2).show(ui, |ui| {
            ui.label("Date and time:");
            ui.horizontal(|ui| {
                ui.add(DatePickerButton::new(&mut self.form.date).id_source("entry_date"));
                ui.add(egui::TextEdit::singleline(&mut self.form.hour).desired_width(24.0));
                ui.label(":");
                ui.add(egui::TextEdit::singleline(&mut self.form.minute).desired_width(24.0));
            });
            ui.end_row();

            ui.label("Exercise:");
            ui.text_edit_singleline(&mut self.form.exercise);
            ui.end_row();

            ui.label("Weight, kg:");
            ui.text_edit_singleline(&mut self.form.weight);
            ui.end_row();

            ui.label("Repetitions:");
            ui.text_edit_singleline(&mut self.form.repetitions);
            ui.end_row();
        });
        ui.horizontal(|ui| {
            if ui.button("Add entry").clicked() {
                self.add_entry();
            }
            if ui.button("View records").clicked() {
                self.view_all();
            }
        });
    }

    fn filter_controls(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("filter_grid").num_columns(2).show(ui, |ui| {
            ui.label("Start date:");
            ui.horizontal(|ui| {
                let mut start = self
                    .settings
                    .filter_start
                    .unwrap_or_else(|| Local::now().date_naive());
                if ui
                    .add(DatePickerButton::new(&mut start).id_source("filter_start"))
                    .changed()
                {
                    self.settings.filter_start = Some(start);
                    self.settings_dirty = true;
                }
                if self.settings.filter_start.is_some() && ui.button("Clear").clicked() {
                    self.settings.filter_start = None;
                    self.settings_dirty = true;
                }
            });
            ui.end_row();

            ui.label("End date:");
            ui.horizontal(|ui| {
                let mut end = self
                    .settings
                    .filter_end
                    .unwrap_or_else(|| Local::now().date_naive());
                if ui
                    .add(DatePickerButton::new(&mut end).id_source("filter_end"))
                    .changed()
                {
                    self.settings.filter_end = Some(end);
                    self.settings_dirty = true;
                }
                if self.settings.filter_end.is_some() && ui.button("Clear").clicked() {
                    self.settings.filter_end = None;
                    self.settings_dirty = true;
                }
            });
            ui.end_row();

            ui.label("Exercise filter:");
            ui.horizontal(|ui| {
                if ui
                    .text_edit_singleline(&mut self.settings.exercise_filter)
                    .changed()
                {
                    self.settings_dirty = true;
                }
                let exercises = self.exercises.clone();
                egui::ComboBox::from_id_source("exercise_filter_combo")
                    .selected_text("")
                    .width(20.0)
                    .show_ui(ui, |ui| {
                        for ex in exercises {
                            if ui
                                .selectable_label(self.settings.exercise_filter == ex, &ex)
                                .clicked()
                            {
                                self.settings.exercise_filter = ex;
                                self.settings_dirty = true;
                            }
                        }
                    });
            });
            ui.end_row();
        });
        ui.horizontal(|ui| {
            if ui.button("Filter records").clicked() {
                self.apply_filter();
            }
            if ui.button("Statistics").clicked() {
                self.show_statistics();
            }
            if ui.button("Charts").clicked() {
                self.show_charts();
            }
        });
    }

    fn csv_buttons(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Export to CSV").clicked() {
                if self.journal.is_empty() {
                    self.error("No data to export.");
                } else if let Some(path) = FileDialog::new()
                    .set_directory(&self.settings.csv_dir)
                    .set_file_name("training_log.csv")
                    .add_filter("CSV", &["csv"])
                    .save_file()
                {
                    self.export_to(&path);
                }
            }
            if ui.button("Import from CSV").clicked() {
                if let Some(path) = FileDialog::new()
                    .set_directory(&self.settings.csv_dir)
                    .add_filter("CSV", &["csv"])
                    .pick_file()
                {
                    self.import_from(&path);
                }
            }
        });
    }

    fn records_window(&mut self, ctx: &egui::Context) {
        let Some(mut view) = self.records.take() else {
            return;
        };
        let mut open = true;
        let mut edit = false;
        let mut delete = false;
        egui::Window::new("Workout records")
            .open(&mut open)
            .vscroll(true)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(format!("{} entries", view.entries.len()));
                    edit = ui.button("Edit").clicked();
                    delete = ui.button("Delete").clicked();
                });
                let row_height = ui.text_style_height(&egui::TextStyle::Body);
                egui_extras::TableBuilder::new(ui)
                    .striped(true)
                    .resizable(true)
                    .column(egui_extras::Column::auto())
                    .column(egui_extras::Column::auto())
                    .column(egui_extras::Column::auto())
                    .column(egui_extras::Column::auto())
                    .header(row_height, |mut header| {
                        header.col(|ui| {
                            ui.strong("Date");
                        });
                        header.col(|ui| {
                            ui.strong("Exercise");
                        });
                        header.col(|ui| {
                            ui.strong("Weight");
                        });
                        header.col(|ui| {
                            ui.strong("Repetitions");
                        });
                    })
                    .body(|mut body| {
                        for (idx, e) in view.entries.iter().enumerate() {
                            body.row(row_height, |mut row| {
                                row.col(|ui| {
                                    let selected = view.selected == Some(idx);
                                    if ui.selectable_label(selected, &e.datetime).clicked() {
                                        view.selected = Some(idx);
                                    }
                                });
                                row.col(|ui| {
                                    ui.label(&e.exercise);
                                });
                                row.col(|ui| {
                                    ui.label(&e.weight);
                                });
                                row.col(|ui| {
                                    ui.label(&e.repetitions);
                                });
                            });
                        }
                    });
            });
        if open {
            self.records = Some(view);
        }
        if edit {
            self.begin_edit();
        }
        if delete {
            self.request_delete();
        }
    }

    fn edit_window(&mut self, ctx: &egui::Context) {
        let Some(mut edit) = self.edit.take() else {
            return;
        };
        let mut open = true;
        let mut save = false;
        egui::Window::new("Edit entry")
            .open(&mut open)
            .collapsible(false)
            .show(ctx, |ui| {
                egui::Grid::new("edit_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Date and time:");
                    ui.text_edit_singleline(&mut edit.datetime);
                    ui.end_row();
                    ui.label("Exercise:");
                    ui.text_edit_singleline(&mut edit.exercise);
                    ui.end_row();
                    ui.label("Weight, kg:");
                    ui.text_edit_singleline(&mut edit.weight);
                    ui.end_row();
                    ui.label("Repetitions:");
                    ui.text_edit_singleline(&mut edit.repetitions);
                    ui.end_row();
                });
                save = ui.button("Save").clicked();
            });
        if open {
            self.edit = Some(edit);
        }
        if save {
            self.save_edit();
        }
    }

    fn confirm_window(&mut self, ctx: &egui::Context) {
        let Some(entry) = self.confirm_delete.clone() else {
            return;
        };
        let mut answer = None;
        egui::Window::new("Confirm")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Delete this entry?");
                ui.label(format!(
                    "{}  {}  {} kg x {}",
                    entry.datetime, entry.exercise, entry.weight, entry.repetitions
                ));
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        answer = Some(true);
                    }
                    if ui.button("No").clicked() {
                        answer = Some(false);
                    }
                });
            });
        if let Some(yes) = answer {
            self.confirm_delete = None;
            if yes {
                self.delete_entry(&entry);
            }
        }
    }

    fn statistics_window(&mut self, ctx: &egui::Context) {
        let Some(summary) = &self.summary else {
            return;
        };
        let mut open = true;
        egui::Window::new("Training statistics")
            .open(&mut open)
            .show(ctx, |ui| {
                ui.label(summary.total_line());
                ui.label(summary.repetitions_line());
                ui.separator();
                ui.label("Exercises:");
                for line in summary.exercise_lines() {
                    ui.label(line);
                }
                if summary.skipped > 0 {
                    ui.separator();
                    ui.label(format!(
                        "{} entries skipped (unreadable numbers)",
                        summary.skipped
                    ));
                }
            });
        if !open {
            self.summary = None;
        }
    }

    fn charts_window(&mut self, ctx: &egui::Context) {
        let Some(view) = &self.charts else {
            return;
        };
        let mut open = true;
        let mut open_folder = false;
        egui::Window::new("Progress charts")
            .open(&mut open)
            .vscroll(true)
            .show(ctx, |ui| {
                for metric in [Metric::Weight, Metric::Repetitions] {
                    ui.heading(metric.title());
                    let (line, markers) = metric_line(&view.series, metric);
                    Plot::new(metric.title())
                        .height(240.0)
                        .x_axis_formatter(|mark, _chars, _range| x_to_label(mark.value))
                        .y_axis_label(metric.axis_label())
                        .legend(Legend::default())
                        .show(ui, |plot_ui| {
                            plot_ui.line(line);
                            plot_ui.points(markers);
                        });
                }
                if let Some((weight, reps)) = &view.saved {
                    ui.separator();
                    ui.label(format!("Saved: {}", weight.display()));
                    ui.label(format!("Saved: {}", reps.display()));
                    open_folder = ui.button("Open folder").clicked();
                }
            });
        if open_folder {
            if let Err(e) = open::that(&self.settings.image_dir) {
                self.error(format!("Could not open {}: {e}", self.settings.image_dir));
            }
        }
        if !open {
            self.charts = None;
        }
    }

    fn message_window(&mut self, ctx: &egui::Context) {
        let Some(message) = &self.message else {
            return;
        };
        let title = match message.kind {
            MessageKind::Info => "Done",
            MessageKind::Error => "Error",
        };
        let mut close = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&message.text);
                close = ui.button("OK").clicked();
            });
        if close {
            self.message = None;
        }
    }
}

impl App for JournalApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open journal...").clicked() {
                        if let Some(path) = FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .pick_file()
                        {
                            self.settings.journal_path = path.display().to_string();
                            self.settings_dirty = true;
                            self.open_journal(&path);
                            self.records = None;
                        }
                        ui.close_menu();
                    }
                    if ui.button("Save journal as...").clicked() {
                        // Cancelling keeps the current journal file.
                        if let Some(path) = FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .set_file_name("training_log.json")
                            .save_file()
                        {
                            self.save_journal_as(path);
                        }
                        ui.close_menu();
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Training journal");
            ui.separator();
            self.entry_form(ui);
            ui.separator();
            self.filter_controls(ui);
            ui.separator();
            self.csv_buttons(ui);
            ui.separator();
            ui.label(format!(
                "{} entries in {}",
                self.journal.len(),
                self.settings.journal_path
            ));
        });

        self.records_window(ctx);
        self.edit_window(ctx);
        self.confirm_window(ctx);
        self.statistics_window(ctx);
        self.charts_window(ctx);
        self.message_window(ctx);

        if let Some(start) = self.toast_start {
            if start.elapsed() < Duration::from_secs(3) {
                if let Some(status) = &self.status {
                    egui::Area::new(egui::Id::new("status_toast"))
                        .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
                        .show(ctx, |ui| {
                            ui.label(status);
                        });
                }
                ctx.request_repaint_after(Duration::from_millis(250));
            } else {
                self.toast_start = None;
                self.status = None;
            }
        }

        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([560.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Training Journal",
        options,
        Box::new(|_cc| Box::new(JournalApp::default())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn test_settings(dir: &Path) -> Settings {
        Settings {
            journal_path: dir.join("training_log.json").display().to_string(),
            csv_dir: dir.join("files").display().to_string(),
            image_dir: dir.join("images").display().to_string(),
            ..Settings::default()
        }
    }

    fn fill_form(app: &mut JournalApp, exercise: &str, weight: &str, reps: &str) {
        app.form.date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        app.form.hour = "9".into();
        app.form.minute = "30".into();
        app.form.exercise = exercise.into();
        app.form.weight = weight.into();
        app.form.repetitions = reps.into();
    }

    fn message_kind(app: &JournalApp) -> Option<MessageKind> {
        app.message.as_ref().map(|m| m.kind)
    }

    #[test]
    fn settings_roundtrip() {
        let mut s = Settings::default();
        s.journal_path = "/tmp/log.json".into();
        s.chart_counter = 7;
        s.filter_start = Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        s.filter_end = Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        s.exercise_filter = "жим".into();

        let json = serde_json::to_string(&s).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, loaded);
    }

    #[test]
    fn settings_defaults_for_missing_fields() {
        let loaded: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded, Settings::default());
        assert_eq!(loaded.chart_counter, 1);
        assert_eq!(loaded.journal_path, "training_log.json");
    }

    #[test]
    fn settings_persistence() {
        use std::env;

        let _guard = ENV_MUTEX.lock().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let prev_config = env::var_os("XDG_CONFIG_HOME");
        unsafe {
            env::set_var("XDG_CONFIG_HOME", dir.path());
        }

        let mut s = Settings::default();
        s.chart_counter = 4;
        s.save();
        assert_eq!(Settings::load().chart_counter, 4);

        let path = Settings::path().unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load(), Settings::default());

        if let Some(val) = prev_config {
            unsafe {
                env::set_var("XDG_CONFIG_HOME", val);
            }
        } else {
            unsafe {
                env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn startup_creates_missing_journal_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let app = JournalApp::with_settings(test_settings(dir.path()));
        assert!(app.journal.is_empty());
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert!(dir.path().join("training_log.json").exists());
        assert!(dir.path().join("files").is_dir());
        assert!(dir.path().join("images").is_dir());
    }

    #[test]
    fn startup_backs_up_corrupt_journal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training_log.json");
        std::fs::write(&path, "[{broken").unwrap();
        let app = JournalApp::with_settings(test_settings(dir.path()));
        assert!(app.journal.is_empty());
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        let backup = dir.path().join("training_log.json.bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "[{broken");
    }

    #[test]
    fn add_entry_validates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = JournalApp::with_settings(test_settings(dir.path()));

        fill_form(&mut app, "Squat", "250", "5");
        app.add_entry();
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert!(app.journal.is_empty());

        fill_form(&mut app, "Squat", "100", "0");
        app.add_entry();
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert!(app.journal.is_empty());

        fill_form(&mut app, "Squat", "100", "5");
        app.add_entry();
        assert_eq!(message_kind(&app), Some(MessageKind::Info));
        assert_eq!(app.journal.len(), 1);
        assert_eq!(app.journal.entries()[0].datetime, "01/03/2024 09:30");
        assert!(app.form.exercise.is_empty());
        assert_eq!(app.exercises, vec!["Squat"]);

        let (on_disk, _) = Journal::load(app.journal_path()).unwrap();
        assert_eq!(on_disk, app.journal);
    }

    #[test]
    fn failed_save_leaves_journal_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = JournalApp::with_settings(test_settings(dir.path()));
        fill_form(&mut app, "Squat", "100", "5");
        app.add_entry();
        assert_eq!(app.journal.len(), 1);

        let path = app.journal_path();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        fill_form(&mut app, "Bench", "80", "8");
        app.add_entry();
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert_eq!(app.journal.len(), 1);
        assert_eq!(app.form.exercise, "Bench");
        app.add_entry();
        assert_eq!(app.journal.len(), 1);

        app.view_all();
        app.records.as_mut().unwrap().selected = Some(0);
        app.begin_edit();
        app.edit.as_mut().unwrap().weight = "120".into();
        app.save_edit();
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert_eq!(app.journal.entries()[0].weight, "100");
        assert!(app.edit.is_some());

        let target = app.journal.entries()[0].clone();
        app.delete_entry(&target);
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert_eq!(app.journal.len(), 1);
        assert_eq!(app.records.as_ref().unwrap().entries.len(), 1);
    }

    #[test]
    fn corrupt_journal_without_backup_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training_log.json");
        std::fs::write(&path, "[{broken").unwrap();
        std::fs::create_dir(dir.path().join("training_log.json.bak")).unwrap();

        let mut app = JournalApp::with_settings(test_settings(dir.path()));
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert!(app.message.as_ref().unwrap().text.contains("Could not back up"));

        fill_form(&mut app, "Squat", "100", "5");
        app.add_entry();
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert!(app.journal.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{broken");

        app.save_journal_as(path.clone());
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{broken");

        let fresh = dir.path().join("fresh.json");
        app.save_journal_as(fresh.clone());
        app.add_entry();
        assert_eq!(message_kind(&app), Some(MessageKind::Info));
        assert_eq!(Journal::load(&fresh).unwrap().0.len(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{broken");
    }

    #[test]
    fn edit_and_delete_selected_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = JournalApp::with_settings(test_settings(dir.path()));
        fill_form(&mut app, "Squat", "100", "5");
        app.add_entry();
        fill_form(&mut app, "Bench", "80", "8");
        app.add_entry();

        app.view_all();
        app.begin_edit();
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert!(app.edit.is_none());

        app.records.as_mut().unwrap().selected = Some(1);
        app.begin_edit();
        app.edit.as_mut().unwrap().weight = "82.5".into();
        app.save_edit();
        assert_eq!(message_kind(&app), Some(MessageKind::Info));
        assert!(app.edit.is_none());
        assert_eq!(app.journal.entries()[1].weight, "82.5");

        app.records.as_mut().unwrap().selected = Some(0);
        app.request_delete();
        let target = app.confirm_delete.clone().unwrap();
        app.delete_entry(&target);
        assert_eq!(app.journal.len(), 1);
        assert_eq!(app.journal.entries()[0].exercise, "Bench");
        assert_eq!(app.records.as_ref().unwrap().entries.len(), 1);
    }

    #[test]
    fn inverted_filter_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = JournalApp::with_settings(test_settings(dir.path()));
        app.message = None;
        app.settings.filter_start = NaiveDate::from_ymd_opt(2024, 3, 2);
        app.settings.filter_end = NaiveDate::from_ymd_opt(2024, 3, 1);
        app.apply_filter();
        assert!(app.records.is_none());
        assert_eq!(message_kind(&app), Some(MessageKind::Error));

        app.message = None;
        app.show_statistics();
        assert!(app.summary.is_none());
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
    }

    #[test]
    fn statistics_use_current_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = JournalApp::with_settings(test_settings(dir.path()));
        fill_form(&mut app, "Squat", "100", "5");
        app.add_entry();
        fill_form(&mut app, "Bench", "80", "8");
        app.add_entry();

        app.settings.exercise_filter = "SQU".into();
        app.show_statistics();
        let summary = app.summary.clone().unwrap();
        assert_eq!(summary.total_repetitions, 5);
        assert_eq!(summary.exercises.len(), 1);
    }

    #[test]
    fn csv_export_and_import_through_app() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = JournalApp::with_settings(test_settings(dir.path()));
        let csv_path = dir.path().join("files").join("export.csv");

        app.export_to(&csv_path);
        assert_eq!(message_kind(&app), Some(MessageKind::Error));

        fill_form(&mut app, "Squat", "100", "5");
        app.add_entry();
        app.export_to(&csv_path);
        assert_eq!(message_kind(&app), Some(MessageKind::Info));

        app.import_from(&csv_path);
        assert_eq!(message_kind(&app), Some(MessageKind::Info));
        assert_eq!(app.journal.len(), 2);
        assert_eq!(app.journal.entries()[0], app.journal.entries()[1]);

        let bad = dir.path().join("files").join("bad.csv");
        std::fs::write(&bad, "Дата,Упражнение,Вес,Повторения\n01/03/2024 10:00,Squat,0,5\n")
            .unwrap();
        app.import_from(&bad);
        assert_eq!(message_kind(&app), Some(MessageKind::Error));
        assert_eq!(app.journal.len(), 2);
    }

    #[test]
    fn charts_without_data_do_not_advance_counter() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = JournalApp::with_settings(test_settings(dir.path()));
        app.show_charts();
        assert!(app.charts.is_none());
        assert_eq!(app.settings.chart_counter, 1);
        assert_eq!(message_kind(&app), Some(MessageKind::Info));
    }

    #[test]
    fn save_as_switches_journal_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = JournalApp::with_settings(test_settings(dir.path()));
        fill_form(&mut app, "Squat", "100", "5");
        app.add_entry();

        let other = dir.path().join("copy").join("journal.json");
        app.save_journal_as(other.clone());
        assert_eq!(app.journal_path(), other);
        assert!(app.settings_dirty);
        let (copy, _) = Journal::load(&other).unwrap();
        assert_eq!(copy.len(), 1);
    }
}
