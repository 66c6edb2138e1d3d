use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use egui_plot::{Line, MarkerShape, PlotPoints, Points};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::journal::Entry;

const CHART_SIZE: (u32, u32) = (800, 600);

/// Which value of an entry a chart shows on the y-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Weight,
    Repetitions,
}

impl Metric {
    pub fn title(self) -> &'static str {
        match self {
            Metric::Weight => "Weight change",
            Metric::Repetitions => "Repetitions change",
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            Metric::Weight => "Weight (kg)",
            Metric::Repetitions => "Repetitions",
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            Metric::Weight => "weight_chart",
            Metric::Repetitions => "repetitions_chart",
        }
    }
}

#[derive(Debug)]
pub enum PlotError {
    NoData,
    Io(std::io::Error),
    Draw(String),
}

impl std::fmt::Display for PlotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlotError::NoData => write!(f, "No data to plot"),
            PlotError::Io(e) => write!(f, "{e}"),
            PlotError::Draw(e) => write!(f, "Failed to draw chart: {e}"),
        }
    }
}

impl std::error::Error for PlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlotError::Io(e) => Some(e),
            PlotError::NoData | PlotError::Draw(_) => None,
        }
    }
}

impl From<std::io::Error> for PlotError {
    fn from(e: std::io::Error) -> Self {
        PlotError::Io(e)
    }
}

/// Convert a timestamp to fractional days since the common era, the x unit
/// shared by the in-app plots and the PNG charts.
pub fn timestamp_to_x(ts: NaiveDateTime) -> f64 {
    ts.date().num_days_from_ce() as f64 + ts.time().num_seconds_from_midnight() as f64 / 86_400.0
}

pub fn x_to_label(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.floor() as i32)
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| format!("{x:.0}"))
}

/// Plot data for weight and repetitions, sorted by time.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChartSeries {
    pub weight: Vec<[f64; 2]>,
    pub repetitions: Vec<[f64; 2]>,
}

impl ChartSeries {
    pub fn points(&self, metric: Metric) -> &[[f64; 2]] {
        match metric {
            Metric::Weight => &self.weight,
            Metric::Repetitions => &self.repetitions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weight.is_empty()
    }
}

/// Build chart series from `entries`. Entries whose date or numbers cannot be
/// parsed are left out.
pub fn series(entries: &[Entry]) -> ChartSeries {
    let mut rows: Vec<(NaiveDateTime, f64, u32)> = entries
        .iter()
        .filter_map(|e| Some((e.timestamp()?, e.weight_kg()?, e.reps()?)))
        .collect();
    rows.sort_by_key(|(ts, _, _)| *ts);

    let mut out = ChartSeries::default();
    for (ts, weight, reps) in rows {
        let x = timestamp_to_x(ts);
        out.weight.push([x, weight]);
        out.repetitions.push([x, reps as f64]);
    }
    out
}

/// Line and point markers for the in-app plot.
pub fn metric_line(series: &ChartSeries, metric: Metric) -> (Line, Points) {
    let color = match metric {
        Metric::Weight => egui::Color32::LIGHT_BLUE,
        Metric::Repetitions => egui::Color32::LIGHT_GREEN,
    };
    let pts = series.points(metric).to_vec();
    let line = Line::new(PlotPoints::from(pts.clone()))
        .color(color)
        .name(metric.axis_label());
    let markers = Points::new(pts)
        .shape(MarkerShape::Circle)
        .radius(3.0)
        .color(color);
    (line, markers)
}

fn axis_bounds(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}

fn draw_chart(
    points: &[[f64; 2]],
    metric: Metric,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (x0, x1) = axis_bounds(points.iter().map(|p| p[0]));
    let (y0, y1) = axis_bounds(points.iter().map(|p| p[1]));
    let color = match metric {
        Metric::Weight => BLUE,
        Metric::Repetitions => GREEN,
    };
    let mut chart = ChartBuilder::on(&root)
        .caption(metric.title(), ("sans-serif", 25))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart
        .configure_mesh()
        .x_label_formatter(&|x| x_to_label(*x))
        .y_desc(metric.axis_label())
        .draw()?;
    chart
        .draw_series(LineSeries::new(points.iter().map(|p| (p[0], p[1])), &color))?
        .label(metric.axis_label())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    chart.draw_series(
        points
            .iter()
            .map(|p| Circle::new((p[0], p[1]), 4, color.filled())),
    )?;
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

pub fn chart_path(dir: &Path, metric: Metric, id: u32) -> PathBuf {
    dir.join(format!("{}_{id}.png", metric.file_stem()))
}

/// Render the weight and repetition charts for `entries` into `dir`.
///
/// Returns the paths of the weight chart and the repetition chart.
pub fn save_charts(entries: &[Entry], dir: &Path, id: u32) -> Result<(PathBuf, PathBuf), PlotError> {
    let series = series(entries);
    if series.is_empty() {
        return Err(PlotError::NoData);
    }
    std::fs::create_dir_all(dir)?;
    let render = |metric: Metric| -> Result<PathBuf, PlotError> {
        let path = chart_path(dir, metric, id);
        draw_chart(series.points(metric), metric, &path)
            .map_err(|e| PlotError::Draw(e.to_string()))?;
        log::info!("Saved {:?} chart to {}", metric, path.display());
        Ok(path)
    };
    let weight = render(Metric::Weight)?;
    let repetitions = render(Metric::Repetitions)?;
    Ok((weight, repetitions))
}
