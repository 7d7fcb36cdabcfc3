//! Plain-text rendering for the terminal.
//!
//! Every function here returns a `String`; callers decide where it goes.
//! Absent values are shown as `N/A`.

use std::collections::BTreeMap;

use crate::models::{
    Headline, HistoricObservation, HourlyForecast, IndexEntry, Task, TaskStatus, WeatherReport,
};
use crate::normalize::format_celsius;
use crate::outputs::listing::{SavedFile, format_file_size};
use crate::stats::{Summary, WeatherStats};
use crate::utils::{NOT_AVAILABLE, ellipsize, or_na};

/// Width of the longest bar in [`temperature_chart`].
const CHART_WIDTH: usize = 50;

/// A titled table with left-aligned, auto-sized columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    title: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: &str, headers: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; missing trailing cells render empty.
    pub fn row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) -> &mut Self {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let cols = self
            .rows
            .iter()
            .map(Vec::len)
            .chain([self.headers.len()])
            .max()
            .unwrap_or(0);
        let mut widths = vec![0; cols];
        for line in std::iter::once(&self.headers).chain(&self.rows) {
            for (i, cell) in line.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let fmt_line = |cells: &[String]| {
            let padded: Vec<String> = (0..cols)
                .map(|i| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    format!("{cell:<width$}", width = widths[i])
                })
                .collect();
            format!("| {} |", padded.join(" | "))
        };
        let rule = format!(
            "+{}+",
            widths
                .iter()
                .map(|w| "-".repeat(w + 2))
                .collect::<Vec<_>>()
                .join("+")
        );

        let mut out = String::new();
        if !self.title.is_empty() {
            out.push_str(&self.title);
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
        if !self.headers.is_empty() {
            out.push_str(&fmt_line(&self.headers));
            out.push('\n');
            out.push_str(&rule);
            out.push('\n');
        }
        for row in &self.rows {
            out.push_str(&fmt_line(row));
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
        out
    }
}

fn celsius_or_na(value: Option<f64>) -> String {
    value.map(format_celsius).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Current conditions followed by the hourly forecast, if any.
pub fn weather_report(report: &WeatherReport) -> String {
    let mut table = Table::new(&format!("Weather for {}", report.location), &["Field", "Value"]);
    table
        .row(["Temperature".to_string(), format_celsius(report.current_temp_c)])
        .row(["Condition".to_string(), or_na(report.condition.as_deref())])
        .row(["Feels like".to_string(), celsius_or_na(report.feels_like_c)])
        .row(["High".to_string(), celsius_or_na(report.forecast_high_c)])
        .row(["Low".to_string(), celsius_or_na(report.forecast_low_c)])
        .row(["Humidity".to_string(), or_na(report.humidity.as_deref())])
        .row(["Wind".to_string(), or_na(report.wind.as_deref())])
        .row(["Pressure".to_string(), or_na(report.pressure.as_deref())])
        .row(["Visibility".to_string(), or_na(report.visibility.as_deref())])
        .row(["Scraped at".to_string(), report.timestamp.clone()]);

    let mut out = table.render();
    if !report.hourly_forecast.is_empty() {
        out.push('\n');
        out.push_str(&hourly(&report.hourly_forecast));
    }
    out
}

pub fn hourly(hours: &[HourlyForecast]) -> String {
    let mut table = Table::new("Hourly forecast", &["Time", "Temp", "Condition"]);
    for h in hours {
        table.row([h.time.clone(), format_celsius(h.temperature_c), h.condition.clone()]);
    }
    table.render()
}

/// Historic, range or 24-hour observations. The date and target-slot
/// columns only appear when some row has them.
pub fn observations(title: &str, rows: &[HistoricObservation]) -> String {
    if rows.is_empty() {
        return format!("{title}\nNo observations available.\n");
    }
    let dated = rows.iter().any(|r| r.date.is_some());
    let targeted = rows.iter().any(|r| r.target_time.is_some());

    let mut headers = Vec::new();
    if dated {
        headers.push("Date");
    }
    if targeted {
        headers.push("Target");
    }
    headers.extend(["Time", "Temp", "Weather", "Wind", "Humidity", "Barometer", "Visibility"]);

    let mut table = Table::new(title, &headers);
    for r in rows {
        let mut cells = Vec::with_capacity(headers.len());
        if dated {
            cells.push(or_na(r.date.as_deref()));
        }
        if targeted {
            cells.push(or_na(r.target_time.as_deref()));
        }
        cells.extend([
            r.time.clone(),
            celsius_or_na(r.temperature_c),
            or_na(r.weather.as_deref()),
            or_na(r.wind.as_deref()),
            r.humidity_pct
                .map(|h| format!("{h}%"))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            or_na(r.barometer.as_deref()),
            or_na(r.visibility.as_deref()),
        ]);
        table.row(cells);
    }
    table.render()
}

fn summary_lines(label: &str, unit: &str, summary: &Summary) -> String {
    format!(
        "{label}:\n  Average: {:.1}{unit}\n  Minimum: {:.1}{unit}\n  Maximum: {:.1}{unit}\n  Readings: {}\n",
        summary.avg, summary.min, summary.max, summary.count
    )
}

pub fn stats(title: &str, stats: &WeatherStats) -> String {
    let mut out = format!("{title}\n");
    if stats.is_empty() {
        out.push_str("No statistical data available.\n");
        return out;
    }
    if let Some(t) = &stats.temperature {
        out.push_str(&summary_lines("Temperature", "°C", t));
    }
    if let Some(h) = &stats.humidity {
        out.push_str(&summary_lines("Humidity", "%", h));
    }
    if let Some(w) = &stats.weather {
        out.push_str(&format!("Weather:\n  Most common: {}\n", w.most_common));
        for (condition, count) in &w.counts {
            out.push_str(&format!("  - {condition}: {count} times\n"));
        }
    }
    out
}

/// Horizontal bar chart of `(label, °C)` points. Bars are scaled between
/// the coldest and warmest reading; the coldest still gets one block.
pub fn temperature_chart(title: &str, points: &[(String, f64)]) -> String {
    if points.is_empty() {
        return format!("{title}\nNo temperature data available for plotting.\n");
    }
    let min = points.iter().map(|(_, t)| *t).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|(_, t)| *t).fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(f64::EPSILON);
    let label_width = points.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);

    let mut out = format!("{title}\n");
    for (label, temp) in points {
        let len = 1 + (((temp - min) / span) * (CHART_WIDTH - 1) as f64).round() as usize;
        out.push_str(&format!(
            "{label:>label_width$} | {} {}\n",
            "#".repeat(len),
            format_celsius(*temp)
        ));
    }
    out
}

/// Chart plus min/max/average analysis for a 24-hour series.
pub fn plot_24h(location: &str, rows: &[HistoricObservation]) -> String {
    let points: Vec<(String, f64)> = rows
        .iter()
        .filter_map(|r| r.temperature_c.map(|t| (r.time.clone(), t)))
        .collect();
    let mut out = temperature_chart(&format!("24-hour temperature, {location}"), &points);
    let (Some(coldest), Some(warmest)) = (
        points.iter().min_by(|a, b| a.1.total_cmp(&b.1)),
        points.iter().max_by(|a, b| a.1.total_cmp(&b.1)),
    ) else {
        return out;
    };
    let avg = points.iter().map(|(_, t)| t).sum::<f64>() / points.len() as f64;
    out.push_str(&format!(
        "\nMinimum: {} at {}\nMaximum: {} at {}\nAverage: {}\nRange: {:.0}°C\nData points: {}\n",
        format_celsius(coldest.1),
        coldest.0,
        format_celsius(warmest.1),
        warmest.0,
        format_celsius(avg),
        warmest.1 - coldest.1,
        points.len()
    ));
    out
}

pub fn details(location: &str, details: &BTreeMap<String, String>) -> String {
    let mut table = Table::new(&format!("Details for {location}"), &["Field", "Value"]);
    for (k, v) in details {
        table.row([k.as_str(), v.as_str()]);
    }
    table.render()
}

/// Pending and completed tasks as two tables.
pub fn tasks<'a>(tasks: impl IntoIterator<Item = (u32, &'a Task)>) -> String {
    let mut pending = Table::new("Pending tasks", &["Key", "Task", "Created"]);
    let mut completed = Table::new("Completed tasks", &["Key", "Task", "Created"]);
    for (key, task) in tasks {
        let target = match task.status {
            TaskStatus::Pending => &mut pending,
            TaskStatus::Completed => &mut completed,
        };
        target.row([key.to_string(), task.task.clone(), task.datetime.clone()]);
    }

    let mut out = String::new();
    for table in [&pending, &completed] {
        if table.is_empty() {
            out.push_str(&format!("{}: none\n", table.title));
        } else {
            out.push_str(&table.render());
        }
    }
    out
}

pub fn headlines(items: &[Headline]) -> String {
    if items.is_empty() {
        return "No headlines found.\n".to_string();
    }
    let mut table = Table::new("Headlines", &["#", "Title", "Link"]);
    for (i, h) in items.iter().enumerate() {
        table.row([(i + 1).to_string(), ellipsize(&h.title, 80), h.link.clone()]);
    }
    table.render()
}

pub fn cities(country: &str, cities: &[String]) -> String {
    if cities.is_empty() {
        return format!("No cities found for {country}.\n");
    }
    let mut table = Table::new(&format!("Cities in {country} ({})", cities.len()), &["#", "City"]);
    for (i, c) in cities.iter().enumerate() {
        table.row([(i + 1).to_string(), c.clone()]);
    }
    table.render()
}

pub fn saved_files(files: &[SavedFile]) -> String {
    if files.is_empty() {
        return "No saved files found.\n".to_string();
    }
    let mut table = Table::new("Saved files", &["Format", "File", "Size", "Modified"]);
    for f in files {
        table.row([
            f.format.label().to_string(),
            f.name(),
            format_file_size(f.size),
            f.modified
                .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ]);
    }
    table.render()
}

pub fn journal_files(files: &[(String, IndexEntry)]) -> String {
    if files.is_empty() {
        return "No journals found.\n".to_string();
    }
    let mut table = Table::new("Journal files", &["File", "Created", "Last modified"]);
    for (name, entry) in files {
        table.row([name.as_str(), entry.created_at.as_str(), entry.last_modified.as_str()]);
    }
    table.render()
}

/// Accepted location and date formats.
pub fn formats() -> String {
    let mut locations = Table::new("Location format: Country/City", &["Example", "Country", "City"]);
    for example in ["Japan/Tokyo", "UK/London", "USA/New York", "India/Mumbai"] {
        let (country, city) = example.split_once('/').unwrap_or((example, ""));
        locations.row([example, country, city]);
    }
    let mut dates = Table::new("Date formats", &["Format", "Example"]);
    dates
        .row(["YYYY-MM-DD", "2025-05-06"])
        .row(["YYYYMMDD", "20250506"])
        .row(["MM/DD/YYYY", "05/06/2025"])
        .row(["DD/MM/YYYY", "06/05/2025"])
        .row(["YYYY/MM/DD", "2025/05/06"])
        .row(["today, yesterday, tomorrow", "yesterday"]);
    format!("{}\n{}", locations.render(), dates.render())
}

pub const WEATHER_MENU: &str = "\
Weather menu
  1. Today's weather
  2. Historic weather (specific date)
  3. Weather range (06:00, 12:00, 18:00, 00:00)
  4. Last 24 hours plot
  5. Save last result
  6. List cities
  7. Saved files
  8. Statistics for last result
  9. Change location
  0. Exit";

pub const TODO_MENU: &str = "\
To-do menu
  1. Add task
  2. View tasks
  3. Delete task
  4. Toggle task status
  5. Renumber tasks
  0. Exit";
