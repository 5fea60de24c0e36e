//! CSV rendering for the weight and daily activity exports
//!
//! The layout matches the import format of the target service: a section
//! row (`Body` / `Activities`), a header row, then one row per day.

use crate::{ActivityMetricsDay, WeightEntry};
use csv::WriterBuilder;
use tracing::debug;

use super::{CsvRows, OutputError, OutputResult};

impl CsvRows for WeightEntry {
    const SECTION: &'static str = "Body";
    const HEADER: &'static [&'static str] = &["Date", "Weight", "BMI", "Fat"];

    fn record(&self) -> Vec<String> {
        vec![
            self.date.to_string(),
            self.weight.to_string(),
            self.bmi.to_string(),
            // Scales without body fat measurement report nothing
            self.fat.map_or_else(|| "0".to_string(), |fat| fat.to_string()),
        ]
    }
}

impl CsvRows for ActivityMetricsDay {
    const SECTION: &'static str = "Activities";
    const HEADER: &'static [&'static str] = &[
        "Date",
        "Calories Burned",
        "Steps",
        "Distance",
        "Floors",
        "Minutes Sedentary",
        "Minutes Lightly Active",
        "Minutes Fairly Active",
        "Minutes Very Active",
        "Activity Calories",
    ];

    fn record(&self) -> Vec<String> {
        vec![
            self.date.to_string(),
            self.calories.to_string(),
            self.steps.to_string(),
            self.distance.to_string(),
            self.floors.to_string(),
            self.minutes_sedentary.to_string(),
            self.minutes_lightly_active.to_string(),
            self.minutes_fairly_active.to_string(),
            self.minutes_very_active.to_string(),
            self.activity_calories.to_string(),
        ]
    }
}

/// Render `rows` into the sectioned CSV layout
pub fn render_csv<T: CsvRows>(rows: &[T]) -> OutputResult<Vec<u8>> {
    // The section row has one field while the rest have many
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record([T::SECTION])
        .map_err(|e| OutputError::CsvError(e.to_string()))?;
    writer
        .write_record(T::HEADER)
        .map_err(|e| OutputError::CsvError(e.to_string()))?;
    for row in rows {
        writer
            .write_record(row.record())
            .map_err(|e| OutputError::CsvError(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| OutputError::CsvError(format!("Failed to flush CSV buffer: {e}")))?;
    debug!(section = T::SECTION, rows = rows.len(), "CSV rendered");
    Ok(bytes)
}
