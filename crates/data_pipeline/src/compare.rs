//! Side-by-side check of an export against a reference series.
//!
//! Each period collapses to the sum of its row values, so a scalar file and a grouped file
//! can be compared directly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::{MonthKey, SeriesDocument, ValueRow};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareOptions {
    /// Periods before this month are left out.
    pub since: MonthKey,
    /// Smallest absolute difference worth listing.
    pub threshold: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        CompareOptions {
            since: MonthKey::january(2023),
            threshold: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthDifference {
    pub period: MonthKey,
    pub difference: f64,
    pub test_value: f64,
    pub reference_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub compared: usize,
    pub matched: usize,
    /// Percentage of compared periods whose totals are exactly equal.
    pub accuracy: f64,
    /// Sum of `test - reference` over every compared period.
    pub total_difference: f64,
    pub months_with_differences: Vec<MonthDifference>,
}

fn period_totals(doc: &SeriesDocument<ValueRow>) -> BTreeMap<MonthKey, f64> {
    let mut totals = BTreeMap::new();
    for entry in doc.series() {
        *totals.entry(entry.period).or_insert(0.0) +=
            entry.rows.iter().map(|r| r.value).sum::<f64>();
    }
    totals
}

/// Compares the periods present in both documents from `options.since` onwards.
pub fn compare_series(
    test: &SeriesDocument<ValueRow>,
    reference: &SeriesDocument<ValueRow>,
    options: &CompareOptions,
) -> ComparisonReport {
    let test = period_totals(test);
    let reference = period_totals(reference);

    let mut compared = 0;
    let mut matched = 0;
    let mut total_difference = 0.0;
    let mut months_with_differences = Vec::new();

    for (period, test_value) in test.range(options.since..) {
        let Some(reference_value) = reference.get(period) else {
            continue;
        };
        let difference = test_value - reference_value;

        if test_value == reference_value {
            matched += 1;
        } else if difference.abs() >= options.threshold {
            months_with_differences.push(MonthDifference {
                period: *period,
                difference,
                test_value: *test_value,
                reference_value: *reference_value,
            });
        }
        compared += 1;
        total_difference += difference;
    }

    let accuracy = if compared > 0 {
        matched as f64 / compared as f64 * 100.0
    } else {
        0.0
    };

    ComparisonReport {
        compared,
        matched,
        accuracy,
        total_difference,
        months_with_differences,
    }
}

/// Reads a series file. Extra row fields such as `group_id` are ignored.
pub fn read_series<P: AsRef<Path>>(path: P) -> Result<SeriesDocument<ValueRow>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Parsing series JSON in {}", path.display()))
}

/// The newest `<prefix>*` directory under `root`, going by name. Dated names sort chronologically.
pub fn latest_export_dir(root: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    let entries =
        fs::read_dir(root).with_context(|| format!("Reading export root: {}", root.display()))?;

    let mut latest: Option<(String, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }
        if latest.as_ref().is_none_or(|(best, _)| name > *best) {
            latest = Some((name, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}
