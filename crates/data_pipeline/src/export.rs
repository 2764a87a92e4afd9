use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use models::{ExportFileNames, ExportSettings, GroupRow, SeriesDocument, ValueRow};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::aggregate::MonthlyAggregation;
use crate::error::{ExportError, Result};
use crate::series::{format_grouped, format_totals};

const INDENT: &[u8] = b"    ";

/// The four documents written by one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    pub all: SeriesDocument<ValueRow>,
    pub no_launch: SeriesDocument<ValueRow>,
    pub filtered: SeriesDocument<ValueRow>,
    pub by_group: SeriesDocument<GroupRow>,
}

impl ExportBundle {
    pub fn build(
        aggregation: &MonthlyAggregation,
        settings: &ExportSettings,
        today: NaiveDate,
    ) -> Self {
        let start = settings.start_month;
        ExportBundle {
            all: format_totals(&aggregation.all, start, today),
            no_launch: format_totals(&aggregation.no_launch, start, today),
            filtered: format_totals(&aggregation.filtered, start, today),
            by_group: format_grouped(&aggregation.by_group, start, today),
        }
    }

    /// Number of months covered; identical across the four documents.
    pub fn months(&self) -> usize {
        self.all.series().len()
    }
}

/// `<export_root>/<prefix><YYYY-MM-DD>`
pub fn export_dir(settings: &ExportSettings, today: NaiveDate) -> PathBuf {
    settings.export_root.join(format!(
        "{}{}",
        settings.export_dir_prefix,
        today.format("%Y-%m-%d")
    ))
}

/// Pretty JSON with four-space indentation and a trailing newline
pub fn to_pretty_json<T: Serialize>(value: &T, name: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value
        .serialize(&mut ser)
        .map_err(|source| ExportError::Serialize {
            name: name.to_string(),
            source,
        })?;
    buf.push(b'\n');
    Ok(buf)
}

/// Serializes all four documents, then creates `dir` and writes them.
///
/// Nothing touches the filesystem until every document has serialized, so a serialization
/// error leaves no partial export behind. Returns the written paths in a fixed order.
pub fn write_bundle(
    dir: &Path,
    names: &ExportFileNames,
    bundle: &ExportBundle,
) -> Result<Vec<PathBuf>> {
    let outputs = [
        (&names.all, to_pretty_json(&bundle.all, &names.all)?),
        (&names.no_launch, to_pretty_json(&bundle.no_launch, &names.no_launch)?),
        (&names.filtered, to_pretty_json(&bundle.filtered, &names.filtered)?),
        (&names.by_group, to_pretty_json(&bundle.by_group, &names.by_group)?),
    ];

    fs::create_dir_all(dir).map_err(|source| ExportError::WriteFailure {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(outputs.len());
    for (name, bytes) in outputs {
        let path = dir.join(name);
        fs::write(&path, bytes).map_err(|source| ExportError::WriteFailure {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote series");
        written.push(path);
    }
    Ok(written)
}
