//! Expense export pipeline: fetch → aggregate → format → write.
//!
//! [`run`] is the whole export in one call. The pieces are public so the comparison tooling
//! and tests can drive them separately.

pub mod aggregate;
pub mod compare;
pub mod error;
pub mod export;
pub mod series;

use std::path::PathBuf;

use accounting_client::TransactionSource;
use chrono::NaiveDate;
use models::ExportSettings;

pub use crate::aggregate::{aggregate, AggregationRules, MonthlyAggregation};
pub use crate::error::{ExportError, Result};
pub use crate::export::{export_dir, write_bundle, ExportBundle};

/// What a successful run produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub output_dir: PathBuf,
    pub fetched: usize,
    pub aggregated: usize,
    pub months: usize,
    pub files: Vec<PathBuf>,
}

/// Runs one export.
///
/// `today` is captured once by the caller; it names the output directory and bounds every
/// series, so two runs with the same input and the same `today` write identical files.
pub fn run<S>(settings: &ExportSettings, source: &S, today: NaiveDate) -> Result<ExportSummary>
where
    S: TransactionSource + ?Sized,
{
    let transactions = source.fetch_transactions()?;

    let rules = AggregationRules::from_settings(settings);
    let aggregation = aggregate(&transactions, &rules)?;
    tracing::info!(
        fetched = transactions.len(),
        aggregated = aggregation.counted,
        token = %settings.target_token,
        "aggregated transactions"
    );

    let bundle = ExportBundle::build(&aggregation, settings, today);
    let output_dir = export_dir(settings, today);
    let files = write_bundle(&output_dir, &settings.file_names, &bundle)?;
    tracing::info!(
        dir = %output_dir.display(),
        months = bundle.months(),
        "export written"
    );

    Ok(ExportSummary {
        output_dir,
        fetched: transactions.len(),
        aggregated: aggregation.counted,
        months: bundle.months(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use accounting_client::{ClientError, StatusCode};
    use models::{GroupRow, SeriesDocument, Transaction, ValueRow};
    use std::fs;

    struct StaticSource(Vec<Transaction>);

    impl TransactionSource for StaticSource {
        fn fetch_transactions(&self) -> accounting_client::Result<Vec<Transaction>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    impl TransactionSource for BrokenSource {
        fn fetch_transactions(&self) -> accounting_client::Result<Vec<Transaction>> {
            Err(ClientError::Status {
                url: "http://accounting.test/expenses".to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            })
        }
    }

    fn txn(datetime: &str, amount: f64, group_id: &str) -> Transaction {
        Transaction {
            token: "DAI".to_string(),
            datetime: datetime.to_string(),
            amount,
            group_id: group_id.to_string(),
        }
    }

    fn settings_in(root: &std::path::Path) -> ExportSettings {
        ExportSettings {
            export_root: root.to_path_buf(),
            ..ExportSettings::default()
        }
    }

    #[test]
    fn test_run_writes_four_gap_filled_files() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        let today = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let source = StaticSource(vec![
            txn("2022-05-10T00:00:00.000000Z", 100.0, "LAUNCH"),
            txn("2022-05-15T00:00:00.000000Z", 50.0, "OPS"),
            txn("2023-01-02T08:00:00.000000Z", 25.0, "ECOSYSTEM"),
        ]);

        let summary = run(&settings, &source, today).unwrap();
        assert_eq!(summary.output_dir, root.path().join("export_2024-03-12"));
        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.aggregated, 3);
        assert_eq!(summary.months, 39);
        assert_eq!(summary.files.len(), 4);

        let read_values = |name: &str| -> Vec<f64> {
            let raw = fs::read_to_string(summary.output_dir.join(name)).unwrap();
            let doc: SeriesDocument<ValueRow> = serde_json::from_str(&raw).unwrap();
            doc.series().iter().map(|e| e.rows[0].value).collect()
        };
        let names = &settings.file_names;

        // 2022/05 is index 16, 2023/01 is index 24.
        let all = read_values(&names.all);
        assert_eq!(all.len(), 39);
        assert_eq!(all[16], 150.0);
        assert_eq!(all[24], 25.0);
        assert_eq!(all.iter().sum::<f64>(), 175.0);

        let no_launch = read_values(&names.no_launch);
        assert_eq!(no_launch[16], 50.0);
        assert_eq!(no_launch[24], 25.0);

        let filtered = read_values(&names.filtered);
        assert_eq!(filtered[16], 150.0);
        assert_eq!(filtered[24], 0.0);

        let raw = fs::read_to_string(summary.output_dir.join(&names.by_group)).unwrap();
        let grouped: SeriesDocument<GroupRow> = serde_json::from_str(&raw).unwrap();
        assert_eq!(grouped.series().len(), 39);
        assert!(grouped.series()[0].rows.is_empty());
        assert_eq!(
            grouped.series()[16].rows,
            vec![
                GroupRow {
                    group_id: "LAUNCH".to_string(),
                    value: 100.0
                },
                GroupRow {
                    group_id: "OPS".to_string(),
                    value: 50.0
                },
            ]
        );
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        let today = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        let source = StaticSource(vec![
            txn("2023-06-10T00:00:00.000000Z", 1.1, "B"),
            txn("2023-06-11T00:00:00.000000Z", 2.2, "A"),
        ]);

        let first = run(&settings, &source, today).unwrap();
        let before: Vec<Vec<u8>> = first.files.iter().map(|p| fs::read(p).unwrap()).collect();

        let second = run(&settings, &source, today).unwrap();
        let after: Vec<Vec<u8>> = second.files.iter().map(|p| fs::read(p).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_fetch_failure_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let err = run(&settings, &BrokenSource, today).unwrap_err();
        assert!(matches!(err, ExportError::FetchFailure(_)), "unexpected error: {err}");
        assert!(!export_dir(&settings, today).exists());
    }

    #[test]
    fn test_malformed_timestamp_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let source = StaticSource(vec![
            txn("2023-06-10T00:00:00.000000Z", 1.0, "OPS"),
            txn("10/06/2023", 1.0, "OPS"),
        ]);

        let err = run(&settings, &source, today).unwrap_err();
        assert!(
            matches!(err, ExportError::MalformedTimestamp { .. }),
            "unexpected error: {err}"
        );
        assert!(!export_dir(&settings, today).exists());
    }

    #[test]
    fn test_decode_error_maps_to_malformed_response() {
        let source_err = serde_json::from_str::<Vec<Transaction>>("{}").unwrap_err();
        let err = ExportError::from(ClientError::Decode {
            url: "http://accounting.test".to_string(),
            source: source_err,
        });
        assert!(matches!(err, ExportError::MalformedResponse(_)));
    }
}
