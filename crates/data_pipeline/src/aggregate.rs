//! Monthly aggregation of raw transactions.
//!
//! One pass over the transaction list fills four accumulators side by side:
//!
//! - `all`: every transaction in the target token
//! - `no_launch`: the same, minus the launch/interim phase markers
//! - `filtered`: the same, minus the non-operational deny-list
//! - `by_group`: every transaction, split by group id
//!
//! A month seen once gets an entry in all four, even when a filter removes everything in it.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use models::{ExportSettings, MonthKey, Transaction};

use crate::error::{ExportError, Result};

/// `2022-05-10T00:00:00.000000Z`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

// `%.f` alone also accepts a missing fraction or one of any length.
const MAX_FRACTION_DIGITS: usize = 6;

pub type MonthlyTotals = BTreeMap<MonthKey, f64>;
pub type GroupedTotals = BTreeMap<MonthKey, BTreeMap<String, f64>>;

/// Decides which transactions count and which series each one feeds.
#[derive(Debug, Clone)]
pub struct AggregationRules<'a> {
    target_token: &'a str,
    no_launch_groups: HashSet<&'a str>,
    excluded_group_ids: HashSet<&'a str>,
}

impl<'a> AggregationRules<'a> {
    pub fn new(
        target_token: &'a str,
        no_launch_groups: &'a [String],
        excluded_group_ids: &'a [String],
    ) -> Self {
        AggregationRules {
            target_token,
            no_launch_groups: no_launch_groups.iter().map(String::as_str).collect(),
            excluded_group_ids: excluded_group_ids.iter().map(String::as_str).collect(),
        }
    }

    pub fn from_settings(settings: &'a ExportSettings) -> Self {
        Self::new(
            &settings.target_token,
            &settings.no_launch_groups,
            &settings.excluded_group_ids,
        )
    }

    fn is_target(&self, txn: &Transaction) -> bool {
        txn.token == self.target_token
    }

    fn counts_toward_no_launch(&self, group_id: &str) -> bool {
        !self.no_launch_groups.contains(group_id)
    }

    fn counts_toward_filtered(&self, group_id: &str) -> bool {
        !self.excluded_group_ids.contains(group_id)
    }
}

/// The four accumulators produced by [`aggregate`]. Sums are kept at full precision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyAggregation {
    pub all: MonthlyTotals,
    pub no_launch: MonthlyTotals,
    pub filtered: MonthlyTotals,
    pub by_group: GroupedTotals,
    /// Number of transactions that passed the token filter.
    pub counted: usize,
}

impl MonthlyAggregation {
    fn record(&mut self, month: MonthKey, txn: &Transaction, rules: &AggregationRules<'_>) {
        let amount = txn.amount;
        let group_id = txn.group_id.as_str();

        *self.all.entry(month).or_insert(0.0) += amount;

        let no_launch = self.no_launch.entry(month).or_insert(0.0);
        if rules.counts_toward_no_launch(group_id) {
            *no_launch += amount;
        }

        let filtered = self.filtered.entry(month).or_insert(0.0);
        if rules.counts_toward_filtered(group_id) {
            *filtered += amount;
        }

        *self
            .by_group
            .entry(month)
            .or_default()
            .entry(group_id.to_string())
            .or_insert(0.0) += amount;

        self.counted += 1;
    }
}

fn check_fraction(datetime: &str) -> std::result::Result<(), String> {
    let fraction = datetime
        .strip_suffix('Z')
        .and_then(|rest| rest.rsplit_once('.'))
        .map(|(_, fraction)| fraction)
        .ok_or_else(|| "expected fractional seconds and a trailing 'Z'".to_string())?;

    let digits_only = fraction.bytes().all(|b| b.is_ascii_digit());
    if fraction.is_empty() || fraction.len() > MAX_FRACTION_DIGITS || !digits_only {
        return Err(format!(
            "expected 1 to {MAX_FRACTION_DIGITS} fractional digits, got '{fraction}'"
        ));
    }
    Ok(())
}

/// Truncates a transaction timestamp to its month
pub fn parse_month(datetime: &str) -> Result<MonthKey> {
    let malformed = |reason: String| ExportError::MalformedTimestamp {
        value: datetime.to_string(),
        reason,
    };
    check_fraction(datetime).map_err(malformed)?;
    let parsed = NaiveDateTime::parse_from_str(datetime, TIMESTAMP_FORMAT)
        .map_err(|e| malformed(e.to_string()))?;
    Ok(MonthKey::from_date(&parsed))
}

/// Folds the transaction list into the four monthly series.
///
/// Transactions in other tokens are skipped before their timestamp is looked at. A bad
/// timestamp on a counted transaction aborts the whole aggregation.
pub fn aggregate(
    transactions: &[Transaction],
    rules: &AggregationRules<'_>,
) -> Result<MonthlyAggregation> {
    let aggregation = transactions
        .iter()
        .filter(|txn| rules.is_target(txn))
        .try_fold(MonthlyAggregation::default(), |mut acc, txn| {
            let month = parse_month(&txn.datetime)?;
            acc.record(month, txn, rules);
            Ok::<_, ExportError>(acc)
        })?;

    tracing::debug!(
        counted = aggregation.counted,
        skipped = transactions.len() - aggregation.counted,
        months = aggregation.all.len(),
        "aggregation complete"
    );
    Ok(aggregation)
}
