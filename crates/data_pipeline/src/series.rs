//! Gap-filled monthly series, from a fixed start month through the current month.

use chrono::NaiveDate;
use models::{GroupRow, MonthKey, SeriesDocument, SeriesEntry, ValueRow};

use crate::aggregate::{GroupedTotals, MonthlyTotals};

/// Every month from `start` through the month containing `today`, inclusive.
///
/// Empty when `today` falls before `start`.
pub fn months_through(start: MonthKey, today: NaiveDate) -> impl Iterator<Item = MonthKey> {
    let end = MonthKey::from_date(&today);
    std::iter::successors(Some(start), |month| Some(month.next()))
        .take_while(move |month| *month <= end)
}

/// Scalar series: one `{"value": n}` row per month, 0 where nothing was recorded.
pub fn format_totals(
    totals: &MonthlyTotals,
    start: MonthKey,
    today: NaiveDate,
) -> SeriesDocument<ValueRow> {
    let series = months_through(start, today)
        .map(|period| SeriesEntry {
            period,
            rows: vec![ValueRow {
                value: totals.get(&period).copied().unwrap_or(0.0),
            }],
        })
        .collect();
    SeriesDocument::new(series)
}

/// Grouped series: the groups present in each month, ordered by group id. Months without
/// data get an empty row list.
pub fn format_grouped(
    grouped: &GroupedTotals,
    start: MonthKey,
    today: NaiveDate,
) -> SeriesDocument<GroupRow> {
    let series = months_through(start, today)
        .map(|period| SeriesEntry {
            period,
            rows: grouped
                .get(&period)
                .map(|groups| {
                    groups
                        .iter()
                        .map(|(group_id, value)| GroupRow {
                            group_id: group_id.clone(),
                            value: *value,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();
    SeriesDocument::new(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_series_length_through_march_2024() {
        let months: Vec<MonthKey> = months_through(month("2021/01"), date(2024, 3, 17)).collect();
        assert_eq!(months.len(), 39);
        assert_eq!(months.first().unwrap().to_string(), "2021/01");
        assert_eq!(months.last().unwrap().to_string(), "2024/03");
    }

    #[test]
    fn test_months_are_contiguous_across_year_boundaries() {
        let months: Vec<MonthKey> = months_through(month("2021/11"), date(2022, 2, 1)).collect();
        let rendered: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(rendered, vec!["2021/11", "2021/12", "2022/01", "2022/02"]);
    }

    #[test]
    fn test_today_before_start_gives_empty_series() {
        assert_eq!(months_through(month("2021/01"), date(2020, 12, 31)).count(), 0);

        let doc = format_totals(&MonthlyTotals::new(), month("2021/01"), date(2020, 6, 1));
        assert!(doc.series().is_empty());
    }

    #[test]
    fn test_start_month_equals_current_month() {
        let doc = format_totals(&MonthlyTotals::new(), month("2021/01"), date(2021, 1, 1));
        assert_eq!(doc.series().len(), 1);
    }

    #[test]
    fn test_totals_are_gap_filled_with_zero() {
        let mut totals = MonthlyTotals::new();
        totals.insert(month("2021/02"), 150.0);
        // Outside the window; must not leak into the output.
        totals.insert(month("2020/12"), 999.0);

        let doc = format_totals(&totals, month("2021/01"), date(2021, 3, 5));
        let values: Vec<f64> = doc.series().iter().map(|e| e.rows[0].value).collect();
        assert_eq!(values, vec![0.0, 150.0, 0.0]);
        assert!(doc.series().iter().all(|e| e.rows.len() == 1));
    }

    #[test]
    fn test_grouped_rows_only_for_groups_present_that_month() {
        let mut grouped = GroupedTotals::new();
        grouped.insert(
            month("2021/01"),
            BTreeMap::from([("OPS".to_string(), 50.0), ("LAUNCH".to_string(), 100.0)]),
        );
        grouped.insert(month("2021/03"), BTreeMap::from([("OPS".to_string(), 5.0)]));

        let doc = format_grouped(&grouped, month("2021/01"), date(2021, 3, 31));
        let series = doc.series();
        assert_eq!(series.len(), 3);

        let jan: Vec<(&str, f64)> = series[0]
            .rows
            .iter()
            .map(|r| (r.group_id.as_str(), r.value))
            .collect();
        assert_eq!(jan, vec![("LAUNCH", 100.0), ("OPS", 50.0)]);
        assert!(series[1].rows.is_empty());
        assert_eq!(series[2].rows.len(), 1);
        assert_eq!(series[2].rows[0].group_id, "OPS");
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let mut grouped = GroupedTotals::new();
        grouped.insert(
            month("2022/05"),
            BTreeMap::from([
                ("ZETA".to_string(), 1.0),
                ("ALPHA".to_string(), 2.0),
                ("MID".to_string(), 3.0),
            ]),
        );
        let today = date(2022, 6, 15);

        let first = format_grouped(&grouped, month("2021/01"), today);
        let second = format_grouped(&grouped, month("2021/01"), today);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        let groups: Vec<&str> = first.series()[16]
            .rows
            .iter()
            .map(|r| r.group_id.as_str())
            .collect();
        assert_eq!(groups, vec!["ALPHA", "MID", "ZETA"]);
    }
}
