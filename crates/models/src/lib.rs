use chrono::Datelike;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Group id for transactions with neither `group_id` nor `cu_id`
pub const UNKNOWN_GROUP: &str = "Unknown";

// Input models

/// A transaction as returned by the accounting endpoint, normalised on deserialisation.
///
/// The endpoint is not consistent about field names, so `amount` falls back to `dai_amount`
/// and `group_id` falls back to `cu_id`. A missing or null group id resolves to [`UNKNOWN_GROUP`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "TransactionRaw")]
pub struct Transaction {
    pub token: String,
    pub datetime: String,
    pub amount: f64,
    pub group_id: String,
}

#[derive(Debug, Deserialize)]
struct TransactionRaw {
    token: String,
    datetime: String,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    dai_amount: Option<f64>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    cu_id: Option<String>,
}

impl TryFrom<TransactionRaw> for Transaction {
    type Error = String;

    fn try_from(raw: TransactionRaw) -> Result<Self, Self::Error> {
        let amount = raw
            .amount
            .or(raw.dai_amount)
            .ok_or_else(|| format!("transaction at {} has no amount", raw.datetime))?;
        let group_id = raw
            .group_id
            .or(raw.cu_id)
            .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
        Ok(Transaction {
            token: raw.token,
            datetime: raw.datetime,
            amount,
            group_id,
        })
    }
}

// Month keys

/// A calendar month, rendered as `YYYY/MM`. Field order makes the derived ordering chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Returns `None` for a month outside 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(MonthKey { year, month })
    }

    pub const fn january(year: i32) -> Self {
        MonthKey { year, month: 1 }
    }

    /// Truncates any date-like value to its month
    pub fn from_date<D: Datelike>(date: &D) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month, rolling over into January of the next year
    pub fn next(&self) -> Self {
        if self.month == 12 {
            MonthKey {
                year: self.year + 1,
                month: 1,
            }
        } else {
            MonthKey {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}", self.year(), self.month())
    }
}

/// Accepts `YYYY/MM` and, for files produced elsewhere, `YYYY-MM`.
impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once(['/', '-'])
            .ok_or_else(|| format!("invalid month key: {s}"))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(format!("invalid month key: {s}"));
        }
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in month key: {s}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in month key: {s}"))?;
        MonthKey::new(year, month).ok_or_else(|| format!("month key out of range: {s}"))
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// Settings models

/// Everything the export run treats as a constant. Each field defaults to the production value,
/// so an empty settings file (or none at all) reproduces the standard export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub endpoint: String,
    pub target_token: String,
    pub start_month: MonthKey,
    pub export_root: PathBuf,
    pub export_dir_prefix: String,
    /// Launch and interim phase markers, left out of the no-launch series.
    pub no_launch_groups: Vec<String>,
    /// Non-operational group ids, left out of the filtered series.
    pub excluded_group_ids: Vec<String>,
    pub file_names: ExportFileNames,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportFileNames {
    pub all: String,
    pub no_launch: String,
    pub filtered: String,
    pub by_group: String,
}

pub const DEFAULT_ENDPOINT: &str = "https://api.makerburn.com/expenses/accounting";
pub const DEFAULT_TARGET_TOKEN: &str = "DAI";
pub const DEFAULT_START_MONTH: MonthKey = MonthKey::january(2021);
pub const DEFAULT_EXPORT_ROOT: &str = "exports";
pub const DEFAULT_EXPORT_DIR_PREFIX: &str = "export_";
pub const DEFAULT_NO_LAUNCH_GROUPS: [&str; 2] = ["LAUNCH", "INTERIM"];
pub const DEFAULT_EXCLUDED_GROUP_IDS: [&str; 11] = [
    "DEWIZ",
    "ECOSYSTEM",
    "IS-001",
    "PH-001",
    "PHOENIX",
    "PNT-001",
    "PULLUP",
    "SF-001",
    "SIDESTREAM",
    "TECH-001",
    "VIRIDIAN",
];

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            target_token: DEFAULT_TARGET_TOKEN.to_string(),
            start_month: DEFAULT_START_MONTH,
            export_root: PathBuf::from(DEFAULT_EXPORT_ROOT),
            export_dir_prefix: DEFAULT_EXPORT_DIR_PREFIX.to_string(),
            no_launch_groups: DEFAULT_NO_LAUNCH_GROUPS.iter().map(|s| s.to_string()).collect(),
            excluded_group_ids: DEFAULT_EXCLUDED_GROUP_IDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            file_names: ExportFileNames::default(),
        }
    }
}

impl Default for ExportFileNames {
    fn default() -> Self {
        ExportFileNames {
            all: "expenses_all.json".to_string(),
            no_launch: "expenses_no_launch_or_interim.json".to_string(),
            filtered: "expenses_filtered.json".to_string(),
            by_group: "expenses_by_group.json".to_string(),
        }
    }
}

// Output models

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRow {
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow {
    pub group_id: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry<R> {
    pub period: MonthKey,
    pub rows: Vec<R>,
}

/// `{ "data": { "analytics": { "series": [...] } } }`, the layout the reporting side expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDocument<R> {
    pub data: SeriesData<R>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData<R> {
    pub analytics: Analytics<R>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics<R> {
    pub series: Vec<SeriesEntry<R>>,
}

impl<R> SeriesDocument<R> {
    pub fn new(series: Vec<SeriesEntry<R>>) -> Self {
        SeriesDocument {
            data: SeriesData {
                analytics: Analytics { series },
            },
        }
    }

    pub fn series(&self) -> &[SeriesEntry<R>] {
        &self.data.analytics.series
    }
}
