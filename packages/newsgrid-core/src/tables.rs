//! Date-partitioned table name resolution.
//!
//! Feed data is stored in per-day tables (`feed_entries_YYYYMMDD`). This
//! module computes those names and parses them back, including a raw-suffix
//! escape hatch (`feed_entries_8888-88-88`-style) used by integration tests
//! that need a fixed, never-colliding table name.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Base table names that are date-partitioned.
pub const FEED_ENTRIES: &str = "feed_entries";
pub const FLASH_POINT: &str = "flash_point";
pub const NEWS_CLUSTERS: &str = "news_clusters";

static DATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d{8})$").expect("valid regex"));

/// Builds the concrete table name for `base` on `date`, e.g.
/// `make_table_name("feed_entries", date)` -> `"feed_entries_20260115"`.
#[must_use]
pub fn make_table_name(base: &str, date: NaiveDate) -> String {
    format!("{base}_{}", date.format("%Y%m%d"))
}

/// Builds a table name from a raw suffix rather than a date, for use by
/// tests that need a deterministic, collision-free table (e.g. suffix
/// `"8888-88-88"`). The suffix is used verbatim and is not validated as a
/// real date.
#[must_use]
pub fn make_raw_table_name(base: &str, raw_suffix: &str) -> String {
    format!("{base}_{raw_suffix}")
}

/// Extracts the `YYYYMMDD` date from a table name produced by
/// [`make_table_name`]. Returns `None` if the name has no trailing 8-digit
/// date suffix, or if that suffix is not a valid calendar date.
#[must_use]
pub fn extract_date_from_table(table_name: &str) -> Option<NaiveDate> {
    let caps = DATE_SUFFIX.captures(table_name)?;
    let digits = &caps[1];
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// The set of tables a run needs resolved for a target date, plus whether
/// the optional output table already exists.
#[derive(Debug, Clone)]
pub struct TableContext {
    pub feed_entries_table: String,
    pub flash_point_table: String,
    pub news_clusters_table: String,
    pub target_date: NaiveDate,
}

impl TableContext {
    #[must_use]
    pub fn for_date(target_date: NaiveDate) -> Self {
        Self {
            feed_entries_table: make_table_name(FEED_ENTRIES, target_date),
            flash_point_table: make_table_name(FLASH_POINT, target_date),
            news_clusters_table: make_table_name(NEWS_CLUSTERS, target_date),
            target_date,
        }
    }
}

impl std::fmt::Display for TableContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TableContext(date={}, feed_entries={}, flash_point={}, news_clusters={})",
            self.target_date, self.feed_entries_table, self.flash_point_table, self.news_clusters_table
        )
    }
}
