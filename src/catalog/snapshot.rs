// odootool/src/catalog/snapshot.rs
use std::fmt;
use std::sync::LazyLock;

use chrono::{Local, NaiveDateTime, Timelike};
use regex::Regex;
use serde::Serialize;

/// Second-resolution timestamp used in snapshot and staging names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

static NATIVE_ARCHIVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<database>.+)_(?P<timestamp>\d{14})(?:\.tar)?\.gz$")
        .expect("snapshot name pattern is valid")
});

/// One backup of one database, identified by `(database, taken_at)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub database: String,
    pub taken_at: NaiveDateTime,
}

impl Snapshot {
    pub fn new(database: impl Into<String>, taken_at: NaiveDateTime) -> Self {
        Self {
            database: database.into(),
            // sub-second precision would not survive a round trip through the name
            taken_at: taken_at.with_nanosecond(0).unwrap_or(taken_at),
        }
    }

    pub fn now(database: impl Into<String>) -> Self {
        Self::new(database, Local::now().naive_local())
    }

    pub fn timestamp(&self) -> String {
        self.taken_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// `{database}_{timestamp}`, also used as the backup staging key.
    pub fn name(&self) -> String {
        format!("{}_{}", self.database, self.timestamp())
    }

    pub fn archive_file_name(&self) -> String {
        format!("{}.gz", self.name())
    }

    /// Recognizes archive names written by the backup job.
    pub fn parse_archive_name(file_name: &str) -> Option<Self> {
        let caps = NATIVE_ARCHIVE_NAME.captures(file_name)?;
        let taken_at = NaiveDateTime::parse_from_str(&caps["timestamp"], TIMESTAMP_FORMAT).ok()?;
        Some(Self::new(&caps["database"], taken_at))
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_year() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn names_follow_database_and_timestamp() {
        let snapshot = Snapshot::new("shop", new_year());
        assert_eq!(snapshot.name(), "shop_20240101000000");
        assert_eq!(snapshot.archive_file_name(), "shop_20240101000000.gz");
    }

    #[test]
    fn archive_names_parse_back() {
        let parsed = Snapshot::parse_archive_name("shop_staging_20240101000000.gz").unwrap();
        assert_eq!(parsed, Snapshot::new("shop_staging", new_year()));

        let parsed = Snapshot::parse_archive_name("shop_20240101000000.tar.gz").unwrap();
        assert_eq!(parsed.database, "shop");

        assert!(Snapshot::parse_archive_name("shop_export.zip").is_none());
        assert!(Snapshot::parse_archive_name("shop_2024.gz").is_none());
        assert!(Snapshot::parse_archive_name("shop_20241399000000.gz").is_none());
    }
}
