use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Time-series bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketGranularity {
    /// Weeks starting on Monday
    Week,
    #[default]
    Month,
}

/// Whole calendar months from `today` until `expiration`, truncated by
/// day of month. Negative once the permit has expired.
pub fn months_remaining(expiration: NaiveDate, today: NaiveDate) -> i32 {
    let months = (expiration.year() - today.year()) * 12
        + (expiration.month() as i32 - today.month() as i32);
    if expiration.day() < today.day() {
        months - 1
    } else {
        months
    }
}

/// First day of the bucket containing `date`
pub fn bucket_start(date: NaiveDate, granularity: BucketGranularity) -> NaiveDate {
    match granularity {
        BucketGranularity::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
        BucketGranularity::Month => date.with_day(1).unwrap_or(date),
    }
}
