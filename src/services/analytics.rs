use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::models::QrCode;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScanStats {
    pub scan_count: i64,
    pub months_since_creation: i64,
    pub current_month_scans: u64,
    pub average_scans_per_month: f64,
    pub percentage_change: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollectionSummary {
    pub total_codes: usize,
    pub active_codes: usize,
    pub total_scans: i64,
    pub average_scans: i64,
}

/// Current month against the lifetime monthly average for one code.
pub fn scan_stats(code: &QrCode, now: DateTime<Utc>) -> ScanStats {
    let created = DateTime::<Utc>::from_timestamp_millis(code.created_at).unwrap_or(now);
    let months_since_creation = full_months_between(created, now).max(1);

    let (start, end) = month_bounds(now);
    let (start, end) = (start.timestamp_millis(), end.timestamp_millis());
    let current_month_scans = code
        .scan_history
        .iter()
        .filter(|&&at| at >= start && at <= end)
        .count() as u64;

    let average_scans_per_month = code.scan_count as f64 / months_since_creation as f64;
    // Zero average means no baseline, reported as no change.
    let percentage_change = if average_scans_per_month > 0.0 {
        (current_month_scans as f64 - average_scans_per_month) / average_scans_per_month * 100.0
    } else {
        0.0
    };

    ScanStats {
        scan_count: code.scan_count,
        months_since_creation,
        current_month_scans,
        average_scans_per_month,
        percentage_change,
    }
}

pub fn summarize(codes: &[QrCode]) -> CollectionSummary {
    let total_codes = codes.len();
    let total_scans: i64 = codes.iter().map(|code| code.scan_count).sum();
    let average_scans = if total_codes > 0 {
        (total_scans as f64 / total_codes as f64).round() as i64
    } else {
        0
    };

    CollectionSummary {
        total_codes,
        active_codes: codes.iter().filter(|code| code.is_active).count(),
        total_scans,
        average_scans,
    }
}

/// Whole calendar months from `from` to `to`; a month only counts once its
/// day and time of day have been reached again. Negative spans yield 0.
pub fn full_months_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    if to <= from {
        return 0;
    }
    let mut months = (i64::from(to.year()) - i64::from(from.year())) * 12
        + i64::from(to.month()) - i64::from(from.month());
    let to_offset = (to.day(), to.num_seconds_from_midnight(), to.nanosecond());
    let from_offset = (from.day(), from.num_seconds_from_midnight(), from.nanosecond());
    if to_offset < from_offset {
        months -= 1;
    }
    months.max(0)
}

/// First and last millisecond of the UTC calendar month containing `now`.
pub fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year, month) = (now.year(), now.month());
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let start = first_instant(year, month).unwrap_or(now);
    let end = first_instant(next_year, next_month)
        .map(|next| next - Duration::milliseconds(1))
        .unwrap_or(now);
    (start, end)
}

fn first_instant(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
