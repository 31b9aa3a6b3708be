use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::Serialize;

/// Hour pinned into the representative instant used by the heatmap and
/// status snapshots. Per-purpose constant; do not fold into the
/// evolution fallbacks below, they feed different endpoints.
pub const MAP_SNAPSHOT_HOUR: u32 = 1;

/// Day substituted into the monthly-comparison query when no day is
/// selected.
pub const EVOLUTION_FALLBACK_DAY: u32 = 1;

/// Hour substituted into the monthly-comparison query when no hour is
/// selected.
pub const EVOLUTION_FALLBACK_HOUR: u32 = 4;

/// A start/end pair already serialized to the wire format. An unset
/// year yields the empty-string sentinel on both ends, meaning "no
/// range selected" - that is data, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }
}

/// All filter instants are interpreted as UTC wall-clock and serialized
/// RFC 3339 with a Z suffix, uniformly across every deriver here.
pub fn to_wire(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    // First of the following month, stepped back one day.
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

fn utc_instant(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    let month = month.clamp(1, 12);
    let day = day.clamp(1, last_day_of_month(year, month));
    // Total after clamping, so the single() here cannot miss.
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .unwrap_or_default()
}

/// Combine selection calendar fields into a UTC instant with minutes
/// and below zeroed. Out-of-range months and days are clamped rather
/// than rejected.
pub fn utc_selection_instant(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    utc_instant(year, month, day, hour, 0, 0)
}

/// Representative instant for the map and status snapshots: first day
/// of the selected (or defaulted) month at `MAP_SNAPSHOT_HOUR`, minutes
/// and below zeroed. Year defaults to the current UTC year, month to
/// January.
pub fn heatmap_timestamp(year: Option<i32>, month: Option<u32>) -> DateTime<Utc> {
    let year = year.unwrap_or_else(|| Utc::now().year());
    let month = month.unwrap_or(1);
    utc_instant(year, month, 1, MAP_SNAPSHOT_HOUR, 0, 0)
}

/// Date range for the congestion query, derived from the partial
/// calendar selection.
///
/// The end falls back in three tiers: an explicit month and day close
/// the range at that day's 23:59:59; a month alone closes it at the
/// month's last calendar day; a bare year runs through Dec 31.
pub fn day_range(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> DateRange {
    let Some(year) = year else {
        return DateRange::empty();
    };

    let start = utc_instant(year, month.unwrap_or(1), day.unwrap_or(1), 0, 0, 0);
    let end = match (month, day) {
        (Some(m), Some(d)) => utc_instant(year, m, d, 23, 59, 59),
        (Some(m), None) => utc_instant(year, m, last_day_of_month(year, m), 23, 59, 59),
        _ => utc_instant(year, 12, 31, 23, 59, 59),
    };

    DateRange {
        start: to_wire(start),
        end: to_wire(end),
    }
}

/// Full calendar-year range, used by the aggregated stats and export
/// queries.
pub fn year_range(year: Option<i32>) -> DateRange {
    let Some(year) = year else {
        return DateRange::empty();
    };

    DateRange {
        start: to_wire(utc_instant(year, 1, 1, 0, 0, 0)),
        end: to_wire(utc_instant(year, 12, 31, 23, 59, 59)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_heatmap_timestamp_pins_day_and_hour() {
        let ts = heatmap_timestamp(Some(2024), Some(7));
        assert_eq!(to_wire(ts), "2024-07-01T01:00:00Z");
        assert_eq!(ts.hour(), MAP_SNAPSHOT_HOUR);
        assert_eq!(ts.minute(), 0);
        assert_eq!(ts.second(), 0);
    }

    #[test]
    fn test_heatmap_timestamp_defaults() {
        let ts = heatmap_timestamp(Some(2023), None);
        assert_eq!(to_wire(ts), "2023-01-01T01:00:00Z");

        // Year falls back to the current UTC year.
        let now_year = Utc::now().year();
        assert_eq!(heatmap_timestamp(None, Some(3)).year(), now_year);
    }

    #[test]
    fn test_day_range_year_only() {
        let range = day_range(Some(2024), None, None);
        assert_eq!(range.start, "2024-01-01T00:00:00Z");
        assert_eq!(range.end, "2024-12-31T23:59:59Z");
    }

    #[test]
    fn test_day_range_month_only_computes_month_end() {
        let range = day_range(Some(2024), Some(3), None);
        assert_eq!(range.start, "2024-03-01T00:00:00Z");
        assert_eq!(range.end, "2024-03-31T23:59:59Z");

        // 30-day month and leap February.
        assert_eq!(day_range(Some(2024), Some(4), None).end, "2024-04-30T23:59:59Z");
        assert_eq!(day_range(Some(2024), Some(2), None).end, "2024-02-29T23:59:59Z");
        assert_eq!(day_range(Some(2023), Some(2), None).end, "2023-02-28T23:59:59Z");
    }

    #[test]
    fn test_day_range_single_day() {
        let range = day_range(Some(2024), Some(2), Some(15));
        assert_eq!(range.start, "2024-02-15T00:00:00Z");
        assert_eq!(range.end, "2024-02-15T23:59:59Z");
    }

    #[test]
    fn test_day_range_day_without_month_runs_to_year_end() {
        let range = day_range(Some(2024), None, Some(15));
        assert_eq!(range.start, "2024-01-15T00:00:00Z");
        assert_eq!(range.end, "2024-12-31T23:59:59Z");
    }

    #[test]
    fn test_day_range_sentinel_when_year_unset() {
        let range = day_range(None, Some(5), Some(10));
        assert!(range.is_empty());
        assert_eq!(range, DateRange::empty());
        assert_eq!(range.start, "");
        assert_eq!(range.end, "");
    }

    #[test]
    fn test_year_range() {
        let range = year_range(Some(2024));
        assert_eq!(range.start, "2024-01-01T00:00:00Z");
        assert_eq!(range.end, "2024-12-31T23:59:59Z");
        assert!(year_range(None).is_empty());
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2024, 1), 31);
        assert_eq!(last_day_of_month(2024, 2), 29);
        assert_eq!(last_day_of_month(2025, 2), 28);
        assert_eq!(last_day_of_month(2024, 12), 31);
    }
}
