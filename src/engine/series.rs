use crate::models::LogRecord;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

const MINUTE_MS: i64 = 60_000;

/// Windows up to this size use one-minute buckets.
const FINE_GRAINED_WINDOW_MINUTES: u32 = 180;
/// Target bucket count for larger windows.
const COARSE_BUCKET_TARGET: u32 = 120;

/// Request and error counts over equal-width slices of `[now - window, now]`.
/// `requests[i]` and `errors[i]` always describe the same slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSeries {
    pub requests: Vec<u64>,
    pub errors: Vec<u64>,
    pub bucket_minutes: u32,
    /// Records whose timestamp could not be parsed.
    pub unparseable: usize,
    /// Records that parsed but fell outside the window.
    pub out_of_window: usize,
}

impl BucketSeries {
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.unparseable + self.out_of_window
    }
}

/// Bucket width: one minute up to 180 minutes, otherwise `ceil(window / 120)` minutes.
pub fn bucket_minutes_for_window(window_minutes: u32) -> u32 {
    if window_minutes <= FINE_GRAINED_WINDOW_MINUTES {
        1
    } else {
        window_minutes.div_ceil(COARSE_BUCKET_TARGET)
    }
}

/// Buckets `records` over the trailing `window_minutes` ending at `now`.
pub fn build_series(records: &[LogRecord], window_minutes: u32, now: DateTime<Utc>) -> BucketSeries {
    let bucket_minutes = bucket_minutes_for_window(window_minutes);
    let window_ms = i64::from(window_minutes) * MINUTE_MS;
    let bucket_ms = i64::from(bucket_minutes) * MINUTE_MS;
    let bucket_count = ((window_ms + bucket_ms - 1) / bucket_ms) as usize;

    let mut series = BucketSeries {
        requests: vec![0; bucket_count],
        errors: vec![0; bucket_count],
        bucket_minutes,
        unparseable: 0,
        out_of_window: 0,
    };

    let now_ms = now.timestamp_millis();
    let start_ms = now_ms - window_ms;

    for record in records {
        let Some(ts) = parse_timestamp_ms(&record.timestamp) else {
            series.unparseable += 1;
            continue;
        };
        if bucket_count == 0 || ts < start_ms || ts > now_ms {
            series.out_of_window += 1;
            continue;
        }
        // ts == now would land one past the end
        let idx = (((ts - start_ms) / bucket_ms) as usize).min(bucket_count - 1);
        series.requests[idx] += 1;
        if !record.ok {
            series.errors[idx] += 1;
        }
    }

    series
}

/// RFC 3339 first; offset-less ISO timestamps are read in the local zone,
/// the way a browser's `Date` parses them.
fn parse_timestamp_ms(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.timestamp_millis())
}
