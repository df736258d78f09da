//! Derived views computed from already-fetched records.
//! Both are pure: recomputed from scratch on every render, never persisted.
mod rollup;
mod series;

pub use rollup::{rollup_by_pos, PosEntry, PosRollup};
pub use series::{bucket_minutes_for_window, build_series, BucketSeries};
