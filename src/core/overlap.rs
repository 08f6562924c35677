use chrono::{DateTime, Utc};

/// One interval reading as seen by the scheduling resolver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct WeightedInterval {
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
    pub(crate) value: f64,
}

/// Maximum achievable sum of `value` over a subset of the given readings such
/// that no two selected readings' intervals overlap.
///
/// Upstream ingestion can submit duplicate or overlapping intervals for the
/// same physical meter; summing them naively double-counts energy, so the
/// bucket total is the classic weighted-interval-scheduling optimum instead:
/// for each reading, binary-search the latest earlier reading whose end does
/// not pass this one's start, and keep a running maximum over
/// take-it-or-leave-it. O(n log n), exact.
///
/// Input must already be sorted ascending by `end` (call sites sort before
/// calling; the ordering is re-checked here in debug builds).
pub(crate) fn max_reading_total(readings: &[WeightedInterval]) -> f64 {
    debug_assert!(
        readings.windows(2).all(|pair| pair[0].end <= pair[1].end),
        "overlap resolver input must be sorted ascending by end time"
    );

    let mut running_max: Vec<f64> = Vec::with_capacity(readings.len());
    for (i, reading) in readings.iter().enumerate() {
        let mut taking_this = reading.value;
        if let Some(j) = latest_compatible(readings, i) {
            taking_this += running_max[j];
        }
        let best = if i == 0 {
            taking_this
        } else {
            f64::max(taking_this, running_max[i - 1])
        };
        running_max.push(best);
    }

    running_max.last().copied().unwrap_or(0.0)
}

/// Latest index `j < i` with `readings[j].end <= readings[i].start`, if any.
fn latest_compatible(readings: &[WeightedInterval], i: usize) -> Option<usize> {
    let start = readings[i].start;
    readings[..i]
        .partition_point(|reading| reading.end <= start)
        .checked_sub(1)
}
