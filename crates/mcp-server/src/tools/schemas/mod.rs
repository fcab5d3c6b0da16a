pub(super) mod capabilities;
pub(super) mod pagination;
pub(super) mod scan;
pub(super) mod stream;

use dirscope_lister::{ScanFilters, MAX_DEPTH, MIN_DEPTH};

pub(super) const DEFAULT_BATCH_SIZE: usize = 20;
pub(super) const MIN_BATCH_SIZE: usize = 5;
pub(super) const MAX_BATCH_SIZE: usize = 50;

/// Out-of-range values are clamped, not rejected.
pub(super) fn clamp_batch_size(raw: Option<i64>) -> usize {
    match raw {
        Some(value) => clamp_i64(value, MIN_BATCH_SIZE, MAX_BATCH_SIZE),
        None => DEFAULT_BATCH_SIZE,
    }
}

pub(super) fn clamp_offset(raw: Option<i64>) -> usize {
    raw.map_or(0, |value| usize::try_from(value.max(0)).unwrap_or(usize::MAX))
}

pub(super) fn clamp_depth(raw: Option<i64>) -> usize {
    raw.map_or(MIN_DEPTH, |value| clamp_i64(value, MIN_DEPTH, MAX_DEPTH))
}

fn clamp_i64(value: i64, min: usize, max: usize) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX).clamp(min, max)
}

/// Filters for walks that are consumed in walk order (streams, plans).
pub(super) fn unsorted_filters(
    max_depth: Option<i64>,
    include_hidden: Option<bool>,
    file_types: Option<&[String]>,
) -> dirscope_lister::Result<ScanFilters> {
    ScanFilters::parse(
        Some(clamp_depth(max_depth)),
        include_hidden,
        file_types.unwrap_or_default(),
        None,
        None,
    )
}
