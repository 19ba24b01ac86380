//! The four spatial search algorithms.
//!
//! Each use case takes `&Services` plus a params struct, validates the
//! params, and returns a [`UseCaseResult`](geoscout_core::UseCaseResult).
//! Empty searches are successes carrying a `NO_RESULTS_FOUND` advisory.

pub mod enroute;
pub mod near_poi;
pub mod nearest;
pub mod within_time;

mod search;

use std::cmp::Ordering;
use std::ops::RangeInclusive;

use geoscout_core::{Poi, UseCaseError};

/// Bounds on travel-time limits, in minutes.
pub const TIME_LIMIT_MINUTES: RangeInclusive<u32> = 1..=120;
/// Bounds on the number of returned POIs.
pub const MAX_RESULTS_RANGE: RangeInclusive<usize> = 1..=100;
pub const DEFAULT_MAX_RESULTS: usize = 20;

pub(crate) fn check_range<T>(
    field: &str,
    value: T,
    range: &RangeInclusive<T>,
) -> Result<(), UseCaseError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(UseCaseError::validation(format!(
            "{field} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

fn cmp_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(f64::INFINITY).total_cmp(&b.unwrap_or(f64::INFINITY))
}

/// Ascending distance from the user, ties broken by source rank.
pub(crate) fn sort_by_distance(pois: &mut [Poi]) {
    pois.sort_by(|a, b| {
        cmp_f64(a.distance_m, b.distance_m).then(a.source_rank.cmp(&b.source_rank))
    });
}
