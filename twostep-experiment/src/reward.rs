//! Outcome lookup for the chosen alien.

use tracing::warn;

/// Reward for absolute alien `index`.
///
/// Missing vectors, short vectors and out-of-range indices all resolve to 0.
/// This never panics: a malformed schedule degrades to a neutral reward
/// instead of halting the trial.
pub fn resolve(outcomes: Option<&[i64]>, index: usize) -> i64 {
    outcomes
        .and_then(|values| values.get(index))
        .copied()
        .unwrap_or(0)
}

/// Rewards shown on each side of a stage-2 layout, in side order.
pub fn preview(outcomes: Option<&[i64]>, ids: [usize; 2]) -> [i64; 2] {
    [resolve(outcomes, ids[0]), resolve(outcomes, ids[1])]
}

/// Logs a warning when the schedule cannot cover a two-alien layout.
pub(crate) fn check_schedule(outcomes: Option<&[i64]>, needed: usize) {
    match outcomes {
        None => warn!("trial has no reward vector, all outcomes resolve to 0"),
        Some(values) if values.len() < needed => warn!(
            len = values.len(),
            needed, "reward vector shorter than alien set, missing entries resolve to 0"
        ),
        Some(_) => {}
    }
}
