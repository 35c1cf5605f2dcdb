//! Rocket-to-planet transition.

use rand::Rng;

/// Planet reached by the deterministic rocket.
pub const DETERMINISTIC_DESTINATION: usize = 0;
pub const DESTINATIONS: usize = 3;

/// Resolves the destination planet for the chosen rocket.
///
/// An override in `0..DESTINATIONS` wins unconditionally. Otherwise the
/// deterministic rocket lands on planet 0 and the other rocket lands on
/// planet 1 or 2 with equal probability, drawn fresh on every call.
pub fn resolve_destination<R: Rng + ?Sized>(
    chosen_color: &str,
    deterministic_color: &str,
    override_destination: Option<usize>,
    rng: &mut R,
) -> usize {
    if let Some(destination) = override_destination.filter(|d| *d < DESTINATIONS) {
        return destination;
    }
    if same_color(chosen_color, deterministic_color) {
        DETERMINISTIC_DESTINATION
    } else if rng.random_bool(0.5) {
        1
    } else {
        2
    }
}

/// Hex colors compare case-insensitively; surrounding whitespace is ignored.
pub fn same_color(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
