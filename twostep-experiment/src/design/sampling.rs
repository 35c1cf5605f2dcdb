//! Random draws used while designing a session.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

/// Draws up to `k` items without replacement, one at a time, each with
/// probability proportional to its remaining weight. Falls back to a
/// uniform pick when every remaining weight is zero.
pub fn weighted_sample<T: Clone, R: Rng + ?Sized>(
    items: &[T],
    weights: &[u32],
    k: usize,
    rng: &mut R,
) -> Vec<T> {
    let mut pool: Vec<(T, u32)> = items
        .iter()
        .cloned()
        .zip(weights.iter().copied().chain(std::iter::repeat(0)))
        .collect();
    let mut selected = Vec::with_capacity(k.min(pool.len()));
    while selected.len() < k && !pool.is_empty() {
        let pick = match WeightedIndex::new(pool.iter().map(|(_, w)| *w)) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.random_range(0..pool.len()),
        };
        selected.push(pool.remove(pick).0);
    }
    selected
}

/// Standard normal draw scaled to `sd` (Box–Muller).
pub fn gaussian<R: Rng + ?Sized>(mean: f64, sd: f64, rng: &mut R) -> f64 {
    let mut u = 0.0;
    while u == 0.0 {
        u = rng.random::<f64>();
    }
    let v = rng.random::<f64>();
    let z = (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos();
    mean + z * sd
}

/// `clean` plus Gaussian noise, rounded and clipped at zero.
pub fn noisy_reward<R: Rng + ?Sized>(clean: i64, sd: f64, rng: &mut R) -> i64 {
    let value = gaussian(clean as f64, sd, rng).round();
    if value <= 0.0 { 0 } else { value as i64 }
}
