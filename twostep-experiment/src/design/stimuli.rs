//! Planets, aliens and rockets for each block.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::palette::{
    COLOR_NAMES, FONT_COLORS, MIN_DISTANCE_SQ, PLANET_COLORS, ROCKET_PALETTE, Rgb, min_distance_sq,
};
use super::sampling::weighted_sample;

const PLANETS_PER_BLOCK: usize = 3;
const ALIEN_TYPES: usize = 6;

/// Stimulus assignment of one block. Planet 0 is where the deterministic
/// rocket lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStimuli {
    /// Indices into the planet palette.
    pub planet_indices: [usize; PLANETS_PER_BLOCK],
    pub planet_colors: Vec<String>,
    pub font_colors: Vec<String>,
    pub planet_names: Vec<String>,
    pub rocket_colors: [String; 2],
    pub deterministic_rocket_color: String,
    /// Two per planet, in planet order.
    pub aliens: Vec<String>,
    /// Rockets came from the fallback branch and may sit close together.
    pub rocket_fallback: bool,
}

impl BlockStimuli {
    /// Index of the rocket that can reach two planets.
    pub fn probabilistic_rocket(&self) -> Option<usize> {
        self.rocket_colors
            .iter()
            .position(|color| !color.eq_ignore_ascii_case(&self.deterministic_rocket_color))
    }
}

/// Three planet colors: uniform for the first block, afterwards weighted
/// towards colors the previous block did not use.
pub fn choose_planets<R: Rng + ?Sized>(
    previous: Option<&[usize; PLANETS_PER_BLOCK]>,
    rng: &mut R,
) -> [usize; PLANETS_PER_BLOCK] {
    let all: Vec<usize> = (0..PLANET_COLORS.len()).collect();
    let picked = match previous {
        None => {
            let mut shuffled = all;
            shuffled.shuffle(rng);
            shuffled
        }
        Some(previous) => {
            let weights: Vec<u32> = all
                .iter()
                .map(|color| if previous.contains(color) { 1 } else { 3 })
                .collect();
            weighted_sample(&all, &weights, PLANETS_PER_BLOCK, rng)
        }
    };
    [picked[0], picked[1], picked[2]]
}

/// Shuffles alien types 1..=6 and places two on each planet.
pub fn assign_aliens<R: Rng + ?Sized>(
    planets: &[usize; PLANETS_PER_BLOCK],
    rng: &mut R,
) -> Vec<String> {
    let mut types: Vec<usize> = (1..=ALIEN_TYPES).collect();
    types.shuffle(rng);
    types
        .chunks(2)
        .zip(planets)
        .flat_map(|(pair, planet)| {
            pair.iter()
                .map(move |kind| format!("A{kind}-{}", COLOR_NAMES[*planet]))
        })
        .collect()
}

/// Practice aliens `P1..P6`, two per planet of `planet_names`.
pub fn practice_aliens(planet_names: &[String]) -> Vec<String> {
    (1..=ALIEN_TYPES)
        .map(|kind| {
            let name = planet_names
                .get((kind - 1) / 2)
                .map(String::as_str)
                .unwrap_or_default();
            format!("P{kind}-{name}")
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RocketPair {
    pub colors: [String; 2],
    pub fallback: bool,
}

/// Picks two rocket colors that stand out from the planets and from each
/// other, preferring colors the previous block did not use.
///
/// Every palette pair whose members clear [`MIN_DISTANCE_SQ`] to all planets
/// and to each other is scored by the smallest of those distances; the best
/// score wins. When no pair qualifies the pair is drawn at random from the
/// colors far enough from the planets (the whole palette if fewer than two)
/// and flagged as a fallback.
pub fn choose_rockets<R: Rng + ?Sized>(
    planet_colors: &[String],
    previous: Option<&[String; 2]>,
    rng: &mut R,
) -> RocketPair {
    let planets: Vec<Rgb> = planet_colors.iter().filter_map(|c| Rgb::parse(c)).collect();
    let palette: Vec<(&str, Rgb)> = ROCKET_PALETTE
        .iter()
        .filter_map(|hex| Rgb::parse(hex).map(|rgb| (*hex, rgb)))
        .collect();

    let mut candidates: Vec<([&str; 2], u32)> = Vec::new();
    for (i, (hex_a, a)) in palette.iter().enumerate() {
        for (hex_b, b) in &palette[i + 1..] {
            let to_planets_a = min_distance_sq(*a, &planets);
            let to_planets_b = min_distance_sq(*b, &planets);
            let between = a.distance_sq(*b);
            if to_planets_a > MIN_DISTANCE_SQ
                && to_planets_b > MIN_DISTANCE_SQ
                && between > MIN_DISTANCE_SQ
            {
                let score = to_planets_a.min(to_planets_b).min(between);
                candidates.push(([*hex_a, *hex_b], score));
            }
        }
    }

    if candidates.is_empty() {
        warn!("no rocket pair clears the distance thresholds, using fallback pair");
        let mut pool: Vec<&str> = palette
            .iter()
            .filter(|(_, rgb)| min_distance_sq(*rgb, &planets) > MIN_DISTANCE_SQ)
            .map(|(hex, _)| *hex)
            .collect();
        if pool.len() < 2 {
            pool = ROCKET_PALETTE.to_vec();
        }
        pool.shuffle(rng);
        return RocketPair {
            colors: [pool[0].to_string(), pool[1].to_string()],
            fallback: true,
        };
    }

    if let Some(previous) = previous {
        let fresh = |hex: &str| !previous.iter().any(|p| p.eq_ignore_ascii_case(hex));
        if candidates.iter().any(|(pair, _)| pair.iter().all(|hex| fresh(*hex))) {
            candidates.retain(|(pair, _)| pair.iter().all(|hex| fresh(*hex)));
        }
    }

    // First maximum keeps palette order on ties.
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }
    let mut pair = best.0;
    pair.shuffle(rng);
    debug!(rockets = ?pair, score = best.1, "rocket pair chosen");
    RocketPair {
        colors: [pair[0].to_string(), pair[1].to_string()],
        fallback: false,
    }
}

/// Stimuli for `blocks` consecutive blocks.
pub fn design_blocks<R: Rng + ?Sized>(blocks: usize, rng: &mut R) -> Vec<BlockStimuli> {
    let mut designed: Vec<BlockStimuli> = Vec::with_capacity(blocks);
    for _ in 0..blocks {
        let previous = designed.last();
        let planet_indices = choose_planets(previous.map(|b| &b.planet_indices), rng);
        let aliens = assign_aliens(&planet_indices, rng);
        let planet_colors: Vec<String> = planet_indices
            .iter()
            .map(|i| PLANET_COLORS[*i].to_string())
            .collect();
        let rockets = choose_rockets(&planet_colors, previous.map(|b| &b.rocket_colors), rng);
        let deterministic_rocket_color = rockets.colors[rng.random_range(0..2)].clone();

        designed.push(BlockStimuli {
            planet_indices,
            font_colors: planet_indices
                .iter()
                .map(|i| FONT_COLORS[*i].to_string())
                .collect(),
            planet_names: planet_indices
                .iter()
                .map(|i| COLOR_NAMES[*i].to_string())
                .collect(),
            planet_colors,
            rocket_colors: rockets.colors,
            deterministic_rocket_color,
            aliens,
            rocket_fallback: rockets.fallback,
        });
    }
    designed
}
