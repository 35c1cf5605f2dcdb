//! Side constraints and banners for instructed trials.
//!
//! Forcing is configured by logical identity (a rocket color, an absolute
//! alien index) while the subject sees a per-trial shuffled layout, so every
//! target is re-mapped through the mapping of the current trial before it
//! becomes a side.

use tracing::warn;
use twostep_core::{DisplayMapping, ForcedOverrides, Side};

use crate::transition::same_color;

pub const STAGE2_BANNER: &str =
    "This is a forced trial: you can see what rewards the aliens will give you";

#[derive(Debug, Clone, Copy)]
pub struct ForcedPolicy<'a> {
    overrides: &'a ForcedOverrides,
}

impl<'a> ForcedPolicy<'a> {
    pub fn new(overrides: &'a ForcedOverrides) -> Self {
        Self { overrides }
    }

    pub fn is_active(&self) -> bool {
        self.overrides.enabled
    }

    /// Side holding the mandated rocket, if any.
    ///
    /// The color target is tried first; the rocket index is the fallback.
    /// Targets that match nothing leave the stage unconstrained.
    pub fn stage1_side(&self, rocket_colors: &[String; 2], mapping: DisplayMapping) -> Option<Side> {
        if !self.is_active() {
            return None;
        }
        let by_color = self.overrides.state1_color.as_deref().and_then(|target| {
            rocket_colors
                .iter()
                .position(|color| same_color(color, target))
                .and_then(|rocket| mapping.side_of(rocket))
        });
        let side = by_color.or_else(|| {
            self.overrides
                .state1_key
                .and_then(|rocket| mapping.side_of(rocket))
        });
        if side.is_none() && self.has_stage1_target() {
            warn!(
                color = ?self.overrides.state1_color,
                key = ?self.overrides.state1_key,
                "forced stage-1 target not found in layout, stage left unconstrained"
            );
        }
        side
    }

    /// Side holding the mandated alien at `destination`, if any.
    ///
    /// `base` is the stage-2 mapping before the planet offset. An absolute
    /// alien index only constrains the stage when it belongs to the planet
    /// actually reached; the relative key is the fallback.
    pub fn stage2_side(&self, base: DisplayMapping, destination: usize) -> Option<Side> {
        if !self.is_active() {
            return None;
        }
        let planet_offset = 2 * destination;
        let by_alien = self.overrides.alien_index.and_then(|alien| {
            Side::BOTH
                .into_iter()
                .find(|side| base.option_at(*side) + planet_offset == alien)
        });
        let side = by_alien.or_else(|| {
            self.overrides
                .state2_key
                .and_then(|relative| base.side_of(relative))
        });
        if side.is_none() && self.overrides.state2_key.is_some() {
            warn!(
                key = ?self.overrides.state2_key,
                "forced stage-2 key not found in layout, stage left unconstrained"
            );
        }
        side
    }

    /// Banner for stage 1. Only shown when a side is actually enforced so the
    /// text can never disagree with the layout.
    pub fn stage1_banner(&self, side: Option<Side>) -> Option<String> {
        let side = side.filter(|_| self.is_active())?;
        Some(match &self.overrides.message {
            Some(message) => message.clone(),
            None => format!("This is a forced trial: Choose {} rocket", side.label()),
        })
    }

    /// Stage 2 of every forced trial reveals the rewards, constrained or not.
    pub fn stage2_banner(&self) -> Option<&'static str> {
        self.is_active().then_some(STAGE2_BANNER)
    }

    pub fn shows_reward_preview(&self) -> bool {
        self.is_active()
    }

    /// Transition override, honored on forced trials only.
    pub fn transition(&self) -> Option<usize> {
        self.overrides.transition.filter(|_| self.is_active())
    }

    fn has_stage1_target(&self) -> bool {
        self.overrides.state1_color.is_some() || self.overrides.state1_key.is_some()
    }
}

/// Whether a key on `pressed` may advance a stage constrained to `mandated`.
pub fn accepts(mandated: Option<Side>, pressed: Side) -> bool {
    mandated.is_none_or(|side| side == pressed)
}
