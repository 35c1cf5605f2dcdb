//! Session design: which stimuli, rewards and forced trials each block gets.

pub mod palette;
pub mod plan;
pub mod rewards;
pub mod sampling;
pub mod stimuli;

pub use plan::{BlockPlan, SessionPlan, place_forced};
pub use stimuli::{BlockStimuli, RocketPair};
