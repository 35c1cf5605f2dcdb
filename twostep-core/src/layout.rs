use serde::{Deserialize, Serialize};

/// Screen side a choice option is drawn on. Key index 0 is the left key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Side::Left),
            1 => Some(Side::Right),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Rocket choice.
    One,
    /// Alien choice.
    Two,
}

/// Side-to-option assignment for one stage of one trial.
///
/// `ids[side]` is the option drawn on that side. Construction only accepts
/// permutations of a two-element id set, so every side holds exactly one
/// option and no option is shown twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayMapping([usize; 2]);

impl DisplayMapping {
    pub const IDENTITY: DisplayMapping = DisplayMapping([0, 1]);

    /// Returns `None` when both sides would show the same option.
    pub fn new(ids: [usize; 2]) -> Option<Self> {
        (ids[0] != ids[1]).then_some(Self(ids))
    }

    pub fn swapped(self) -> Self {
        Self([self.0[1], self.0[0]])
    }

    pub fn ids(self) -> [usize; 2] {
        self.0
    }

    pub fn option_at(self, side: Side) -> usize {
        self.0[side.index()]
    }

    pub fn side_of(self, option: usize) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|side| self.option_at(*side) == option)
    }

    /// Shifts both ids by `offset`, keeping the side order.
    ///
    /// Stage 2 draws the pair of aliens for destination `d` as the base
    /// mapping offset by `2 * d`.
    pub fn offset(self, offset: usize) -> Self {
        Self([self.0[0] + offset, self.0[1] + offset])
    }
}

impl Default for DisplayMapping {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_index_round_trips_only_for_two_sides() {
        assert_eq!(Side::from_index(0), Some(Side::Left));
        assert_eq!(Side::from_index(1), Some(Side::Right));
        assert_eq!(Side::from_index(2), None);
        assert_eq!(Side::Left.other(), Side::Right);
    }

    #[test]
    fn mapping_rejects_duplicate_options() {
        assert!(DisplayMapping::new([1, 1]).is_none());
        assert!(DisplayMapping::new([1, 0]).is_some());
    }

    #[test]
    fn swapped_mapping_finds_options_on_opposite_sides() {
        let mapping = DisplayMapping::IDENTITY.swapped();
        assert_eq!(mapping.option_at(Side::Left), 1);
        assert_eq!(mapping.side_of(0), Some(Side::Right));
        assert_eq!(mapping.side_of(7), None);
    }

    #[test]
    fn offset_keeps_side_order() {
        let base = DisplayMapping::IDENTITY.swapped();
        let planet_two = base.offset(4);
        assert_eq!(planet_two.ids(), [5, 4]);
        assert_eq!(planet_two.side_of(4), Some(Side::Right));
    }
}
