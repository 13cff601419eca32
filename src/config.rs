//! Board configuration and the group-size tiers used to pick a tile's look.

use crate::error::BoardError;

/// Visual variant of a tile, chosen from the size of the group it belongs to.
/// Has no effect on what can be blasted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum GroupTier {
    #[default]
    Default,
    A,
    B,
    C,
}

/// Three ascending thresholds; a group of at least `c` tiles is tier C, and so on down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupTiers {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

impl Default for GroupTiers {
    fn default() -> Self {
        Self { a: 4, b: 7, c: 9 }
    }
}

impl GroupTiers {
    pub fn tier_for(&self, group_size: usize) -> GroupTier {
        if group_size >= self.c {
            GroupTier::C
        } else if group_size >= self.b {
            GroupTier::B
        } else if group_size >= self.a {
            GroupTier::A
        } else {
            GroupTier::Default
        }
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.a == 0 || !(self.a < self.b && self.b < self.c) {
            return Err(BoardError::InvalidConfig(format!(
                "group tiers must be ascending and positive, got {}/{}/{}",
                self.a, self.b, self.c
            )));
        }
        Ok(())
    }
}

/// Everything needed to start a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    /// Palette size; colours are `0..color_count`.
    pub color_count: u8,
    pub tiers: GroupTiers,
    /// How many reshuffles deadlock recovery may try before giving up.
    pub max_reshuffles: u32,
    /// Fixed RNG seed for reproducible boards; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            color_count: 6,
            tiers: GroupTiers::default(),
            max_reshuffles: 16,
            seed: None,
        }
    }
}

impl BoardConfig {
    pub fn new(width: usize, height: usize, color_count: u8) -> Self {
        Self {
            width,
            height,
            color_count,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.width == 0 || self.height == 0 {
            return Err(BoardError::InvalidConfig(format!(
                "board must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        if self.color_count == 0 {
            return Err(BoardError::InvalidConfig("need at least one colour".into()));
        }
        if self.max_reshuffles == 0 {
            return Err(BoardError::InvalidConfig(
                "max_reshuffles must be at least 1".into(),
            ));
        }
        self.tiers.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        let tiers = GroupTiers::default();
        assert_eq!(tiers.tier_for(1), GroupTier::Default);
        assert_eq!(tiers.tier_for(3), GroupTier::Default);
        assert_eq!(tiers.tier_for(4), GroupTier::A);
        assert_eq!(tiers.tier_for(7), GroupTier::B);
        assert_eq!(tiers.tier_for(8), GroupTier::B);
        assert_eq!(tiers.tier_for(9), GroupTier::C);
        assert_eq!(tiers.tier_for(100), GroupTier::C);
    }

    #[test]
    fn test_validate() {
        assert!(BoardConfig::default().validate().is_ok());
        assert!(BoardConfig::new(0, 5, 3).validate().is_err());
        assert!(BoardConfig::new(5, 5, 0).validate().is_err());
        let mut cfg = BoardConfig::default();
        cfg.tiers = GroupTiers { a: 5, b: 5, c: 9 };
        assert!(cfg.validate().is_err());
        cfg.tiers = GroupTiers::default();
        cfg.max_reshuffles = 0;
        assert!(cfg.validate().is_err());
    }
}
