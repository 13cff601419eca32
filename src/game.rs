//! Board session: one grid, its match engine and RNG, and the player-facing operations.
//!
//! A player action is [`Game::blast`]: look up the group under the cursor, ignore it if it is a
//! lone tile, otherwise run the cascade and then deadlock recovery before returning. The board
//! handed back to the caller therefore always has a legal move, or the call reports
//! `RecoveryExhausted` along with every cell the cascade and reshuffles rewrote.

use crate::cascade;
use crate::changes::ChangeSet;
use crate::config::{BoardConfig, GroupTier};
use crate::error::BoardError;
use crate::grid::{GridState, Pos};
use crate::matching::{self, Group, GroupMap, MatchEngine};
use crate::recovery;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Running counters for the sidebar. Not a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub blasts: u32,
    pub tiles_cleared: u32,
    pub reshuffles: u32,
}

/// What a cascade (plus any recovery it triggered) did to the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub changes: ChangeSet,
    pub reshuffled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlastOutcome {
    /// Lone tile or empty cell: nothing happens.
    Ignored { group_size: usize },
    Blasted { removed: Group, resolution: Resolution },
}

#[derive(Debug)]
pub struct Game<R = StdRng> {
    grid: GridState,
    matcher: MatchEngine,
    config: BoardConfig,
    rng: R,
    stats: Stats,
}

impl Game<StdRng> {
    /// New playable board, seeded from `config.seed` or from entropy.
    pub fn from_config(config: BoardConfig) -> Result<Self, BoardError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Game<R> {
    /// Fill every cell with a random colour, then make sure the board has a move.
    ///
    /// A draw in which no colour repeats cannot be fixed by reshuffling, so it is redrawn first.
    pub fn with_rng(config: BoardConfig, mut rng: R) -> Result<Self, BoardError> {
        config.validate()?;
        let mut grid =
            GridState::random(config.width, config.height, config.color_count, &mut rng);
        let all: Vec<Pos> = grid.positions().collect();
        recovery::redraw_fresh(&mut grid, &all, &mut rng)?;
        let mut game = Self::from_grid(grid, config, rng);
        game.check_and_recover()?;
        info!(
            "board {}x{} with {} colours ready",
            game.config.width, game.config.height, game.config.color_count
        );
        Ok(game)
    }

    /// Wrap an existing grid as is; no recovery pass. Dimensions and palette come from the grid.
    pub fn from_grid(grid: GridState, mut config: BoardConfig, rng: R) -> Self {
        config.width = grid.width();
        config.height = grid.height();
        config.color_count = grid.color_count();
        Self {
            grid,
            matcher: MatchEngine::new(),
            config,
            rng,
            stats: Stats::default(),
        }
    }

    #[inline]
    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    #[inline]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn connected_group(&mut self, pos: Pos) -> Result<Group, BoardError> {
        self.matcher.connected_group(&self.grid, pos)
    }

    pub fn board_has_any_move(&self) -> bool {
        matching::board_has_any_move(&self.grid)
    }

    /// Group labels and sizes for the whole board in one pass.
    pub fn group_map(&mut self) -> GroupMap {
        self.matcher.label_groups(&self.grid)
    }

    /// Visual tier of the tile at `pos`.
    pub fn tier_at(&mut self, pos: Pos) -> Result<GroupTier, BoardError> {
        let size = self.matcher.group_size(&self.grid, pos)?;
        Ok(self.config.tiers.tier_for(size))
    }

    /// One player action on the tile at `pos`.
    pub fn blast(&mut self, pos: Pos) -> Result<BlastOutcome, BoardError> {
        let group = self.connected_group(pos)?;
        if !group.is_removable() {
            return Ok(BlastOutcome::Ignored {
                group_size: group.len(),
            });
        }
        let changes = self.cascade(group.cells())?;
        self.stats.blasts += 1;
        self.stats.tiles_cleared += group.len() as u32;
        let resolution = self.recover(changes)?;
        Ok(BlastOutcome::Blasted {
            removed: group,
            resolution,
        })
    }

    /// Cascade on `cells`, then deadlock recovery; the change lists of both are merged.
    ///
    /// A rejected set leaves the board untouched. `RecoveryExhausted` comes after the cascade
    /// has been applied; its `changes` include the cascade's.
    pub fn remove_and_refill(&mut self, cells: &[Pos]) -> Result<Resolution, BoardError> {
        let changes = self.cascade(cells)?;
        self.recover(changes)
    }

    /// Cascade, then redraw the refilled cells if the colours on the board no longer repeat.
    fn cascade(&mut self, cells: &[Pos]) -> Result<ChangeSet, BoardError> {
        let changes = cascade::remove_and_refill(&mut self.grid, cells, &mut self.rng)?;
        recovery::redraw_fresh(&mut self.grid, &changes.spawned, &mut self.rng)?;
        Ok(changes)
    }

    fn recover(&mut self, mut changes: ChangeSet) -> Result<Resolution, BoardError> {
        match recovery::check_and_recover(&mut self.grid, &mut self.rng, self.config.max_reshuffles)
        {
            Ok(None) => Ok(Resolution {
                changes,
                reshuffled: false,
            }),
            Ok(Some(more)) => {
                self.stats.reshuffles += 1;
                changes.merge(more);
                Ok(Resolution {
                    changes,
                    reshuffled: true,
                })
            }
            Err(BoardError::RecoveryExhausted {
                attempts,
                changes: more,
            }) => {
                changes.merge(more);
                Err(BoardError::RecoveryExhausted { attempts, changes })
            }
            Err(e) => Err(e),
        }
    }

    /// Reshuffle if (and only if) the board has no move. Returns whether it did.
    pub fn check_and_recover(&mut self) -> Result<bool, BoardError> {
        let recovered =
            recovery::check_and_recover(&mut self.grid, &mut self.rng, self.config.max_reshuffles)?;
        if recovered.is_some() {
            self.stats.reshuffles += 1;
        }
        Ok(recovered.is_some())
    }

    /// One unconditional reshuffle; the board may still be deadlocked afterwards.
    pub fn reshuffle(&mut self) -> Result<ChangeSet, BoardError> {
        self.stats.reshuffles += 1;
        recovery::reshuffle(&mut self.grid, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupTiers;

    fn seeded(grid: GridState) -> Game {
        Game::from_grid(grid, BoardConfig::default(), StdRng::seed_from_u64(42))
    }

    #[test]
    fn test_initialize_is_playable() {
        for seed in 0..20 {
            let game = Game::from_config(BoardConfig::new(6, 5, 4).with_seed(seed)).unwrap();
            assert!(game.grid().is_full());
            assert!(game.board_has_any_move(), "seed {seed}");
        }
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = Game::from_config(BoardConfig::default().with_seed(7)).unwrap();
        let b = Game::from_config(BoardConfig::default().with_seed(7)).unwrap();
        assert_eq!(a.grid().to_rows(), b.grid().to_rows());
    }

    #[test]
    fn test_bad_config_is_rejected() {
        let err = Game::from_config(BoardConfig::new(0, 3, 2)).unwrap_err();
        assert!(matches!(err, BoardError::InvalidConfig(_)));
    }

    #[test]
    fn test_single_tile_board_cannot_be_made_playable() {
        let err = Game::from_config(BoardConfig::new(1, 1, 3).with_seed(1)).unwrap_err();
        assert!(matches!(err, BoardError::RecoveryExhausted { .. }));
    }

    #[test]
    fn test_lone_tile_click_is_ignored() {
        let mut game = seeded(GridState::from_colors(2, &[&[0, 0, 1]]).unwrap());
        let before = game.grid().clone();
        let out = game.blast(Pos::new(2, 0)).unwrap();
        assert_eq!(out, BlastOutcome::Ignored { group_size: 1 });
        assert_eq!(game.grid(), &before);
        assert_eq!(game.stats(), Stats::default());
    }

    #[test]
    fn test_blast_row_of_three() {
        let mut game = seeded(GridState::from_colors(2, &[&[0, 0, 1]]).unwrap());
        let out = game.blast(Pos::new(1, 0)).unwrap();
        let BlastOutcome::Blasted { removed, resolution } = out else {
            panic!("expected a blast");
        };
        assert_eq!(removed.len(), 2);
        assert!(resolution.changes.contains(Pos::new(0, 0)));
        assert!(resolution.changes.contains(Pos::new(1, 0)));
        if !resolution.reshuffled {
            assert_eq!(resolution.changes.len(), 2);
            assert_eq!(game.grid().color_at(Pos::new(2, 0)).unwrap(), Some(1));
        }
        assert!(game.board_has_any_move());
        assert_eq!(game.stats().blasts, 1);
        assert_eq!(game.stats().tiles_cleared, 2);
    }

    #[test]
    fn test_many_blasts_keep_board_playable() {
        let mut game = Game::from_config(BoardConfig::new(8, 8, 5).with_seed(2024)).unwrap();
        let mut blasts = 0;
        for _ in 0..200 {
            let map = game.group_map();
            let target = game
                .grid()
                .positions()
                .find(|&p| map.group_size(p) >= 2)
                .expect("recovery guarantees a move");
            if let BlastOutcome::Blasted { .. } = game.blast(target).unwrap() {
                blasts += 1;
            }
            assert!(game.grid().is_full());
            assert!(game.board_has_any_move());
        }
        assert_eq!(blasts, 200);
        assert_eq!(game.stats().blasts, 200);
    }

    #[test]
    fn test_invalid_removal_leaves_board_alone() {
        let mut game = seeded(GridState::from_colors(3, &[&[0, 1, 2]]).unwrap());
        let before = game.grid().clone();
        let err = game
            .remove_and_refill(&[Pos::new(0, 0), Pos::new(1, 0)])
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidRemoval { .. }));
        assert_eq!(game.grid(), &before);
    }

    #[test]
    fn test_tiers_follow_group_size() {
        #[rustfmt::skip]
        let grid = GridState::from_colors(3, &[
            &[0, 0, 0, 0],
            &[1, 1, 2, 2],
        ]).unwrap();
        let mut cfg = BoardConfig::default();
        cfg.tiers = GroupTiers { a: 2, b: 3, c: 4 };
        let mut game = Game::from_grid(grid, cfg, StdRng::seed_from_u64(0));
        assert_eq!(game.tier_at(Pos::new(0, 1)).unwrap(), GroupTier::C);
        assert_eq!(game.tier_at(Pos::new(0, 0)).unwrap(), GroupTier::A);
        assert!(game.tier_at(Pos::new(4, 0)).is_err());
    }

    #[test]
    fn test_small_many_colour_boards_start_playable() {
        for (w, h, cc) in [(2, 2, 4), (2, 2, 6), (2, 3, 6), (1, 2, 6)] {
            for seed in 0..200 {
                let game = Game::from_config(BoardConfig::new(w, h, cc).with_seed(seed))
                    .unwrap_or_else(|e| panic!("{w}x{h} cc={cc} seed {seed}: {e}"));
                assert!(game.board_has_any_move());
            }
        }
    }

    #[test]
    fn test_two_by_two_six_colour_session_never_sticks() {
        for seed in 0..40 {
            let mut game = Game::from_config(BoardConfig::new(2, 2, 6).with_seed(seed)).unwrap();
            for step in 0..30 {
                let map = game.group_map();
                let target = game.grid().positions().find(|&p| map.group_size(p) >= 2).unwrap();
                let outcome = game
                    .blast(target)
                    .unwrap_or_else(|e| panic!("seed {seed} step {step}: {e}"));
                assert!(matches!(outcome, BlastOutcome::Blasted { .. }));
                assert!(game.board_has_any_move());
            }
            assert_eq!(game.stats().blasts, 30);
        }
    }

    #[test]
    fn test_exhausted_blast_still_counts_and_reports_changes() {
        let mut cfg = BoardConfig::default();
        cfg.max_reshuffles = 0;
        let mut stuck = 0;
        for seed in 0..32 {
            let grid = GridState::from_colors(6, &[&[0, 0, 5]]).unwrap();
            let mut game = Game::from_grid(grid, cfg.clone(), StdRng::seed_from_u64(seed));
            match game.blast(Pos::new(0, 0)) {
                Ok(BlastOutcome::Blasted { .. }) => assert!(game.board_has_any_move()),
                Ok(other) => panic!("unexpected {other:?}"),
                Err(BoardError::RecoveryExhausted { attempts, changes }) => {
                    stuck += 1;
                    assert_eq!(attempts, 0);
                    assert!(changes.contains(Pos::new(0, 0)));
                    assert!(changes.contains(Pos::new(1, 0)));
                    assert_eq!(changes.spawned.len(), 2);
                    assert_eq!(game.stats().blasts, 1);
                    assert_eq!(game.stats().tiles_cleared, 2);
                    assert!(game.grid().is_full());
                }
                Err(e) => panic!("unexpected {e}"),
            }
        }
        assert!(stuck > 0);
    }

    #[test]
    fn test_deadlocked_fixture_recovers() {
        let mut game = seeded(GridState::from_colors(2, &[&[0, 1, 0], &[1, 0, 1]]).unwrap());
        assert!(!game.board_has_any_move());
        assert!(game.check_and_recover().unwrap());
        assert!(game.board_has_any_move());
        assert_eq!(game.stats().reshuffles, 1);
        assert!(!game.check_and_recover().unwrap());
    }
}
