//! Property-based tests for the board engine using proptest
//!
//! These check invariants over random boards:
//! - Flood fill returns exactly the maximal same-colour component
//! - Queries neither mutate the board nor depend on call history
//! - Rejected removals leave the board untouched
//! - Gravity keeps survivors in order and refill leaves no holes
//! - Boards handed to the player always have a move, however many colours
//! - Reshuffling keeps the tiles that were on the board

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashSet};
use tileblast::cascade::remove_and_refill;
use tileblast::recovery::reshuffle;
use tileblast::{BlastOutcome, BoardConfig, BoardError, Game, GridState, MatchEngine, Pos, TileId};

const MAX_SIDE: usize = 8;
const BLAST_STEPS: usize = 25;

/// Random full board: (width, height, colours, seed).
fn board() -> impl Strategy<Value = GridState> {
    (1..=MAX_SIDE, 1..=MAX_SIDE, 1u8..=6, any::<u64>()).prop_map(|(w, h, cc, seed)| {
        let mut rng = StdRng::seed_from_u64(seed);
        GridState::random(w, h, cc, &mut rng)
    })
}

/// Board plus an in-bounds position on it.
fn board_and_pos() -> impl Strategy<Value = (GridState, Pos)> {
    board().prop_flat_map(|grid| {
        let (w, h) = grid.dims();
        (Just(grid), 0..w, 0..h).prop_map(|(grid, x, y)| (grid, Pos::new(x, y)))
    })
}

fn tile_ids(grid: &GridState) -> BTreeSet<TileId> {
    grid.cells().iter().filter_map(|c| c.tile()).map(|t| t.id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn flood_fill_is_the_maximal_component((grid, pos) in board_and_pos()) {
        let mut engine = MatchEngine::new();
        let group = engine.connected_group(&grid, pos).unwrap();
        let color = grid.color_at(pos).unwrap();

        prop_assert_eq!(group.color(), color);
        prop_assert_eq!(group.cells().first().copied(), Some(pos));
        let members: HashSet<Pos> = group.cells().iter().copied().collect();
        prop_assert_eq!(members.len(), group.len());

        for &p in group.cells() {
            prop_assert_eq!(grid.color_at(p).unwrap(), color);
            // Closed under same-colour adjacency.
            for n in grid.neighbours(p) {
                if grid.color_at(n).unwrap() == color {
                    prop_assert!(members.contains(&n));
                }
            }
        }

        // Every member other than the seed touches another member.
        if group.len() > 1 {
            for &p in group.cells() {
                prop_assert!(grid.neighbours(p).any(|n| members.contains(&n)));
            }
        }

        let map = engine.label_groups(&grid);
        prop_assert_eq!(map.group_size(pos), group.len());
    }

    #[test]
    fn queries_are_pure_and_repeatable((grid, pos) in board_and_pos()) {
        let before = grid.clone();
        let mut engine = MatchEngine::new();
        let first = engine.connected_group(&grid, pos).unwrap();
        for p in grid.positions() {
            engine.connected_group(&grid, p).unwrap();
        }
        let again = engine.connected_group(&grid, pos).unwrap();
        let fresh = MatchEngine::new().connected_group(&grid, pos).unwrap();

        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&first, &fresh);
        prop_assert_eq!(&grid, &before);

        let any_move = tileblast::board_has_any_move(&grid);
        let map = MatchEngine::new().label_groups(&grid);
        prop_assert_eq!(any_move, map.largest() >= 2);
        prop_assert_eq!(&grid, &before);
    }

    #[test]
    fn rejected_removals_do_not_touch_the_board(
        mut grid in board(),
        picks in prop::collection::vec((0..MAX_SIDE + 2, 0..MAX_SIDE + 2), 0..6),
        seed in any::<u64>(),
    ) {
        let cells: Vec<Pos> = picks.into_iter().map(|(x, y)| Pos::new(x, y)).collect();
        let before = grid.clone();
        let mut rng = StdRng::seed_from_u64(seed);
        match remove_and_refill(&mut grid, &cells, &mut rng) {
            Ok(changes) => {
                prop_assert!(grid.is_full());
                for p in &cells {
                    prop_assert!(changes.contains(*p));
                }
            }
            Err(e) => {
                let ok = matches!(
                    e,
                    BoardError::OutOfBounds { .. } | BoardError::InvalidRemoval { .. }
                );
                prop_assert!(ok, "unexpected {:?}", e);
                prop_assert_eq!(&grid, &before);
            }
        }
    }

    #[test]
    fn gravity_keeps_survivor_order((mut grid, pos) in board_and_pos(), seed in any::<u64>()) {
        let group = MatchEngine::new().connected_group(&grid, pos).unwrap();
        let removed: HashSet<Pos> = group.cells().iter().copied().collect();
        let h = grid.height();

        let survivors: Vec<Vec<TileId>> = (0..grid.width())
            .map(|x| {
                (0..h)
                    .map(|y| Pos::new(x, y))
                    .filter(|p| !removed.contains(p))
                    .filter_map(|p| grid.get(p).unwrap().tile())
                    .map(|t| t.id)
                    .collect()
            })
            .collect();
        let old_ids = tile_ids(&grid);

        let mut rng = StdRng::seed_from_u64(seed);
        let changes = remove_and_refill(&mut grid, group.cells(), &mut rng).unwrap();
        prop_assert!(grid.is_full());
        prop_assert_eq!(changes.spawned.len(), group.len());

        for (x, column) in survivors.iter().enumerate() {
            for (y, id) in column.iter().enumerate() {
                let tile = grid.get(Pos::new(x, y)).unwrap().tile().unwrap();
                prop_assert_eq!(tile.id, *id);
            }
            // Everything above the survivors is new.
            for y in column.len()..h {
                let tile = grid.get(Pos::new(x, y)).unwrap().tile().unwrap();
                prop_assert!(!old_ids.contains(&tile.id));
            }
        }
    }

    #[test]
    fn reshuffle_keeps_the_tiles(mut grid in board(), seed in any::<u64>()) {
        let counts = grid.color_counts();
        let ids = tile_ids(&grid);
        let mut rng = StdRng::seed_from_u64(seed);
        let changes = reshuffle(&mut grid, &mut rng).unwrap();

        prop_assert_eq!(grid.color_counts(), counts);
        prop_assert_eq!(tile_ids(&grid), ids);
        prop_assert!(changes.spawned.is_empty());
        prop_assert_eq!(changes.len(), grid.len());
    }

    #[test]
    fn new_boards_are_playable(w in 1..=MAX_SIDE, h in 1..=MAX_SIDE, cc in 1u8..=6, seed in any::<u64>()) {
        let config = BoardConfig { max_reshuffles: 64, ..BoardConfig::new(w, h, cc).with_seed(seed) };
        match Game::from_config(config) {
            Ok(game) => {
                prop_assert!(game.grid().is_full());
                prop_assert!(game.board_has_any_move());
            }
            Err(e) => {
                let ok = matches!(e, BoardError::RecoveryExhausted { .. });
                prop_assert!(ok, "unexpected {:?}", e);
                // A single cell can never pair up.
                prop_assert!(w * h < 2, "{}x{} with {} colours got stuck", w, h, cc);
            }
        }
    }

    #[test]
    fn blasting_never_leaves_a_dead_board(w in 2..=MAX_SIDE, h in 2..=MAX_SIDE, cc in 2u8..=6, seed in any::<u64>()) {
        let config = BoardConfig { max_reshuffles: 64, ..BoardConfig::new(w, h, cc).with_seed(seed) };
        let mut game = Game::from_config(config).unwrap();
        for _ in 0..BLAST_STEPS {
            let map = game.group_map();
            let target = game.grid().positions().find(|&p| map.group_size(p) >= 2);
            prop_assert!(target.is_some());
            let Some(target) = target else { break };
            let outcome = game.blast(target).unwrap();
            let blasted = matches!(outcome, BlastOutcome::Blasted { .. });
            prop_assert!(blasted, "blast was ignored");
            prop_assert!(game.grid().is_full());
            prop_assert!(game.board_has_any_move());
        }
    }
}
