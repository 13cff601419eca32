//! Cascade: remove a set of tiles, let each column fall, refill the gaps at the top.

use crate::changes::ChangeSet;
use crate::error::{BoardError, RemovalFault};
use crate::grid::{Cell, GridState, Pos};
use log::debug;
use rand::Rng;
use std::collections::BTreeSet;

/// Remove `cells`, compact every affected column downwards and fill what is left empty with
/// fresh tiles drawn uniformly from the palette.
///
/// All-or-nothing: the set is checked first (in bounds, occupied, one colour, non-empty) and the
/// grid is untouched when any check fails. Duplicated coordinates count once.
pub fn remove_and_refill<R: Rng + ?Sized>(
    grid: &mut GridState,
    cells: &[Pos],
    rng: &mut R,
) -> Result<ChangeSet, BoardError> {
    let targets = validate(grid, cells)?;

    let mut changes = ChangeSet::new();
    let mut columns = BTreeSet::new();
    for &pos in &targets {
        grid.take(pos)?;
        changes.touch(pos);
        columns.insert(pos.x);
    }

    let h = grid.height();
    for &x in &columns {
        // Stable pull-down: survivors keep their relative order.
        let mut write = 0;
        for y in 0..h {
            let from = Pos::new(x, y);
            let Some(tile) = grid.get(from)?.tile() else {
                continue;
            };
            if y != write {
                let to = Pos::new(x, write);
                grid.set(to, Cell::Tile(tile))?;
                grid.set(from, Cell::Empty)?;
                changes.record_move(tile.id, from, to);
            }
            write += 1;
        }
        for y in write..h {
            let pos = Pos::new(x, y);
            grid.spawn_random(pos, rng)?;
            changes.record_spawn(pos);
        }
    }

    debug!(
        "cascade: removed {}, dropped {}, spawned {}",
        targets.len(),
        changes.moves.len(),
        changes.spawned.len()
    );
    Ok(changes)
}

fn validate(grid: &GridState, cells: &[Pos]) -> Result<BTreeSet<Pos>, BoardError> {
    let Some(&first) = cells.first() else {
        return Err(BoardError::InvalidRemoval {
            pos: Pos::default(),
            reason: RemovalFault::NothingToRemove,
        });
    };
    let expected = grid.color_at(first)?;
    for &pos in cells {
        let reason = match grid.color_at(pos)? {
            None => RemovalFault::Empty,
            Some(c) if Some(c) != expected => RemovalFault::ColorMismatch,
            Some(_) => continue,
        };
        return Err(BoardError::InvalidRemoval { pos, reason });
    }
    Ok(cells.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ColorId;
    use crate::matching::MatchEngine;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xB1A5)
    }

    #[test]
    fn test_row_of_three_refills_in_place() {
        let mut grid = GridState::from_colors(2, &[&[0, 0, 1]]).unwrap();
        let untouched = grid.get(Pos::new(2, 0)).unwrap();

        let changes =
            remove_and_refill(&mut grid, &[Pos::new(0, 0), Pos::new(1, 0)], &mut rng()).unwrap();

        assert_eq!(
            changes.cells().collect::<Vec<_>>(),
            vec![Pos::new(0, 0), Pos::new(1, 0)]
        );
        assert!(changes.moves.is_empty());
        assert_eq!(changes.spawned.len(), 2);
        assert!(grid.is_full());
        assert_eq!(grid.get(Pos::new(2, 0)).unwrap(), untouched);
    }

    #[test]
    fn test_gravity_keeps_column_order() {
        // Column 0 bottom to top: 1, 0, 2, 0, 3. Remove the two 0s.
        let mut grid = GridState::from_colors(4, &[&[3], &[0], &[2], &[0], &[1]]).unwrap();
        let ids: Vec<_> = (0..5)
            .map(|y| grid.get(Pos::new(0, y)).unwrap().tile().unwrap().id)
            .collect();

        let changes =
            remove_and_refill(&mut grid, &[Pos::new(0, 1), Pos::new(0, 3)], &mut rng()).unwrap();

        let column: Vec<Option<ColorId>> =
            (0..5).map(|y| grid.color_at(Pos::new(0, y)).unwrap()).collect();
        assert_eq!(&column[..3], &[Some(1), Some(2), Some(3)]);
        assert!(column[3].is_some() && column[4].is_some());

        // The tile that was at y=2 fell one row, the one at y=4 fell two.
        assert_eq!(grid.get(Pos::new(0, 1)).unwrap().tile().unwrap().id, ids[2]);
        assert_eq!(grid.get(Pos::new(0, 2)).unwrap().tile().unwrap().id, ids[4]);
        assert_eq!(changes.moves.len(), 2);
        assert_eq!(changes.spawned, vec![Pos::new(0, 3), Pos::new(0, 4)]);
        assert_eq!(changes.len(), 4);
    }

    #[test]
    fn test_other_columns_are_left_alone() {
        #[rustfmt::skip]
        let mut grid = GridState::from_colors(3, &[
            &[2, 1, 2],
            &[0, 0, 1],
        ]).unwrap();
        let before_col2: Vec<_> = (0..2).map(|y| grid.get(Pos::new(2, y)).unwrap()).collect();
        let changes =
            remove_and_refill(&mut grid, &[Pos::new(0, 0), Pos::new(1, 0)], &mut rng()).unwrap();
        let after_col2: Vec<_> = (0..2).map(|y| grid.get(Pos::new(2, y)).unwrap()).collect();
        assert_eq!(before_col2, after_col2);
        assert_eq!(grid.color_at(Pos::new(0, 0)).unwrap(), Some(2));
        assert_eq!(grid.color_at(Pos::new(1, 0)).unwrap(), Some(1));
        assert!(!changes.contains(Pos::new(2, 0)));
    }

    #[test]
    fn test_empty_cell_rejects_whole_removal() {
        let mut grid = GridState::from_rows(2, &[&[Some(0), None, Some(0)]]).unwrap();
        let before = grid.clone();
        let err = remove_and_refill(&mut grid, &[Pos::new(0, 0), Pos::new(1, 0)], &mut rng())
            .unwrap_err();
        assert_eq!(
            err,
            BoardError::InvalidRemoval {
                pos: Pos::new(1, 0),
                reason: RemovalFault::Empty
            }
        );
        assert_eq!(grid, before);
    }

    #[test]
    fn test_mixed_colours_and_bad_coordinates_are_rejected() {
        let mut grid = GridState::from_colors(2, &[&[0, 1, 1]]).unwrap();
        let before = grid.clone();
        let err = remove_and_refill(&mut grid, &[Pos::new(0, 0), Pos::new(1, 0)], &mut rng())
            .unwrap_err();
        assert!(matches!(
            err,
            BoardError::InvalidRemoval {
                reason: RemovalFault::ColorMismatch,
                ..
            }
        ));
        let err = remove_and_refill(&mut grid, &[Pos::new(1, 0), Pos::new(3, 0)], &mut rng())
            .unwrap_err();
        assert!(matches!(err, BoardError::OutOfBounds { .. }));
        let err = remove_and_refill(&mut grid, &[], &mut rng()).unwrap_err();
        assert!(matches!(
            err,
            BoardError::InvalidRemoval {
                reason: RemovalFault::NothingToRemove,
                ..
            }
        ));
        assert_eq!(grid, before);
    }

    #[test]
    fn test_duplicates_count_once() {
        let mut grid = GridState::from_colors(2, &[&[1], &[0], &[0]]).unwrap();
        let changes = remove_and_refill(
            &mut grid,
            &[Pos::new(0, 0), Pos::new(0, 0), Pos::new(0, 1)],
            &mut rng(),
        )
        .unwrap();
        assert_eq!(grid.color_at(Pos::new(0, 0)).unwrap(), Some(1));
        assert_eq!(changes.spawned.len(), 2);
    }

    #[test]
    fn test_blasting_a_flood_filled_group() {
        #[rustfmt::skip]
        let mut grid = GridState::from_colors(3, &[
            &[1, 2, 1],
            &[0, 0, 2],
            &[0, 1, 2],
        ]).unwrap();
        let mut engine = MatchEngine::new();
        let group = engine.connected_group(&grid, Pos::new(0, 0)).unwrap();
        assert_eq!(group.len(), 3);

        remove_and_refill(&mut grid, group.cells(), &mut rng()).unwrap();

        assert!(grid.is_full());
        assert_eq!(grid.color_at(Pos::new(0, 0)).unwrap(), Some(1));
        assert_eq!(grid.color_at(Pos::new(1, 0)).unwrap(), Some(1));
        assert_eq!(grid.color_at(Pos::new(1, 1)).unwrap(), Some(2));
        assert_eq!(grid.color_at(Pos::new(2, 2)).unwrap(), Some(1));
    }
}
