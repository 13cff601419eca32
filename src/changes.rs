//! Change lists handed to the presentation layer after each mutating operation.

use crate::grid::{Pos, TileId};
use std::collections::BTreeSet;

/// A surviving tile that moved from one cell to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMove {
    pub id: TileId,
    pub from: Pos,
    pub to: Pos,
}

/// Every coordinate whose occupant changed, plus enough detail to animate it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    cells: BTreeSet<Pos>,
    /// Tiles that slid down (cascade) or were relocated (reshuffle).
    pub moves: Vec<TileMove>,
    /// Cells that received a freshly generated tile.
    pub spawned: Vec<Pos>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn touch(&mut self, pos: Pos) {
        self.cells.insert(pos);
    }

    pub fn record_move(&mut self, id: TileId, from: Pos, to: Pos) {
        self.cells.insert(from);
        self.cells.insert(to);
        self.moves.push(TileMove { id, from, to });
    }

    pub fn record_spawn(&mut self, pos: Pos) {
        self.cells.insert(pos);
        self.spawned.push(pos);
    }

    /// Changed coordinates in column-major order.
    pub fn cells(&self) -> impl Iterator<Item = Pos> + '_ {
        self.cells.iter().copied()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains(&pos)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Fold a later change list into this one (cascade followed by reshuffle, say).
    pub fn merge(&mut self, other: Self) {
        self.cells.extend(other.cells);
        self.moves.extend(other.moves);
        self.spawned.extend(other.spawned);
    }
}

impl FromIterator<Pos> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Pos>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}
