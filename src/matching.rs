//! Match engine: same-colour 4-connected groups via an explicit-stack flood fill.
//!
//! The visited marks are scratch memory owned by [`MatchEngine`]. Instead of clearing a bool
//! array before every fill, each fill bumps a stamp and a cell counts as visited only when its
//! mark equals the current stamp, so nothing from an earlier call can leak into the next one.

use crate::error::BoardError;
use crate::grid::{ColorId, GridState, Pos};

/// Smallest group a player may blast.
pub const MIN_GROUP_SIZE: usize = 2;

/// A connected same-colour region, in flood-fill discovery order (seed first).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Group {
    color: Option<ColorId>,
    cells: Vec<Pos>,
}

impl Group {
    /// The "nothing here" result for an empty seed cell.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn color(&self) -> Option<ColorId> {
        self.color
    }

    #[inline]
    pub fn cells(&self) -> &[Pos] {
        &self.cells
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// A lone tile is never a legal target.
    #[inline]
    pub fn is_removable(&self) -> bool {
        is_removable(self.len())
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains(&pos)
    }
}

#[inline]
pub fn is_removable(group_size: usize) -> bool {
    group_size >= MIN_GROUP_SIZE
}

/// True if some group of size >= 2 exists.
///
/// A cell belongs to a group of two or more exactly when one of its orthogonal neighbours has
/// the same colour, so checking right and up neighbours of every cell answers the question
/// without running any fill. Stops at the first hit.
pub fn board_has_any_move(grid: &GridState) -> bool {
    let (w, h) = grid.dims();
    let cells = grid.cells();
    for x in 0..w {
        for y in 0..h {
            let Some(color) = cells[x * h + y].color() else {
                continue;
            };
            if y + 1 < h && cells[x * h + y + 1].color() == Some(color) {
                return true;
            }
            if x + 1 < w && cells[(x + 1) * h + y].color() == Some(color) {
                return true;
            }
        }
    }
    false
}

#[derive(Debug, Default)]
pub struct MatchEngine {
    marks: Vec<u32>,
    stamp: u32,
    stack: Vec<Pos>,
}

impl MatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group containing `pos`. Empty cell gives an empty group; out of bounds is an error.
    pub fn connected_group(&mut self, grid: &GridState, pos: Pos) -> Result<Group, BoardError> {
        let seed = grid.index(pos)?;
        let Some(color) = grid.cells()[seed].color() else {
            return Ok(Group::empty());
        };

        self.begin(grid.len());
        let stamp = self.stamp;
        let h = grid.height();
        let cells = grid.cells();
        let mut members = Vec::new();

        self.marks[seed] = stamp;
        self.stack.push(pos);
        while let Some(current) = self.stack.pop() {
            members.push(current);
            for n in grid.neighbours(current) {
                let i = n.x * h + n.y;
                if self.marks[i] != stamp && cells[i].color() == Some(color) {
                    self.marks[i] = stamp;
                    self.stack.push(n);
                }
            }
        }

        Ok(Group {
            color: Some(color),
            cells: members,
        })
    }

    /// Size of the group at `pos` (0 for an empty cell).
    pub fn group_size(&mut self, grid: &GridState, pos: Pos) -> Result<usize, BoardError> {
        self.connected_group(grid, pos).map(|g| g.len())
    }

    /// Label every group on the board in one pass. Cost is O(width * height) total, which is
    /// what a whole-board visual refresh wants instead of one fill per tile.
    pub fn label_groups(&mut self, grid: &GridState) -> GroupMap {
        let h = grid.height();
        let cells = grid.cells();
        let mut labels = vec![GroupMap::UNLABELLED; cells.len()];
        let mut sizes = Vec::new();

        for seed in 0..cells.len() {
            if labels[seed] != GroupMap::UNLABELLED {
                continue;
            }
            let Some(color) = cells[seed].color() else {
                continue;
            };
            let label = sizes.len() as u32;
            let mut size = 0usize;
            labels[seed] = label;
            self.stack.clear();
            self.stack.push(grid.pos_of(seed));
            while let Some(current) = self.stack.pop() {
                size += 1;
                for n in grid.neighbours(current) {
                    let i = n.x * h + n.y;
                    if labels[i] == GroupMap::UNLABELLED && cells[i].color() == Some(color) {
                        labels[i] = label;
                        self.stack.push(n);
                    }
                }
            }
            sizes.push(size);
        }

        GroupMap {
            width: grid.width(),
            height: h,
            labels,
            sizes,
        }
    }

    fn begin(&mut self, cell_count: usize) {
        if self.marks.len() != cell_count {
            self.marks = vec![0; cell_count];
            self.stamp = 0;
        }
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.marks.fill(0);
            self.stamp = 1;
        }
        self.stack.clear();
    }
}

/// Result of [`MatchEngine::label_groups`]: a group label per cell and the size of each group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMap {
    width: usize,
    height: usize,
    labels: Vec<u32>,
    sizes: Vec<usize>,
}

impl GroupMap {
    const UNLABELLED: u32 = u32::MAX;

    fn index(&self, pos: Pos) -> Option<usize> {
        (pos.x < self.width && pos.y < self.height).then(|| pos.x * self.height + pos.y)
    }

    /// Group label of the tile at `pos`; `None` for empty or out-of-bounds cells.
    pub fn label(&self, pos: Pos) -> Option<usize> {
        let l = self.labels[self.index(pos)?];
        (l != Self::UNLABELLED).then_some(l as usize)
    }

    /// Size of the group the tile at `pos` belongs to; 0 for empty or out of bounds.
    pub fn group_size(&self, pos: Pos) -> usize {
        self.label(pos).map_or(0, |l| self.sizes[l])
    }

    pub fn group_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn largest(&self) -> usize {
        self.sizes.iter().copied().max().unwrap_or(0)
    }

    /// How many groups could be blasted right now.
    pub fn removable_count(&self) -> usize {
        self.sizes.iter().filter(|&&s| is_removable(s)).count()
    }

}
