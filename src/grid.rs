//! Grid state: a fixed `width x height` array of cells, each empty or holding a coloured tile.
//!
//! Coordinates are `(x, y)` with x growing left to right and y growing bottom to top, so
//! gravity pulls tiles towards `y = 0`. Storage is column-major (`x * height + y`), which keeps
//! each column contiguous for compaction.

use crate::error::BoardError;
use rand::Rng;
use std::fmt;

/// Palette index of a tile, in `0..color_count`.
pub type ColorId = u8;

/// Orthogonal neighbour offsets, visited in this order everywhere: up, down, left, right.
pub const NEIGHBOURS_4: [(isize, isize); 4] = [(0, 1), (0, -1), (-1, 0), (1, 0)];

/// Board coordinate. Ordering is column-major: by x, then by y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Offset by `(dx, dy)`; `None` if that would go below zero.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Stable identity of a tile for the lifetime of the tile. Never reused within a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub color: ColorId,
}

/// Single cell: either empty or a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Tile(Tile),
}

impl Cell {
    #[inline]
    pub fn color(self) -> Option<ColorId> {
        match self {
            Self::Empty => None,
            Self::Tile(t) => Some(t.color),
        }
    }

    #[inline]
    pub fn tile(self) -> Option<Tile> {
        match self {
            Self::Empty => None,
            Self::Tile(t) => Some(t),
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    width: usize,
    height: usize,
    color_count: u8,
    /// cells[x * height + y]
    cells: Vec<Cell>,
    next_id: u32,
}

impl GridState {
    /// Empty board. `color_count` of zero is treated as one.
    pub fn new(width: usize, height: usize, color_count: u8) -> Self {
        Self {
            width,
            height,
            color_count: color_count.max(1),
            cells: vec![Cell::Empty; width * height],
            next_id: 0,
        }
    }

    /// Board with every cell drawn uniformly from the palette.
    pub fn random<R: Rng + ?Sized>(width: usize, height: usize, color_count: u8, rng: &mut R) -> Self {
        let mut grid = Self::new(width, height, color_count);
        for x in 0..width {
            for y in 0..height {
                let color = grid.random_color(rng);
                grid.place_new(x * height + y, color);
            }
        }
        grid
    }

    /// Build a board from literal rows, **top row first** (so the slice reads like the screen).
    /// `None` marks an empty cell.
    pub fn from_rows(color_count: u8, rows: &[&[Option<ColorId>]]) -> Result<Self, BoardError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != width) {
            return Err(BoardError::InvalidConfig("rows have different lengths".into()));
        }
        let mut grid = Self::new(width, height, color_count);
        for (row_index, row) in rows.iter().enumerate() {
            let y = height - 1 - row_index;
            for (x, cell) in row.iter().enumerate() {
                if let Some(color) = *cell {
                    if color >= grid.color_count {
                        return Err(BoardError::InvalidConfig(format!(
                            "colour {color} at ({x}, {y}) is outside a palette of {}",
                            grid.color_count
                        )));
                    }
                    grid.place_new(x * height + y, color);
                }
            }
        }
        Ok(grid)
    }

    /// Fully populated board from literal colour rows, top row first.
    pub fn from_colors(color_count: u8, rows: &[&[ColorId]]) -> Result<Self, BoardError> {
        let rows: Vec<Vec<Option<ColorId>>> = rows
            .iter()
            .map(|r| r.iter().copied().map(Some).collect())
            .collect();
        let refs: Vec<&[Option<ColorId>]> = rows.iter().map(Vec::as_slice).collect();
        Self::from_rows(color_count, &refs)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn color_count(&self) -> u8 {
        self.color_count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Flat index of `pos`, or `OutOfBounds`.
    #[inline]
    pub fn index(&self, pos: Pos) -> Result<usize, BoardError> {
        if self.contains(pos) {
            Ok(pos.x * self.height + pos.y)
        } else {
            Err(BoardError::OutOfBounds {
                pos,
                width: self.width,
                height: self.height,
            })
        }
    }

    #[inline]
    pub fn pos_of(&self, index: usize) -> Pos {
        Pos::new(index / self.height, index % self.height)
    }

    pub fn get(&self, pos: Pos) -> Result<Cell, BoardError> {
        Ok(self.cells[self.index(pos)?])
    }

    pub fn color_at(&self, pos: Pos) -> Result<Option<ColorId>, BoardError> {
        self.get(pos).map(Cell::color)
    }

    pub fn set(&mut self, pos: Pos, cell: Cell) -> Result<(), BoardError> {
        let i = self.index(pos)?;
        self.cells[i] = cell;
        Ok(())
    }

    /// Empty the cell and return what was there.
    pub fn take(&mut self, pos: Pos) -> Result<Cell, BoardError> {
        let i = self.index(pos)?;
        Ok(std::mem::take(&mut self.cells[i]))
    }

    /// Put a brand-new tile (fresh id) of `color` at `pos`.
    pub fn spawn(&mut self, pos: Pos, color: ColorId) -> Result<Tile, BoardError> {
        let i = self.index(pos)?;
        Ok(self.place_new(i, color % self.color_count))
    }

    /// Put a brand-new tile with a uniformly drawn colour at `pos`.
    pub fn spawn_random<R: Rng + ?Sized>(&mut self, pos: Pos, rng: &mut R) -> Result<Tile, BoardError> {
        let i = self.index(pos)?;
        let color = self.random_color(rng);
        Ok(self.place_new(i, color))
    }

    #[inline]
    pub fn random_color<R: Rng + ?Sized>(&self, rng: &mut R) -> ColorId {
        rng.gen_range(0..self.color_count)
    }

    /// Raw cell slice in column-major order.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// All coordinates, column-major (x ascending, then y ascending).
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.width).flat_map(move |x| (0..self.height).map(move |y| Pos::new(x, y)))
    }

    /// In-bounds orthogonal neighbours of `pos`, in up, down, left, right order.
    pub fn neighbours(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        NEIGHBOURS_4
            .iter()
            .filter_map(move |&(dx, dy)| pos.offset(dx, dy))
            .filter(move |p| self.contains(*p))
    }

    /// True when no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    /// Number of tiles of each colour, indexed by colour id.
    pub fn color_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.color_count as usize];
        for color in self.cells.iter().filter_map(|c| c.color()) {
            counts[color as usize] += 1;
        }
        counts
    }

    /// Rows top first, colours only. Handy for assertions and debug dumps.
    pub fn to_rows(&self) -> Vec<Vec<Option<ColorId>>> {
        (0..self.height)
            .rev()
            .map(|y| {
                (0..self.width)
                    .map(|x| self.cells[x * self.height + y].color())
                    .collect()
            })
            .collect()
    }

    fn place_new(&mut self, index: usize, color: ColorId) -> Tile {
        let tile = Tile {
            id: TileId(self.next_id),
            color,
        };
        self.next_id = self.next_id.wrapping_add(1);
        self.cells[index] = Cell::Tile(tile);
        tile
    }
}

impl fmt::Display for GridState {
    /// One line per row, top first; `.` for empty cells, colour ids otherwise (base 36).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.to_rows() {
            for cell in row {
                let ch = cell
                    .and_then(|c| char::from_digit(u32::from(c), 36))
                    .unwrap_or('.');
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
