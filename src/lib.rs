//! Tileblast: the grid/match engine behind a tile-blast puzzle.
//!
//! Players pick a tile; if its same-colour 4-connected group has two or more tiles the group is
//! removed, columns fall, new tiles drop in from the top, and the board is checked (and
//! reshuffled if needed) so that a legal move always exists.
//!
//! The engine is plain data plus algorithms: no rendering, no timing, no I/O. Every mutating
//! operation returns a [`ChangeSet`] so a front end knows what to redraw.
//!
//! ```
//! use tileblast::{BlastOutcome, BoardConfig, Game};
//!
//! let mut game = Game::from_config(BoardConfig::new(8, 8, 4).with_seed(1)).unwrap();
//! assert!(game.board_has_any_move());
//!
//! let map = game.group_map();
//! let target = game.grid().positions().find(|&p| map.group_size(p) >= 2).unwrap();
//! match game.blast(target).unwrap() {
//!     BlastOutcome::Blasted { removed, resolution } => {
//!         assert!(removed.len() >= 2);
//!         assert!(resolution.changes.len() >= removed.len());
//!     }
//!     BlastOutcome::Ignored { .. } => unreachable!(),
//! }
//! assert!(game.board_has_any_move());
//! ```

pub mod cascade;
pub mod changes;
pub mod config;
pub mod error;
pub mod game;
pub mod grid;
pub mod matching;
pub mod recovery;

pub use changes::{ChangeSet, TileMove};
pub use config::{BoardConfig, GroupTier, GroupTiers};
pub use error::{BoardError, RemovalFault};
pub use game::{BlastOutcome, Game, Resolution, Stats};
pub use grid::{Cell, ColorId, GridState, Pos, Tile, TileId};
pub use matching::{Group, GroupMap, MatchEngine, board_has_any_move};
