//! Engine errors. Every fallible board operation returns `Result<_, BoardError>`.

use crate::changes::ChangeSet;
use crate::grid::Pos;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Coordinate outside the board. Internal code never produces these; seeing one is a caller bug.
    #[error("position {pos} is outside the {width}x{height} board")]
    OutOfBounds { pos: Pos, width: usize, height: usize },

    /// Removal rejected before anything was touched.
    #[error("invalid removal at {pos}: {reason}")]
    InvalidRemoval { pos: Pos, reason: RemovalFault },

    /// Recovery gave up. `changes` lists every cell that was rewritten on the way, so a caller
    /// can redraw the board it is left with.
    #[error("board still has no legal move after {attempts} reshuffle attempt(s)")]
    RecoveryExhausted { attempts: u32, changes: ChangeSet },

    #[error("invalid board configuration: {0}")]
    InvalidConfig(String),
}

/// Why a removal set was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalFault {
    Empty,
    ColorMismatch,
    NothingToRemove,
}

impl fmt::Display for RemovalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "cell is already empty",
            Self::ColorMismatch => "cell colour differs from the rest of the set",
            Self::NothingToRemove => "removal set is empty",
        };
        f.write_str(s)
    }
}
