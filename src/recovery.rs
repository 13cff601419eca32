//! Deadlock recovery: when no group of two or more exists, redistribute the tiles already on
//! the board so that same-colour neighbours become likely, and retry a bounded number of times.
//!
//! Pool order is fixed so seeded runs are reproducible: tiles are collected column-major
//! (x ascending, then y ascending) and removals keep the remaining order. Random picks draw a
//! uniform index into the pool; the neighbour pass takes the lowest-index tile of the centre's
//! colour and visits neighbours up, down, left, right.

use crate::changes::ChangeSet;
use crate::error::BoardError;
use crate::grid::{Cell, GridState, Pos, Tile};
use crate::matching::board_has_any_move;
use log::{debug, info, warn};
use rand::Rng;

/// Upper bound on cluster seeds per reshuffle.
pub const MAX_CLUSTERS: usize = 6;

/// Redraws of freshly generated tiles before a matching pair is placed outright.
pub const MAX_REDRAWS: u32 = 16;

/// Number of cluster centres for a board: one per ten cells, at least 1, at most 6.
pub fn cluster_count(width: usize, height: usize) -> usize {
    ((width * height) / 10).clamp(1, MAX_CLUSTERS)
}

/// Whether any arrangement of the current tiles could contain a group of two.
///
/// Reshuffling keeps the colour multiset, so a full board where every colour appears at most
/// once (or a board with fewer than two cells) can never be repaired by it.
pub fn can_ever_match(grid: &GridState) -> bool {
    if grid.len() < 2 {
        return false;
    }
    !grid.is_full() || grid.color_counts().iter().any(|&n| n >= 2)
}

/// Make a board that no reshuffle could repair (see [`can_ever_match`]) repairable again by
/// recolouring tiles that were only just generated.
///
/// The `fresh` cells are redrawn from the palette up to [`MAX_REDRAWS`] times. If the colours
/// still never repeat, the first fresh cell takes the colour of a neighbour, which is a move.
/// Returns whether the board can now be made playable; with no fresh cells, or fewer than two
/// cells on the board, nothing is touched.
pub fn redraw_fresh<R: Rng + ?Sized>(
    grid: &mut GridState,
    fresh: &[Pos],
    rng: &mut R,
) -> Result<bool, BoardError> {
    if can_ever_match(grid) {
        return Ok(true);
    }
    let Some(&first) = fresh.first() else {
        return Ok(false);
    };
    if grid.len() < 2 {
        return Ok(false);
    }

    for draw in 1..=MAX_REDRAWS {
        for &pos in fresh {
            grid.take(pos)?;
            grid.spawn_random(pos, rng)?;
        }
        if can_ever_match(grid) {
            debug!("{} fresh tile(s) redrawn {draw} time(s)", fresh.len());
            return Ok(true);
        }
    }

    let Some(partner) = grid.neighbours(first).next() else {
        return Ok(false);
    };
    let Some(color) = grid.color_at(partner)? else {
        return Ok(false);
    };
    grid.take(first)?;
    grid.spawn(first, color)?;
    warn!("no repeated colour after {MAX_REDRAWS} redraws; paired {first} with {partner}");
    Ok(true)
}

/// Shuffle the existing tiles into cluster-biased positions. Cells left over once the pool runs
/// dry (only possible if the board had holes) get fresh random tiles, listed in `spawned`.
///
/// Every cell of the board is reported as changed.
pub fn reshuffle<R: Rng + ?Sized>(grid: &mut GridState, rng: &mut R) -> Result<ChangeSet, BoardError> {
    let (w, h) = grid.dims();
    let mut changes = ChangeSet::new();
    if grid.is_empty() {
        return Ok(changes);
    }

    let positions: Vec<Pos> = grid.positions().collect();
    let mut pool: Vec<(Tile, Pos)> = Vec::with_capacity(positions.len());
    for &pos in &positions {
        if let Some(tile) = grid.take(pos)?.tile() {
            pool.push((tile, pos));
        }
    }

    let centres: Vec<Pos> = (0..cluster_count(w, h))
        .map(|_| Pos::new(rng.gen_range(0..w), rng.gen_range(0..h)))
        .collect();

    for &centre in &centres {
        if pool.is_empty() {
            break;
        }
        // A repeated centre is already seeded; popping again would drop a tile.
        if !grid.get(centre)?.is_empty() {
            continue;
        }
        let entry = pool.remove(rng.gen_range(0..pool.len()));
        place(grid, &mut changes, entry, centre)?;
    }

    for &centre in &centres {
        let Some(color) = grid.color_at(centre)? else {
            continue;
        };
        let neighbours: Vec<Pos> = grid.neighbours(centre).collect();
        for n in neighbours {
            if pool.is_empty() {
                break;
            }
            if !grid.get(n)?.is_empty() {
                continue;
            }
            if let Some(i) = pool.iter().position(|(t, _)| t.color == color) {
                let entry = pool.remove(i);
                place(grid, &mut changes, entry, n)?;
            }
        }
    }

    let mut fallback = 0usize;
    for &pos in &positions {
        if !grid.get(pos)?.is_empty() {
            continue;
        }
        if pool.is_empty() {
            grid.spawn_random(pos, rng)?;
            changes.record_spawn(pos);
            fallback += 1;
        } else {
            let entry = pool.remove(rng.gen_range(0..pool.len()));
            place(grid, &mut changes, entry, pos)?;
        }
    }
    if fallback > 0 {
        warn!("reshuffle ran out of tiles; generated {fallback} new one(s)");
    }

    for &pos in &positions {
        changes.touch(pos);
    }
    debug!(
        "reshuffle: {} clusters, {} tiles relocated",
        centres.len(),
        changes.moves.len()
    );
    Ok(changes)
}

fn place(
    grid: &mut GridState,
    changes: &mut ChangeSet,
    (tile, from): (Tile, Pos),
    to: Pos,
) -> Result<(), BoardError> {
    grid.set(to, Cell::Tile(tile))?;
    if from != to {
        changes.record_move(tile.id, from, to);
    }
    Ok(())
}

/// Leave a playable board alone (`Ok(None)`); otherwise reshuffle until a move exists, up to
/// `max_attempts` times, and return everything that changed.
///
/// Fails with `RecoveryExhausted` when the attempts run out, or straight away (`attempts: 0`)
/// when [`can_ever_match`] says no arrangement can help. On failure the board is still full and
/// consistent, just without a move, and the error carries the cells the reshuffles rewrote.
pub fn check_and_recover<R: Rng + ?Sized>(
    grid: &mut GridState,
    rng: &mut R,
    max_attempts: u32,
) -> Result<Option<ChangeSet>, BoardError> {
    if board_has_any_move(grid) {
        return Ok(None);
    }
    let (w, h) = grid.dims();
    warn!("deadlock on {w}x{h} board, reshuffling");
    if !can_ever_match(grid) {
        warn!("no arrangement of the current tiles has a legal move");
        return Err(BoardError::RecoveryExhausted {
            attempts: 0,
            changes: ChangeSet::new(),
        });
    }

    let mut changes = ChangeSet::new();
    for attempt in 1..=max_attempts {
        changes.merge(reshuffle(grid, rng)?);
        if board_has_any_move(grid) {
            info!("board playable again after {attempt} reshuffle(s)");
            return Ok(Some(changes));
        }
        debug!("reshuffle attempt {attempt} left the board deadlocked");
    }

    warn!("giving up after {max_attempts} reshuffle(s)");
    Err(BoardError::RecoveryExhausted {
        attempts: max_attempts,
        changes,
    })
}
