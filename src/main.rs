//! Tileblast: pop same-colour groups of tiles in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tileblast::{BoardConfig, GroupTiers};

/// Presentation-only options; none of these affect the board itself.
#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub no_animation: bool,
    /// How long the reshuffle banner stays up; blasts are ignored meanwhile.
    pub shuffle_delay_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme not loaded, using defaults: {e}");
        theme::Theme::default_for_palette(args.palette)
    });
    let board = args.board_config();
    board.validate().context("invalid board options")?;
    let options = PlayOptions {
        no_animation: args.no_animation,
        shuffle_delay_ms: args.shuffle_delay_ms,
    };
    let mut app = App::new(board, options, theme)?;
    app.run()?;
    Ok(())
}

/// The terminal belongs to the UI, so logs only go to a file when one is asked for.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Tile-blast puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tileblast",
    version,
    about = "Tile-blast puzzle in the terminal. Pop groups of two or more same-coloured tiles.",
    long_about = "Tileblast is a terminal collapse/blast puzzle.\n\n\
        Pick a tile: if it touches at least one tile of the same colour (up, down, left or right) \
        the whole group pops, the columns fall and new tiles drop in from the top. When no group \
        is left the board reshuffles itself, so there is always a move.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor    Space/Enter/x  Blast    Mouse click  Blast\n  \
        R  New board    P  Pause    Q / Esc  Quit menu\n\n\
        Tiles show their group size: plain, then ░ ▒ ▓ as the group reaches each --tier-* threshold."
)]
pub struct Args {
    /// Board width in tiles.
    #[arg(long, default_value = "10", value_name = "COLS", value_parser = clap::value_parser!(u16).range(1..=64))]
    pub width: u16,

    /// Board height in tiles.
    #[arg(long, default_value = "10", value_name = "ROWS", value_parser = clap::value_parser!(u16).range(1..=64))]
    pub height: u16,

    /// Number of tile colours.
    #[arg(short, long, default_value = "6", value_name = "N", value_parser = clap::value_parser!(u8).range(1..=6))]
    pub colors: u8,

    /// Group size at which tiles switch to the first larger-group look.
    #[arg(long, default_value = "4", value_name = "N")]
    pub tier_a: usize,

    /// Group size for the second look.
    #[arg(long, default_value = "7", value_name = "N")]
    pub tier_b: usize,

    /// Group size for the third look.
    #[arg(long, default_value = "9", value_name = "N")]
    pub tier_c: usize,

    /// RNG seed for a reproducible board.
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Reshuffle attempts before a deadlocked board is declared stuck.
    #[arg(long, default_value = "16", value_name = "N")]
    pub max_reshuffles: u32,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the fade-in of changed tiles.
    #[arg(long)]
    pub no_animation: bool,

    /// How long the "no moves" banner stays up after a reshuffle, in ms.
    #[arg(long, default_value = "500", value_name = "MS")]
    pub shuffle_delay_ms: u64,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn board_config(&self) -> BoardConfig {
        BoardConfig {
            width: self.width as usize,
            height: self.height as usize,
            color_count: self.colors,
            tiers: GroupTiers {
                a: self.tier_a,
                b: self.tier_b,
                c: self.tier_c,
            },
            max_reshuffles: self.max_reshuffles,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
