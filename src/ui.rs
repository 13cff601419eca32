//! Layout and drawing: board, sidebar, pause, quit menu, reshuffle banner, stuck screen.

use crate::app::{QuitOption, Screen};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};
use tileblast::{GridState, GroupMap, GroupTier, GroupTiers, Pos, Stats};

/// Each tile is two terminal columns wide so it reads as roughly square.
const CELL_W: u16 = 2;
const SIDEBAR_WIDTH: u16 = 24;
/// Rows the sidebar needs: four bordered sections and the gaps between them.
const SIDEBAR_HEIGHT: u16 = 24;
const FADE_IN_MS: u32 = 220;

/// Everything one frame needs to know about the session.
pub struct View<'a> {
    pub screen: Screen,
    pub grid: &'a GridState,
    pub groups: &'a GroupMap,
    pub tiers: GroupTiers,
    pub stats: Stats,
    pub cursor: Pos,
    pub paused: bool,
    /// Reshuffle banner is up; blasts are held back.
    pub shuffling: bool,
    pub quit_selected: QuitOption,
    pub stuck_reason: Option<&'a str>,
    pub theme: &'a Theme,
}

/// Fade-in of the cells a blast or reshuffle changed.
#[derive(Default)]
pub struct FadeIn {
    cells: Vec<Pos>,
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl FadeIn {
    /// Restart the effect over a new set of changed cells.
    pub fn start(&mut self, cells: impl IntoIterator<Item = Pos>) {
        self.cells = cells.into_iter().collect();
        self.effect = None;
        self.last_process = None;
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.effect = None;
        self.last_process = None;
    }

    pub fn is_active(&self) -> bool {
        !self.cells.is_empty()
    }

    /// Drop the effect once it has run its course.
    pub fn finish_if_done(&mut self) {
        if self.effect.as_ref().is_some_and(Effect::done) {
            self.clear();
        }
    }
}

/// Largest board (in tiles) that fits next to the sidebar in a terminal of this size.
pub fn board_size_for_terminal(term_cols: u16, term_rows: u16) -> (usize, usize) {
    let cols = term_cols.saturating_sub(SIDEBAR_WIDTH + 2) / CELL_W;
    let rows = term_rows.saturating_sub(2);
    (cols.max(1) as usize, rows.max(1) as usize)
}

/// Board (with border) and sidebar rects, centred in `area`.
fn game_layout(area: Rect, grid: &GridState) -> (Rect, Rect) {
    let board_w = grid.width() as u16 * CELL_W + 2;
    let board_h = grid.height() as u16 + 2;
    let total_w = board_w + SIDEBAR_WIDTH;
    let total_h = board_h.max(SIDEBAR_HEIGHT);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(board_w), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board = Rect {
        height: board_h.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1])
}

/// Screen rect holding the tiles (inside the border).
pub fn board_inner_rect(area: Rect, grid: &GridState) -> Rect {
    let (board, _) = game_layout(area, grid);
    Block::default().borders(Borders::ALL).inner(board)
}

/// Board position under a terminal cell, if any. Row `height - 1` is drawn at the top.
pub fn cell_at(inner: Rect, grid: &GridState, column: u16, row: u16) -> Option<Pos> {
    if !inner.contains(Position::new(column, row)) {
        return None;
    }
    let x = ((column - inner.x) / CELL_W) as usize;
    let from_top = (row - inner.y) as usize;
    if x >= grid.width() || from_top >= grid.height() {
        return None;
    }
    Some(Pos::new(x, grid.height() - 1 - from_top))
}

/// Top-left terminal cell of a tile, or None if it is clipped away.
fn screen_of(inner: Rect, grid: &GridState, pos: Pos) -> Option<(u16, u16)> {
    let sx = inner.x + pos.x as u16 * CELL_W;
    let sy = inner.y + (grid.height() - 1 - pos.y) as u16;
    (sx + CELL_W <= inner.right() && sy < inner.bottom()).then_some((sx, sy))
}

/// Scale an RGB colour; named colours map to rough RGB first.
fn apply_shading(color: Color, factor: f32) -> Color {
    let (r, g, b) = match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Red => (255, 0, 0),
        Color::Green => (0, 255, 0),
        Color::Yellow => (255, 255, 0),
        Color::Blue => (0, 0, 255),
        Color::Magenta => (255, 0, 255),
        Color::Cyan => (0, 255, 255),
        Color::White => (255, 255, 255),
        _ => (128, 128, 128),
    };
    let scale = |c: u8| (c as f32 * factor).min(255.0) as u8;
    Color::Rgb(scale(r), scale(g), scale(b))
}

fn tier_label(tier: GroupTier) -> &'static str {
    match tier {
        GroupTier::Default => "-",
        GroupTier::A => "A",
        GroupTier::B => "B",
        GroupTier::C => "C",
    }
}

/// Draw current screen, overlays, and the fade-in of recently changed tiles.
pub fn draw(frame: &mut Frame, view: &View<'_>, fade: &mut FadeIn, now: Instant) {
    let area = frame.area();
    let (board, sidebar) = game_layout(area, view.grid);
    draw_board(frame, view, board);
    draw_sidebar(frame, view, sidebar);

    if fade.is_active() {
        let inner = Block::default().borders(Borders::ALL).inner(board);
        apply_fade_in(frame, view, inner, fade, now);
    }

    match view.screen {
        Screen::Playing => {
            if view.paused {
                draw_pause_overlay(frame, view.theme, area);
            } else if view.shuffling {
                draw_shuffle_banner(frame, view.theme, board);
            }
        }
        Screen::QuitMenu => draw_quit_menu(frame, view.theme, view.quit_selected),
        Screen::Stuck => draw_stuck(frame, view.theme, view.stuck_reason, area),
    }
}

fn draw_board(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let title = format!(
        " Tileblast  {}x{} ",
        view.grid.width(),
        view.grid.height()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let hovered = view.groups.label(view.cursor);
    let hovered_removable = view.groups.group_size(view.cursor) >= 2;
    let show_cursor = view.screen == Screen::Playing && !view.paused;

    let buf = frame.buffer_mut();
    for pos in view.grid.positions() {
        let Some((sx, sy)) = screen_of(inner, view.grid, pos) else {
            continue;
        };
        let color = view.grid.color_at(pos).ok().flatten();
        let (glyph, mut style) = match color {
            None => ("  ", Style::default().bg(theme.bg)),
            Some(c) => {
                let base = theme.tile_color(c);
                let tier = view.tiers.tier_for(view.groups.group_size(pos));
                let lit = hovered_removable && hovered.is_some() && view.groups.label(pos) == hovered;
                let bg = if lit { apply_shading(base, 1.25) } else { base };
                (
                    Theme::tier_glyph(tier),
                    Style::default().fg(apply_shading(base, 0.6)).bg(bg),
                )
            }
        };
        let glyph = if show_cursor && pos == view.cursor {
            style = style.fg(theme.main_fg).add_modifier(Modifier::BOLD);
            "[]"
        } else {
            glyph
        };
        buf.set_string(sx, sy, glyph, style);
    }
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_sidebar(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Colours (border + title + strip)
            Constraint::Length(1),
            Constraint::Length(4), // Group under cursor
            Constraint::Length(1),
            Constraint::Length(7), // Board counters
            Constraint::Length(1),
            Constraint::Length(6), // Controls
        ])
        .split(area);

    // --- Colours ---
    let block = sidebar_block(theme);
    let inner = block.inner(chunks[0]);
    block.render(chunks[0], frame.buffer_mut());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);
    Paragraph::new(Line::from(Span::styled("Colours", title_style)))
        .render(rows[0], frame.buffer_mut());
    draw_colour_strip(frame, theme, view.grid.color_count(), rows[1]);

    // --- Group under the cursor ---
    let size = view.groups.group_size(view.cursor);
    let block = sidebar_block(theme);
    let inner = block.inner(chunks[2]);
    block.render(chunks[2], frame.buffer_mut());
    let size_line = if size >= 2 {
        Line::from(vec![
            Span::styled("Group: ", title_style),
            Span::styled(size.to_string(), fg_style),
        ])
    } else {
        Line::from(vec![
            Span::styled("Group: ", title_style),
            Span::styled("lone tile", dim_style),
        ])
    };
    let tier_line = Line::from(vec![
        Span::styled("Tier: ", title_style),
        Span::styled(tier_label(view.tiers.tier_for(size)), fg_style),
    ]);
    Paragraph::new(Text::from(vec![size_line, tier_line])).render(inner, frame.buffer_mut());

    // --- Board counters ---
    let block = sidebar_block(theme);
    let inner = block.inner(chunks[4]);
    block.render(chunks[4], frame.buffer_mut());
    let counter = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };
    let lines = vec![
        counter("Blasts: ", view.stats.blasts.to_string()),
        counter("Cleared: ", view.stats.tiles_cleared.to_string()),
        counter("Reshuffles: ", view.stats.reshuffles.to_string()),
        counter("Groups: ", view.groups.removable_count().to_string()),
        counter("Largest: ", view.groups.largest().to_string()),
    ];
    Paragraph::new(Text::from(lines)).render(inner, frame.buffer_mut());

    // --- Controls ---
    let block = sidebar_block(theme);
    let inner = block.inner(chunks[6]);
    block.render(chunks[6], frame.buffer_mut());
    let lines = vec![
        Line::from(Span::styled("Move   arrows / hjkl", dim_style)),
        Line::from(Span::styled("Blast  space / click", dim_style)),
        Line::from(Span::styled("New    R   Pause  P", dim_style)),
        Line::from(Span::styled("Quit   Q / Esc", dim_style)),
    ];
    Paragraph::new(Text::from(lines)).render(inner, frame.buffer_mut());
}

/// One swatch per colour in play.
fn draw_colour_strip(frame: &mut Frame, theme: &Theme, color_count: u8, area: Rect) {
    let count = u16::from(color_count.max(1));
    let block_w = (area.width / count).max(1);
    for i in 0..color_count {
        let x = area.x + u16::from(i) * block_w;
        if x >= area.right() {
            break;
        }
        let r = Rect {
            x,
            y: area.y,
            width: block_w.min(area.right() - x),
            height: area.height.min(1),
        };
        let c = theme.tile_color(i);
        Paragraph::new("█")
            .style(Style::default().fg(c).bg(c))
            .render(r, frame.buffer_mut());
    }
}

/// Fade changed tiles in from the background (TachyonFX).
fn apply_fade_in(frame: &mut Frame, view: &View<'_>, inner: Rect, fade: &mut FadeIn, now: Instant) {
    let delta = fade
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    fade.last_process = Some(now);

    if fade.effect.is_none() {
        let mut changed = HashSet::new();
        for &pos in &fade.cells {
            if let Some((sx, sy)) = screen_of(inner, view.grid, pos) {
                for dx in 0..CELL_W {
                    changed.insert((sx + dx, sy));
                }
            }
        }
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            changed.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let effect = fx::fade_from(bg, bg, (FADE_IN_MS, Interpolation::QuadOut))
            .with_filter(filter)
            .with_area(inner);
        fade.effect = Some(effect);
    }

    if let Some(effect) = fade.effect.as_mut() {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
    }
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn clear_rect(frame: &mut Frame, theme: &Theme, rect: Rect) {
    let rect = rect.intersection(frame.area());
    let buf = frame.buffer_mut();
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            buf[(x, y)].reset();
            buf[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    clear_rect(frame, theme, popup);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

/// "No moves" banner across the board while a reshuffle settles.
fn draw_shuffle_banner(frame: &mut Frame, theme: &Theme, board: Rect) {
    let banner = centered(board, board.width.min(20), 3);
    clear_rect(frame, theme, banner);
    Paragraph::new(Line::from(Span::styled(
        "No moves! Shuffling",
        Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.title).bg(theme.bg)),
    )
    .render(banner, frame.buffer_mut());
}

fn draw_stuck(frame: &mut Frame, theme: &Theme, reason: Option<&str>, area: Rect) {
    let popup = centered(area, 40, 7);
    clear_rect(frame, theme, popup);
    let lines = vec![
        Line::from(Span::styled(
            " Board is stuck ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            reason.unwrap_or("no move could be made"),
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R: New board    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let quit_rect = centered(frame.area(), 24, 8);
    clear_rect(frame, theme, quit_rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::NewBoard, " New Board "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.bottom() {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
