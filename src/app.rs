//! App: terminal init, main loop, key and mouse handling.

use crate::PlayOptions;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, FadeIn, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use log::{error, info, warn};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tileblast::{BlastOutcome, BoardConfig, BoardError, Game, GroupMap, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    QuitMenu,
    /// Recovery gave up; only a new board or quitting is possible.
    Stuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    NewBoard,
    Exit,
}

impl QuitOption {
    fn next(self) -> Self {
        match self {
            Self::Resume => Self::NewBoard,
            Self::NewBoard => Self::Exit,
            Self::Exit => Self::Resume,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Resume => Self::Exit,
            Self::NewBoard => Self::Resume,
            Self::Exit => Self::NewBoard,
        }
    }
}

pub struct App {
    /// Board settings as requested; width and height may be clamped to the terminal.
    board: BoardConfig,
    options: PlayOptions,
    theme: Theme,
    game: Game,
    /// Group labels for the current grid; refreshed after every change.
    groups: GroupMap,
    screen: Screen,
    paused: bool,
    cursor: Pos,
    quit_selected: QuitOption,
    fade: FadeIn,
    /// Cells to fade in once the reshuffle banner comes down.
    pending_fade: Vec<Pos>,
    shuffle_until: Option<Instant>,
    stuck_reason: Option<String>,
    /// Offset added to `--seed` so each new board differs but stays reproducible.
    boards_started: u64,
    /// Tile area from the last frame, for mouse hit-testing.
    board_area: Rect,
}

impl App {
    pub fn new(board: BoardConfig, options: PlayOptions, theme: Theme) -> Result<Self> {
        let mut game = Game::from_config(board.clone())?;
        let groups = game.group_map();
        let cursor = Pos::new(board.width / 2, board.height / 2);
        let mut app = Self {
            board,
            options,
            theme,
            game,
            groups,
            screen: Screen::Playing,
            paused: false,
            cursor,
            quit_selected: QuitOption::Resume,
            fade: FadeIn::default(),
            pending_fade: Vec::new(),
            shuffle_until: None,
            stuck_reason: None,
            boards_started: 0,
            board_area: Rect::default(),
        };
        app.fade_whole_board();
        Ok(app)
    }

    fn seeded_config(&self) -> BoardConfig {
        let mut config = self.board.clone();
        config.seed = self.board.seed.map(|s| s.wrapping_add(self.boards_started));
        config
    }

    /// Build a board from the current settings, or switch to the stuck screen if that fails.
    fn start_board(&mut self) {
        match Game::from_config(self.seeded_config()) {
            Ok(game) => {
                self.game = game;
                self.screen = Screen::Playing;
                self.paused = false;
                self.stuck_reason = None;
                self.shuffle_until = None;
                self.pending_fade.clear();
                self.cursor = Pos::new(
                    self.cursor.x.min(self.board.width - 1),
                    self.cursor.y.min(self.board.height - 1),
                );
                self.refresh_groups();
                self.fade_whole_board();
            }
            Err(e) => {
                warn!("new board failed: {e}");
                self.screen = Screen::Stuck;
                self.stuck_reason = Some(e.to_string());
            }
        }
    }

    fn new_board(&mut self) {
        self.boards_started += 1;
        self.start_board();
    }

    fn refresh_groups(&mut self) {
        self.groups = self.game.group_map();
    }

    fn fade_whole_board(&mut self) {
        if !self.options.no_animation {
            self.fade.start(self.game.grid().positions());
        }
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) {
        let (w, h) = self.game.grid().dims();
        if let Some(p) = self.cursor.offset(dx, dy).filter(|p| p.x < w && p.y < h) {
            self.cursor = p;
        }
    }

    fn blast(&mut self, now: Instant) {
        if self.shuffle_until.is_some() {
            return;
        }
        match self.game.blast(self.cursor) {
            Ok(BlastOutcome::Ignored { .. }) => {}
            Ok(BlastOutcome::Blasted { resolution, .. }) => {
                self.refresh_groups();
                if resolution.reshuffled {
                    self.shuffle_until =
                        Some(now + Duration::from_millis(self.options.shuffle_delay_ms));
                    self.pending_fade = resolution.changes.cells().collect();
                } else if !self.options.no_animation {
                    self.fade.start(resolution.changes.cells());
                }
            }
            Err(BoardError::RecoveryExhausted { attempts, changes }) => {
                warn!("board stuck after {attempts} reshuffle attempts");
                self.refresh_groups();
                if self.options.no_animation {
                    self.fade.clear();
                } else {
                    self.fade.start(changes.cells());
                }
                self.screen = Screen::Stuck;
                self.stuck_reason = Some(format!("no move after {attempts} reshuffles"));
            }
            Err(e) => error!("blast at {} failed: {e}", self.cursor),
        }
    }

    fn tick(&mut self, now: Instant) {
        if self.shuffle_until.is_some_and(|t| now >= t) {
            self.shuffle_until = None;
            let cells = std::mem::take(&mut self.pending_fade);
            if !self.options.no_animation {
                self.fade.start(cells);
            }
        }
    }

    fn handle_action(&mut self, action: Action, now: Instant) -> bool {
        match self.screen {
            Screen::Playing if self.paused => match action {
                Action::Pause => self.paused = false,
                Action::Quit => self.open_quit_menu(),
                _ => {}
            },
            Screen::Playing => match action {
                Action::Left => self.move_cursor(-1, 0),
                Action::Right => self.move_cursor(1, 0),
                Action::Up => self.move_cursor(0, 1),
                Action::Down => self.move_cursor(0, -1),
                Action::Blast => self.blast(now),
                Action::NewBoard => self.new_board(),
                Action::Pause => self.paused = true,
                Action::Quit => self.open_quit_menu(),
                Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::Down | Action::Right => self.quit_selected = self.quit_selected.next(),
                Action::Up | Action::Left => self.quit_selected = self.quit_selected.prev(),
                Action::Blast => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::NewBoard => self.new_board(),
                    QuitOption::Exit => return false,
                },
                Action::Pause | Action::Quit => self.screen = Screen::Playing,
                _ => {}
            },
            Screen::Stuck => match action {
                Action::NewBoard | Action::Blast => self.new_board(),
                Action::Quit => return false,
                _ => {}
            },
        }
        true
    }

    fn open_quit_menu(&mut self) {
        self.screen = Screen::QuitMenu;
        self.quit_selected = QuitOption::Resume;
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        if self.screen != Screen::Playing || self.paused {
            return;
        }
        let Some(pos) = ui::cell_at(self.board_area, self.game.grid(), mouse.column, mouse.row)
        else {
            return;
        };
        match mouse.kind {
            MouseEventKind::Moved => self.cursor = pos,
            MouseEventKind::Down(MouseButton::Left) => {
                self.cursor = pos;
                self.blast(now);
            }
            _ => {}
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                size,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        // Shrink the board to fit the terminal; --width/--height win when they fit.
        let (cols, rows) = size()?;
        let (fit_w, fit_h) = ui::board_size_for_terminal(cols, rows);
        if self.board.width > fit_w || self.board.height > fit_h {
            info!(
                "board {}x{} clamped to {}x{} for a {cols}x{rows} terminal",
                self.board.width,
                self.board.height,
                self.board.width.min(fit_w),
                self.board.height.min(fit_h)
            );
            self.board.width = self.board.width.min(fit_w);
            self.board.height = self.board.height.min(fit_h);
            self.start_board();
        }

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_millis(16);
        loop {
            let now = Instant::now();
            self.tick(now);

            let view = View {
                screen: self.screen,
                grid: self.game.grid(),
                groups: &self.groups,
                tiers: self.game.config().tiers,
                stats: self.game.stats(),
                cursor: self.cursor,
                paused: self.paused,
                shuffling: self.shuffle_until.is_some(),
                quit_selected: self.quit_selected,
                stuck_reason: self.stuck_reason.as_deref(),
                theme: &self.theme,
            };
            let fade = &mut self.fade;
            let completed = terminal.draw(|f| ui::draw(f, &view, fade, now))?;
            self.board_area = ui::board_inner_rect(completed.area, self.game.grid());
            self.fade.finish_if_done();

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                let now = Instant::now();
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if !self.handle_action(key_to_action(key), now) {
                            return Ok(());
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse, now),
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        let config = BoardConfig::new(5, 4, 3).with_seed(11);
        let options = PlayOptions {
            no_animation: true,
            shuffle_delay_ms: 0,
        };
        App::new(config, options, Theme::default()).unwrap()
    }

    #[test]
    fn test_cursor_stays_on_the_board() {
        let mut app = app();
        let now = Instant::now();
        for _ in 0..10 {
            app.handle_action(Action::Left, now);
            app.handle_action(Action::Up, now);
        }
        assert_eq!(app.cursor, Pos::new(0, 3));
    }

    #[test]
    fn test_quit_menu_cycles_and_exits() {
        let mut app = app();
        let now = Instant::now();
        assert!(app.handle_action(Action::Quit, now));
        assert_eq!(app.screen, Screen::QuitMenu);
        app.handle_action(Action::Up, now);
        assert_eq!(app.quit_selected, QuitOption::Exit);
        assert!(!app.handle_action(Action::Blast, now));
    }

    #[test]
    fn test_new_board_advances_the_seed() {
        let mut app = app();
        let first = app.game.grid().to_rows();
        app.handle_action(Action::NewBoard, Instant::now());
        assert_eq!(app.boards_started, 1);
        assert_eq!(app.seeded_config().seed, Some(12));
        assert!(app.game.board_has_any_move());
        assert_ne!(app.game.grid().to_rows(), first);
    }

    #[test]
    fn test_paused_board_ignores_blasts() {
        let mut app = app();
        let now = Instant::now();
        app.handle_action(Action::Pause, now);
        let before = app.game.grid().clone();
        app.handle_action(Action::Blast, now);
        assert_eq!(app.game.grid(), &before);
        app.handle_action(Action::Pause, now);
        assert!(!app.paused);
    }

    #[test]
    fn test_blasting_a_group_updates_counters() {
        let mut app = app();
        let target = app
            .game
            .grid()
            .positions()
            .find(|&p| app.groups.group_size(p) >= 2)
            .unwrap();
        app.cursor = target;
        app.handle_action(Action::Blast, Instant::now());
        assert_eq!(app.game.stats().blasts, 1);
        assert!(app.game.board_has_any_move());
    }
}
