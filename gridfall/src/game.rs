//! Falling-block game engine
//!
//! The engine is a passive state machine: the surrounding task drives it by
//! forwarding player input and calling [`Game::gravity_tick`] on the cadence
//! reported by [`Game::drop_interval`]. Rendering goes through a
//! [`RenderSink`] so the engine never touches the terminal itself.

use crate::pieces::{self, Cell, Piece, Shape};
use gridfall_rooms::now_millis;
use std::time::Duration;

/// Playfield width in cells
pub const BOARD_WIDTH: usize = 10;
/// Playfield height in cells
pub const BOARD_HEIGHT: usize = 20;
/// Side of the square preview box
pub const PREVIEW_SIZE: usize = 4;

/// Points for clearing 0..=4 lines with one lock, multiplied by the level
pub const LINE_POINTS: [u64; 5] = [0, 40, 100, 300, 1200];
/// Gravity delay at level 1
pub const BASE_DROP_MS: u64 = 1000;
/// Gravity speedup per level
pub const DROP_STEP_MS: u64 = 80;
/// Gravity delay floor
pub const MIN_DROP_MS: u64 = 100;

/// Lifecycle phase of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Idle,
    Playing,
    Paused,
    GameOver,
}

/// Lifecycle notifications for the surrounding task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Started,
    Paused,
    Resumed,
    GameOver,
}

/// State-change notification with the phase snapshot at emission time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub event: GameEvent,
    pub phase: GamePhase,
    pub active: bool,
    pub paused: bool,
}

/// Final state of a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameResult {
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    pub timestamp: u64,
}

/// Output surface the engine draws into
pub trait RenderSink: Send {
    /// Set one playfield cell (the current piece is already overlaid)
    fn set_cell(&mut self, x: usize, y: usize, cell: Cell);
    /// Show the upcoming piece
    fn set_preview(&mut self, piece: &Piece);
    /// Update score, level and cleared line count
    fn set_hud(&mut self, score: u64, level: u32, lines: u32);
}

/// Sink that discards all output, for headless games and tests
pub struct NullSink;

impl RenderSink for NullSink {
    fn set_cell(&mut self, _x: usize, _y: usize, _cell: Cell) {}
    fn set_preview(&mut self, _piece: &Piece) {}
    fn set_hud(&mut self, _score: u64, _level: u32, _lines: u32) {}
}

pub struct Game {
    // row-major, row 0 at the top
    board: Vec<[Cell; BOARD_WIDTH]>,
    current: Option<Piece>,
    // top-left corner of the current shape matrix, rows above the board
    // are negative and legal
    position: (isize, isize),
    next: Piece,
    score: u64,
    level: u32,
    lines: u32,
    active: bool,
    paused: bool,
    over: bool,
    sink: Box<dyn RenderSink>,
    event_tx: flume::Sender<StateChange>,
    event_rx: flume::Receiver<StateChange>,
    result: Option<GameResult>,
}

impl Game {
    pub fn new(sink: Box<dyn RenderSink>) -> Self {
        let (event_tx, event_rx) = flume::unbounded();
        Game {
            board: vec![[Cell::Empty; BOARD_WIDTH]; BOARD_HEIGHT],
            current: None,
            position: (0, 0),
            next: pieces::random_piece(),
            score: 0,
            level: 1,
            lines: 0,
            active: false,
            paused: false,
            over: false,
            sink,
            event_tx,
            event_rx,
            result: None,
        }
    }

    /// Receiver of lifecycle notifications
    pub fn events(&self) -> flume::Receiver<StateChange> {
        self.event_rx.clone()
    }

    /// Reset all state and begin a fresh game
    pub fn start(&mut self) {
        self.board = vec![[Cell::Empty; BOARD_WIDTH]; BOARD_HEIGHT];
        self.current = None;
        self.next = pieces::random_piece();
        self.score = 0;
        self.level = 1;
        self.lines = 0;
        self.active = true;
        self.paused = false;
        self.over = false;
        self.result = None;
        self.spawn_next();
        self.emit(GameEvent::Started);
        self.redraw();
    }

    /// Begin a fresh game after a top-out, same as `start`
    pub fn restart(&mut self) {
        self.start();
    }

    pub fn phase(&self) -> GamePhase {
        if self.over {
            GamePhase::GameOver
        } else if !self.active {
            GamePhase::Idle
        } else if self.paused {
            GamePhase::Paused
        } else {
            GamePhase::Playing
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Final state, present once the game has ended
    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    /// Current gravity delay, shrinking with the level down to the floor
    pub fn drop_interval(&self) -> Duration {
        let ms = BASE_DROP_MS
            .saturating_sub((self.level as u64 - 1) * DROP_STEP_MS)
            .max(MIN_DROP_MS);
        Duration::from_millis(ms)
    }

    /// Advance the current piece one row on the gravity clock
    pub fn gravity_tick(&mut self) {
        if !self.running() {
            return;
        }
        self.move_down(false);
    }

    pub fn move_left(&mut self) {
        if !self.running() {
            return;
        }
        let (x, y) = self.position;
        if let Some(piece) = &self.current {
            if !self.collides(&piece.shape, x - 1, y) {
                self.position.0 -= 1;
                self.redraw();
            }
        }
    }

    pub fn move_right(&mut self) {
        if !self.running() {
            return;
        }
        let (x, y) = self.position;
        if let Some(piece) = &self.current {
            if !self.collides(&piece.shape, x + 1, y) {
                self.position.0 += 1;
                self.redraw();
            }
        }
    }

    /// Move the piece one row down; locks it when the move is blocked
    ///
    /// A user-initiated move (soft drop) scores one point per row.
    pub fn move_down(&mut self, user_initiated: bool) {
        if !self.running() {
            return;
        }
        let (x, y) = self.position;
        let blocked = match &self.current {
            Some(piece) => self.collides(&piece.shape, x, y + 1),
            None => return,
        };
        if blocked {
            self.lock_piece();
        } else {
            self.position.1 += 1;
            if user_initiated {
                self.score += 1;
            }
            self.redraw();
        }
    }

    /// Rotate the current piece clockwise if the rotated shape fits
    pub fn rotate(&mut self) {
        if !self.running() {
            return;
        }
        let Some(rotated) = self.current.as_ref().map(|p| pieces::rotate_cw(&p.shape)) else {
            return;
        };
        let (x, y) = self.position;
        if !self.collides(&rotated, x, y) {
            if let Some(piece) = &mut self.current {
                piece.shape = rotated;
            }
            self.redraw();
        }
    }

    /// Drop the piece straight to the floor and lock it
    ///
    /// Scores two points per row descended.
    pub fn hard_drop(&mut self) {
        if !self.running() || self.current.is_none() {
            return;
        }
        let mut distance: u64 = 0;
        loop {
            let (x, y) = self.position;
            let blocked = match &self.current {
                Some(piece) => self.collides(&piece.shape, x, y + 1),
                None => return,
            };
            if blocked {
                break;
            }
            self.position.1 += 1;
            distance += 1;
        }
        self.score += 2 * distance;
        self.lock_piece();
    }

    pub fn toggle_pause(&mut self) {
        if !self.active {
            return;
        }
        self.paused = !self.paused;
        if self.paused {
            self.emit(GameEvent::Paused);
        } else {
            self.emit(GameEvent::Resumed);
        }
    }

    /// Halt the engine without recording a top-out
    pub fn halt(&mut self) {
        self.active = false;
        self.paused = false;
    }

    fn running(&self) -> bool {
        self.active && !self.paused && !self.over
    }

    /// Test the shape at the given matrix position against walls, the floor
    /// and settled cells; rows above the board are legal
    fn collides(&self, shape: &Shape, x: isize, y: isize) -> bool {
        for (row, cells) in shape.iter().enumerate() {
            for (col, &occupied) in cells.iter().enumerate() {
                if !occupied {
                    continue;
                }
                let cell_x = x + col as isize;
                let cell_y = y + row as isize;
                if cell_x < 0 || cell_x >= BOARD_WIDTH as isize {
                    return true;
                }
                if cell_y >= BOARD_HEIGHT as isize {
                    return true;
                }
                if cell_y >= 0 && !self.board[cell_y as usize][cell_x as usize].is_empty() {
                    return true;
                }
            }
        }
        false
    }

    /// Settle the current piece into the board, clear lines, spawn the next
    fn lock_piece(&mut self) {
        let Some(piece) = self.current.take() else {
            return;
        };
        let (x, y) = self.position;
        for (row, cells) in piece.shape.iter().enumerate() {
            for (col, &occupied) in cells.iter().enumerate() {
                if !occupied {
                    continue;
                }
                let cell_x = x + col as isize;
                let cell_y = y + row as isize;
                if cell_y >= 0
                    && cell_y < BOARD_HEIGHT as isize
                    && cell_x >= 0
                    && cell_x < BOARD_WIDTH as isize
                {
                    self.board[cell_y as usize][cell_x as usize] = piece.cell;
                }
            }
        }
        self.check_lines();
        self.spawn_next();
        self.redraw();
    }

    /// Remove full rows bottom-to-top, rechecking the same index after each
    /// removal since the rows above shift down into it
    fn check_lines(&mut self) {
        let mut cleared: usize = 0;
        let mut y = BOARD_HEIGHT;
        while y > 0 {
            y -= 1;
            if self.board[y].iter().all(|cell| !cell.is_empty()) {
                self.board.remove(y);
                self.board.insert(0, [Cell::Empty; BOARD_WIDTH]);
                cleared += 1;
                y += 1;
            }
        }
        if cleared > 0 {
            self.lines += cleared as u32;
            self.score += LINE_POINTS[cleared.min(4)] * self.level as u64;
            self.level = self.lines / 10 + 1;
        }
    }

    /// Bring in the next piece at the top center; a spawn that collides
    /// immediately ends the game
    fn spawn_next(&mut self) {
        let piece = std::mem::replace(&mut self.next, pieces::random_piece());
        let x = BOARD_WIDTH as isize / 2 - piece.width() as isize / 2;
        if self.collides(&piece.shape, x, 0) {
            self.next = piece;
            self.game_over();
            return;
        }
        self.position = (x, 0);
        self.current = Some(piece);
    }

    fn game_over(&mut self) {
        self.active = false;
        self.paused = false;
        self.over = true;
        self.current = None;
        self.result = Some(GameResult {
            score: self.score,
            level: self.level,
            lines: self.lines,
            timestamp: now_millis(),
        });
        tracing::info!(
            "Game over: score {}, level {}, {} lines",
            self.score,
            self.level,
            self.lines
        );
        self.emit(GameEvent::GameOver);
        self.redraw();
    }

    /// Push the whole playfield, preview and HUD into the sink
    fn redraw(&mut self) {
        for (y, row) in self.board.iter().enumerate() {
            for (x, &cell) in row.iter().enumerate() {
                self.sink.set_cell(x, y, cell);
            }
        }
        if let Some(piece) = &self.current {
            let (x, y) = self.position;
            for (row, cells) in piece.shape.iter().enumerate() {
                for (col, &occupied) in cells.iter().enumerate() {
                    if !occupied {
                        continue;
                    }
                    let cell_x = x + col as isize;
                    let cell_y = y + row as isize;
                    if cell_y >= 0
                        && cell_y < BOARD_HEIGHT as isize
                        && cell_x >= 0
                        && cell_x < BOARD_WIDTH as isize
                    {
                        self.sink.set_cell(cell_x as usize, cell_y as usize, piece.cell);
                    }
                }
            }
        }
        self.sink.set_preview(&self.next);
        self.sink.set_hud(self.score, self.level, self.lines);
    }

    fn emit(&self, event: GameEvent) {
        let _ = self.event_tx.send(StateChange {
            event,
            phase: self.phase(),
            active: self.active,
            paused: self.paused,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::spawn_shape;

    fn test_game() -> Game {
        let mut game = Game::new(Box::new(NullSink));
        game.start();
        game
    }

    fn set_piece(game: &mut Game, cell: Cell, x: isize, y: isize) {
        game.current = Some(Piece {
            cell,
            shape: spawn_shape(cell),
        });
        game.position = (x, y);
    }

    #[test]
    fn test_piece_stays_inside_walls() {
        let mut game = test_game();
        set_piece(&mut game, Cell::O, 0, 0);
        game.move_left();
        assert_eq!(game.position.0, 0);

        game.position.0 = BOARD_WIDTH as isize - 2;
        game.move_right();
        assert_eq!(game.position.0, BOARD_WIDTH as isize - 2);
    }

    #[test]
    fn test_gravity_locks_at_bottom() {
        let mut game = test_game();
        set_piece(&mut game, Cell::O, 4, BOARD_HEIGHT as isize - 2);
        game.gravity_tick();
        // piece was locked into the board and a new one spawned
        assert_eq!(game.board[BOARD_HEIGHT - 1][4], Cell::O);
        assert_eq!(game.board[BOARD_HEIGHT - 2][5], Cell::O);
        assert!(game.current.is_some());
    }

    #[test]
    fn test_single_line_clear_scoring() {
        let mut game = test_game();
        // bottom row full except the two columns the O piece will fill
        for x in 0..BOARD_WIDTH {
            if x != 4 && x != 5 {
                game.board[BOARD_HEIGHT - 1][x] = Cell::I;
            }
        }
        set_piece(&mut game, Cell::O, 4, BOARD_HEIGHT as isize - 2);
        game.gravity_tick();

        assert_eq!(game.lines, 1);
        assert_eq!(game.score, LINE_POINTS[1]);
        // only the top half of the O survives, shifted down one row
        assert_eq!(game.board[BOARD_HEIGHT - 1][4], Cell::O);
        assert_eq!(game.board[BOARD_HEIGHT - 1][0], Cell::Empty);
    }

    #[test]
    fn test_multi_line_clear_with_recheck() {
        let mut game = test_game();
        // two full bottom rows except the O piece columns
        for y in [BOARD_HEIGHT - 1, BOARD_HEIGHT - 2] {
            for x in 0..BOARD_WIDTH {
                if x != 4 && x != 5 {
                    game.board[y][x] = Cell::I;
                }
            }
        }
        set_piece(&mut game, Cell::O, 4, BOARD_HEIGHT as isize - 2);
        game.gravity_tick();

        assert_eq!(game.lines, 2);
        assert_eq!(game.score, LINE_POINTS[2]);
        // removed rows are replaced one-for-one by empty rows on top
        assert_eq!(game.board.len(), BOARD_HEIGHT);
        for x in 0..BOARD_WIDTH {
            assert_eq!(game.board[BOARD_HEIGHT - 1][x], Cell::Empty);
            assert_eq!(game.board[BOARD_HEIGHT - 2][x], Cell::Empty);
        }
    }

    #[test]
    fn test_level_rises_every_ten_lines() {
        let mut game = test_game();
        game.lines = 9;
        // one full row under the piece
        for x in 0..BOARD_WIDTH {
            if x != 4 && x != 5 {
                game.board[BOARD_HEIGHT - 1][x] = Cell::I;
            }
        }
        set_piece(&mut game, Cell::O, 4, BOARD_HEIGHT as isize - 2);
        game.gravity_tick();

        assert_eq!(game.lines, 10);
        assert_eq!(game.level, 2);
    }

    #[test]
    fn test_drop_interval_derivation() {
        let mut game = test_game();
        assert_eq!(game.drop_interval(), Duration::from_millis(BASE_DROP_MS));
        game.level = 2;
        assert_eq!(
            game.drop_interval(),
            Duration::from_millis(BASE_DROP_MS - DROP_STEP_MS)
        );
        game.level = 100;
        assert_eq!(game.drop_interval(), Duration::from_millis(MIN_DROP_MS));
    }

    #[test]
    fn test_soft_drop_scores_one_point() {
        let mut game = test_game();
        set_piece(&mut game, Cell::O, 4, 0);
        let before = game.score;
        game.move_down(true);
        assert_eq!(game.score, before + 1);
        game.gravity_tick();
        // gravity descent scores nothing
        assert_eq!(game.score, before + 1);
    }

    #[test]
    fn test_hard_drop_scores_double_distance() {
        let mut game = test_game();
        set_piece(&mut game, Cell::O, 4, 0);
        // O at y=0 on an empty board falls 18 rows to rest on the floor
        game.hard_drop();
        assert_eq!(game.score, 2 * 18);
        assert_eq!(game.board[BOARD_HEIGHT - 1][4], Cell::O);
    }

    #[test]
    fn test_rotation_blocked_by_wall_keeps_shape() {
        let mut game = test_game();
        // vertical I against the left wall has room to rotate only if the
        // horizontal bar fits; pin it so it does not
        let vertical = pieces::rotate_cw(&spawn_shape(Cell::I));
        game.current = Some(Piece {
            cell: Cell::I,
            shape: vertical.clone(),
        });
        game.position = (-2, 4);
        game.rotate();
        assert_eq!(game.current.as_ref().map(|p| p.shape.clone()), Some(vertical));
    }

    #[test]
    fn test_game_over_on_blocked_spawn() {
        let mut game = test_game();
        // wall across the spawn rows, one gap so nothing clears
        for y in 0..3 {
            for x in 0..BOARD_WIDTH - 1 {
                game.board[y][x] = Cell::I;
            }
        }
        set_piece(&mut game, Cell::O, 4, BOARD_HEIGHT as isize - 2);
        game.gravity_tick();

        assert!(game.is_over());
        assert!(!game.is_active());
        assert!(game.current.is_none());
        let result = game.result().expect("missing result");
        assert_eq!(result.score, game.score());
    }

    #[test]
    fn test_pause_freezes_the_piece() {
        let mut game = test_game();
        set_piece(&mut game, Cell::O, 4, 0);
        game.toggle_pause();
        assert_eq!(game.phase(), GamePhase::Paused);
        game.gravity_tick();
        game.move_left();
        assert_eq!(game.position, (4, 0));
        game.toggle_pause();
        assert_eq!(game.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_score_never_decreases() {
        let mut game = test_game();
        let mut last = 0;
        for i in 0..2000 {
            match i % 5 {
                0 => game.move_left(),
                1 => game.move_right(),
                2 => game.rotate(),
                3 => game.move_down(true),
                _ => game.gravity_tick(),
            }
            assert!(game.score() >= last);
            last = game.score();
            if game.is_over() {
                break;
            }
        }
    }

    #[test]
    fn test_state_change_notifications() {
        let mut game = Game::new(Box::new(NullSink));
        let events = game.events();
        game.start();
        let change = events.try_recv().unwrap();
        assert_eq!(change.event, GameEvent::Started);
        assert!(change.active);

        game.toggle_pause();
        let change = events.try_recv().unwrap();
        assert_eq!(change.event, GameEvent::Paused);
        assert!(change.paused);
        assert_eq!(change.phase, GamePhase::Paused);

        game.toggle_pause();
        let change = events.try_recv().unwrap();
        assert_eq!(change.event, GameEvent::Resumed);
        assert!(!change.paused);
    }

    #[test]
    fn test_start_resets_state() {
        let mut game = test_game();
        game.score = 500;
        game.lines = 12;
        game.level = 2;
        game.board[BOARD_HEIGHT - 1][0] = Cell::I;
        game.start();
        assert_eq!(game.score(), 0);
        assert_eq!(game.lines(), 0);
        assert_eq!(game.level(), 1);
        assert!(game.board.iter().flatten().all(|c| c.is_empty()));
        assert!(game.current.is_some());
    }
}
