//! Terminal falling-block game with solo and two-player duel modes
//!
//! The engine lives in [`game`], the seven-piece catalog in [`pieces`].
//! [`engine`] adapts the engine to the `gridfall-rooms` coordinator so a
//! duel runs over the room protocol; [`bot`] supplies a scripted opponent
//! and [`term_render`] the screen output.

pub mod bot;
pub mod engine;
pub mod game;
pub mod pieces;
pub mod term_render;

pub use bot::BotPilot;
pub use game::{
    Game, GameEvent, GamePhase, GameResult, NullSink, RenderSink, StateChange, BASE_DROP_MS,
    BOARD_HEIGHT, BOARD_WIDTH, DROP_STEP_MS, LINE_POINTS, MIN_DROP_MS, PREVIEW_SIZE,
};
pub use pieces::{random_piece, rotate_cw, spawn_shape, Cell, Piece, Shape, PIECE_KINDS};
pub use term_render::{draw, render_lines, shared_frame, Frame, FrameSink, SharedFrame};
