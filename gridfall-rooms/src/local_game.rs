//! Seam between the match coordinator and a concrete game engine
//!
//! The coordinator drives any engine implementing [`LocalGame`]; the engine
//! crate supplies the real falling-block implementation, tests plug in
//! scripted stand-ins.

use std::time::Duration;

/// Player input forwarded into the local engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameInput {
    Left,
    Right,
    SoftDrop,
    Rotate,
    HardDrop,
    TogglePause,
}

/// Snapshot of the scoring state the protocol synchronizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerStats {
    pub score: u64,
    pub level: u32,
    pub lines: u32,
}

/// Local game engine driven by the match coordinator
///
/// The coordinator owns the clock: it calls `gravity_tick` on the cadence
/// reported by `drop_interval` and forwards player input via `apply`. The
/// engine only mutates itself in response.
pub trait LocalGame: Send {
    /// Reset and begin a fresh game
    fn start(&mut self);

    /// Feed one player input into the engine
    fn apply(&mut self, input: GameInput);

    /// Advance the piece one row on the gravity clock
    fn gravity_tick(&mut self);

    /// Current delay between gravity ticks (shrinks as the level rises)
    fn drop_interval(&self) -> Duration;

    /// Game has started and not yet ended (paused still counts as active)
    fn is_active(&self) -> bool;

    /// Gravity should be ticking right now (active and not paused)
    fn is_running(&self) -> bool;

    /// Topped out
    fn is_over(&self) -> bool;

    /// Current score, level and cleared line count
    fn stats(&self) -> PlayerStats;

    /// Halt the engine without recording a top-out
    fn stop(&mut self);
}
