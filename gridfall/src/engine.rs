//! [`LocalGame`] adapter letting the match coordinator drive the engine
use std::time::Duration;

use gridfall_rooms::{GameInput, LocalGame, PlayerStats};

use crate::game::Game;

impl LocalGame for Game {
    fn start(&mut self) {
        Game::start(self);
    }

    fn apply(&mut self, input: GameInput) {
        match input {
            GameInput::Left => self.move_left(),
            GameInput::Right => self.move_right(),
            GameInput::SoftDrop => self.move_down(true),
            GameInput::Rotate => self.rotate(),
            GameInput::HardDrop => self.hard_drop(),
            GameInput::TogglePause => self.toggle_pause(),
        }
    }

    fn gravity_tick(&mut self) {
        Game::gravity_tick(self);
    }

    fn drop_interval(&self) -> Duration {
        Game::drop_interval(self)
    }

    fn is_active(&self) -> bool {
        Game::is_active(self)
    }

    fn is_running(&self) -> bool {
        self.is_active() && !self.is_paused()
    }

    fn is_over(&self) -> bool {
        Game::is_over(self)
    }

    fn stats(&self) -> PlayerStats {
        PlayerStats {
            score: self.score(),
            level: self.level(),
            lines: self.lines(),
        }
    }

    fn stop(&mut self) {
        self.halt();
    }
}
