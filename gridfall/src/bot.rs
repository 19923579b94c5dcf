//! Scripted opponent for local two-player sessions
//!
//! Wraps a headless [`Game`] and plays it badly on purpose: every gravity
//! tick it may shove the piece sideways or rotate it at random, so it tops
//! out on its own after a while.

use std::time::Duration;

use gridfall_rooms::{GameInput, LocalGame, PlayerStats};

use crate::game::{Game, NullSink};

pub struct BotPilot {
    game: Game,
}

impl BotPilot {
    pub fn new() -> Self {
        BotPilot {
            game: Game::new(Box::new(NullSink)),
        }
    }

    fn random_move(&mut self) {
        match rand::random::<u32>() % 8 {
            0 | 1 => self.game.move_left(),
            2 | 3 => self.game.move_right(),
            4 => self.game.rotate(),
            5 => self.game.move_down(true),
            // the rest of the draws do nothing, keeping the bot sluggish
            _ => {}
        }
    }
}

impl Default for BotPilot {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalGame for BotPilot {
    fn start(&mut self) {
        self.game.start();
    }

    fn apply(&mut self, _input: GameInput) {
        // the bot ignores outside input, it plays by itself
    }

    fn gravity_tick(&mut self) {
        self.random_move();
        self.game.gravity_tick();
    }

    fn drop_interval(&self) -> Duration {
        self.game.drop_interval()
    }

    fn is_active(&self) -> bool {
        self.game.is_active()
    }

    fn is_running(&self) -> bool {
        self.game.is_active() && !self.game.is_paused()
    }

    fn is_over(&self) -> bool {
        self.game.is_over()
    }

    fn stats(&self) -> PlayerStats {
        PlayerStats {
            score: self.game.score(),
            level: self.game.level(),
            lines: self.game.lines(),
        }
    }

    fn stop(&mut self) {
        self.game.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_eventually_tops_out() {
        let mut bot = BotPilot::new();
        bot.start();
        for _ in 0..100_000 {
            if bot.is_over() {
                break;
            }
            bot.gravity_tick();
        }
        assert!(bot.is_over());
    }
}
