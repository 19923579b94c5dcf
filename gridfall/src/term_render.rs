//! Terminal rendering for the playfield, preview and HUD
//!
//! The engine draws into a [`FrameSink`] backed by a shared [`Frame`]; the
//! main loop snapshots the frame at its own cadence and writes it to the
//! terminal with [`draw`], so engine stepping and screen output stay
//! decoupled.

use std::io;
use std::sync::{Arc, Mutex};

use console::{style, Color, Term};
use gridfall_rooms::PlayerSlot;

use crate::game::{RenderSink, BOARD_HEIGHT, BOARD_WIDTH, PREVIEW_SIZE};
use crate::pieces::{Cell, Piece};

/// Snapshot of everything the screen shows for the local player
#[derive(Clone)]
pub struct Frame {
    pub cells: Vec<[Cell; BOARD_WIDTH]>,
    pub preview: Option<Piece>,
    pub score: u64,
    pub level: u32,
    pub lines: u32,
}

impl Default for Frame {
    fn default() -> Self {
        Frame {
            cells: vec![[Cell::Empty; BOARD_WIDTH]; BOARD_HEIGHT],
            preview: None,
            score: 0,
            level: 1,
            lines: 0,
        }
    }
}

pub type SharedFrame = Arc<Mutex<Frame>>;

pub fn shared_frame() -> SharedFrame {
    Arc::new(Mutex::new(Frame::default()))
}

/// Render sink writing into a shared frame
pub struct FrameSink {
    frame: SharedFrame,
}

impl FrameSink {
    pub fn new(frame: SharedFrame) -> Self {
        FrameSink { frame }
    }
}

impl RenderSink for FrameSink {
    fn set_cell(&mut self, x: usize, y: usize, cell: Cell) {
        if let Ok(mut frame) = self.frame.lock() {
            if y < BOARD_HEIGHT && x < BOARD_WIDTH {
                frame.cells[y][x] = cell;
            }
        }
    }

    fn set_preview(&mut self, piece: &Piece) {
        if let Ok(mut frame) = self.frame.lock() {
            frame.preview = Some(piece.clone());
        }
    }

    fn set_hud(&mut self, score: u64, level: u32, lines: u32) {
        if let Ok(mut frame) = self.frame.lock() {
            frame.score = score;
            frame.level = level;
            frame.lines = lines;
        }
    }
}

fn cell_color(cell: Cell) -> Color {
    match cell {
        Cell::Empty => Color::Black,
        Cell::I => Color::Cyan,
        Cell::O => Color::Yellow,
        Cell::T => Color::Magenta,
        Cell::S => Color::Green,
        Cell::Z => Color::Red,
        Cell::J => Color::Blue,
        Cell::L => Color::White,
    }
}

fn cell_glyph(cell: Cell) -> String {
    if cell.is_empty() {
        "  ".to_string()
    } else {
        style("[]").fg(cell_color(cell)).to_string()
    }
}

/// Compose the whole screen as lines of text
///
/// The playfield sits on the left; the right panel carries the HUD, the
/// preview box and, in a duel, the opponent's slot from the room record.
pub fn render_lines(frame: &Frame, opponent: Option<&PlayerSlot>, status: &str) -> Vec<String> {
    let mut panel: Vec<String> = Vec::new();
    panel.push(format!("Score: {}", frame.score));
    panel.push(format!("Level: {}", frame.level));
    panel.push(format!("Lines: {}", frame.lines));
    panel.push(String::new());
    panel.push("Next:".to_string());
    for y in 0..PREVIEW_SIZE {
        let mut row = String::new();
        for x in 0..PREVIEW_SIZE {
            let filled = frame
                .preview
                .as_ref()
                .is_some_and(|p| p.shape.get(y).and_then(|r| r.get(x)).copied().unwrap_or(false));
            if filled {
                let cell = frame.preview.as_ref().map(|p| p.cell).unwrap_or(Cell::Empty);
                row.push_str(&cell_glyph(cell));
            } else {
                row.push_str("  ");
            }
        }
        panel.push(row);
    }
    if let Some(slot) = opponent {
        panel.push(String::new());
        panel.push(format!("Opponent: {}", slot.name));
        panel.push(format!("  score {}  lines {}", slot.score, slot.lines));
        if !slot.alive {
            panel.push(format!("  {}", style("topped out").red()));
        }
    }
    if !status.is_empty() {
        panel.push(String::new());
        panel.push(status.to_string());
    }

    let mut lines = Vec::new();
    lines.push(format!("+{}+", "--".repeat(BOARD_WIDTH)));
    for y in 0..BOARD_HEIGHT {
        let mut line = String::from("|");
        for x in 0..BOARD_WIDTH {
            line.push_str(&cell_glyph(frame.cells[y][x]));
        }
        line.push('|');
        if let Some(extra) = panel.get(y) {
            line.push_str("  ");
            line.push_str(extra);
        }
        lines.push(line);
    }
    lines.push(format!("+{}+", "--".repeat(BOARD_WIDTH)));
    lines
}

/// Repaint the whole screen in place
pub fn draw(
    term: &Term,
    frame: &Frame,
    opponent: Option<&PlayerSlot>,
    status: &str,
) -> io::Result<()> {
    term.move_cursor_to(0, 0)?;
    for line in render_lines(frame, opponent, status) {
        term.clear_line()?;
        term.write_line(&line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::spawn_shape;

    #[test]
    fn test_render_dimensions() {
        let frame = Frame::default();
        let lines = render_lines(&frame, None, "");
        // top border, the playfield rows, bottom border
        assert_eq!(lines.len(), BOARD_HEIGHT + 2);
        assert!(lines[0].starts_with('+'));
        assert!(lines[1].starts_with('|'));
    }

    #[test]
    fn test_hud_and_status_present() {
        let mut frame = Frame::default();
        frame.score = 1200;
        frame.preview = Some(Piece {
            cell: Cell::T,
            shape: spawn_shape(Cell::T),
        });
        let lines = render_lines(&frame, None, "press enter to start");
        let joined = lines.join("\n");
        assert!(joined.contains("Score: 1200"));
        assert!(joined.contains("Next:"));
        assert!(joined.contains("press enter to start"));
    }

    #[test]
    fn test_frame_sink_writes_through() {
        let frame = shared_frame();
        let mut sink = FrameSink::new(frame.clone());
        sink.set_cell(3, 5, Cell::Z);
        sink.set_hud(40, 1, 1);
        let snapshot = frame.lock().unwrap().clone();
        assert_eq!(snapshot.cells[5][3], Cell::Z);
        assert_eq!(snapshot.score, 40);
    }
}
