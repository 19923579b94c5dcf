//! Piece catalog: the seven tetromino shapes and rotation
use serde::{Deserialize, Serialize};

/// Cell of the playfield, either empty or filled by a piece kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        *self == Cell::Empty
    }
}

/// Occupancy matrix of a piece, rows of booleans
///
/// Shapes are not trimmed: the spawn matrix keeps its padding rows so that
/// rotation pivots the way players expect (the I piece spawns on its second
/// row and swings around the matrix center).
pub type Shape = Vec<Vec<bool>>;

/// A falling piece: its kind (for coloring) plus its current shape matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub cell: Cell,
    pub shape: Shape,
}

impl Piece {
    /// Columns of the shape matrix
    pub fn width(&self) -> usize {
        self.shape.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Rows of the shape matrix
    pub fn height(&self) -> usize {
        self.shape.len()
    }
}

/// All seven piece kinds in catalog order
pub const PIECE_KINDS: [Cell; 7] = [
    Cell::I,
    Cell::O,
    Cell::T,
    Cell::S,
    Cell::Z,
    Cell::J,
    Cell::L,
];

fn shape_from_pattern(pattern: &[&str]) -> Shape {
    pattern
        .iter()
        .map(|row| row.bytes().map(|b| b == b'#').collect())
        .collect()
}

/// Spawn-orientation shape for a piece kind
pub fn spawn_shape(cell: Cell) -> Shape {
    match cell {
        Cell::Empty => Vec::new(),
        Cell::I => shape_from_pattern(&["....", "####", "....", "...."]),
        Cell::O => shape_from_pattern(&["##", "##"]),
        Cell::T => shape_from_pattern(&[".#.", "###", "..."]),
        Cell::S => shape_from_pattern(&[".##", "##.", "..."]),
        Cell::Z => shape_from_pattern(&["##.", ".##", "..."]),
        Cell::J => shape_from_pattern(&["#..", "###", "..."]),
        Cell::L => shape_from_pattern(&["..#", "###", "..."]),
    }
}

/// Spawn a uniformly random piece from the catalog
pub fn random_piece() -> Piece {
    let cell = PIECE_KINDS[rand::random::<u32>() as usize % PIECE_KINDS.len()];
    Piece {
        cell,
        shape: spawn_shape(cell),
    }
}

/// Clockwise rotation of a shape matrix: transpose, then reverse each row
pub fn rotate_cw(shape: &Shape) -> Shape {
    let rows = shape.len();
    let cols = shape.first().map(|row| row.len()).unwrap_or(0);
    (0..cols)
        .map(|x| (0..rows).rev().map(|y| shape[y][x]).collect())
        .collect()
}
