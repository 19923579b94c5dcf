/// Error types for the gridfall-rooms library
use thiserror::Error;

use crate::types::RoomCode;

/// Result type alias for room operations
pub type Result<T> = std::result::Result<T, RoomError>;

/// Errors that can occur in room protocol operations
#[derive(Debug, Error)]
pub enum RoomError {
    /// No room record exists for the given code
    #[error("room '{0}' not found")]
    RoomNotFound(RoomCode),

    /// The game in the room has already started (status is not waiting)
    #[error("the game in room '{0}' has already started")]
    RoomAlreadyStarted(RoomCode),

    /// Both player slots are already populated
    #[error("room '{0}' already has two players")]
    RoomFull(RoomCode),

    /// The joining identity is already occupying a slot in the room
    #[error("already joined room '{0}'")]
    AlreadyInRoom(RoomCode),

    /// The room record was deleted or became unreachable while subscribed
    #[error("room '{0}' no longer exists")]
    RoomClosed(RoomCode),

    /// Invalid player identity string
    #[error("invalid player id: {0}")]
    InvalidPlayerId(String),

    /// Room code is not 8 characters from the A-Z0-9 alphabet
    #[error("invalid room code: {0}")]
    InvalidRoomCode(String),

    /// Backend storage error
    #[error("store error: {0}")]
    Store(String),
}
