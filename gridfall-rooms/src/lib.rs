//! Two-player room synchronization for independent falling-block games
//!
//! Players do not exchange moves; each runs its own engine and the only
//! shared state is a single room record in a backend implementing
//! [`RoomStore`]. The record carries both players' live score, level, line
//! count and alive flag, plus the room status and the final winner.
//!
//! [`RoomManager`] implements the record lifecycle (create, join, update,
//! finish, leave). [`MatchCoordinator`] drives one player's whole match as
//! a single task: it owns a [`LocalGame`] engine, ticks its gravity clock,
//! pushes the player's state into its slot every 100 ms and reacts to the
//! opponent's updates arriving over the store subscription.
//!
//! [`MemoryStore`] is the in-process reference backend used for local
//! two-player sessions and tests.

pub mod coordinator;
pub mod error;
pub mod local_game;
pub mod name_generator;
pub mod room;
pub mod store;
pub mod types;

pub use coordinator::{MatchCommand, MatchCoordinator, MatchEvent};
pub use error::{Result, RoomError};
pub use local_game::{GameInput, LocalGame, PlayerStats};
pub use name_generator::{generate_random_name, generate_unique_name};
pub use room::RoomManager;
pub use store::{MemoryStore, RoomPatch, RoomStore, RoomWatch, SlotPatch};
pub use types::{
    decide_winner, now_millis, PlayerId, PlayerSide, PlayerSlot, Room, RoomCode, RoomStatus,
    Winner, ROOM_CODE_ALPHABET, ROOM_CODE_LEN, ROOM_TTL_MS, SYNC_INTERVAL_MS,
};
