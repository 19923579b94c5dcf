//! Room lifecycle operations over a [`RoomStore`]
//!
//! `RoomManager` is a thin handle implementing create/join/leave and the
//! per-slot and top-level record updates the match protocol needs. It holds
//! no session state of its own; everything lives in the store so two
//! managers over the same backend see the same rooms.

use std::sync::Arc;

use crate::error::{Result, RoomError};
use crate::store::{RoomPatch, RoomStore, RoomWatch, SlotPatch};
use crate::types::{
    now_millis, PlayerId, PlayerSide, PlayerSlot, Room, RoomCode, RoomStatus, Winner,
};

/// Handle for room lifecycle operations against one backend
pub struct RoomManager<S: RoomStore> {
    store: Arc<S>,
}

// Manual impl so the handle stays cloneable when `S` itself is not Clone
impl<S: RoomStore> Clone for RoomManager<S> {
    fn clone(&self) -> Self {
        RoomManager {
            store: self.store.clone(),
        }
    }
}

impl<S: RoomStore> RoomManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        RoomManager { store }
    }

    /// Create a new waiting room hosted by the given player
    ///
    /// The generated code is not checked against existing rooms; the code
    /// space is large enough that clashes within a room's lifetime are
    /// negligible.
    pub async fn create_room(&self, host: PlayerId, host_name: &str) -> Result<Room> {
        let code = RoomCode::generate();
        let room = Room::new(code.clone(), PlayerSlot::new(host.clone(), host_name));
        self.store.insert(room.clone()).await?;
        tracing::info!("Room '{}' created by player '{}'", code, host);
        Ok(room)
    }

    /// Join an existing waiting room as the second player
    ///
    /// Checks, in order: the room exists, the game has not started, the
    /// second slot is free, and the joining identity is not already the
    /// host. Returns the room as it was before the join, so the caller can
    /// read the host's slot.
    pub async fn join_room(
        &self,
        code: &RoomCode,
        player: PlayerId,
        player_name: &str,
    ) -> Result<Room> {
        let room = self.store.get(code).await?;
        if room.status != RoomStatus::Waiting {
            return Err(RoomError::RoomAlreadyStarted(code.clone()));
        }
        if room.player2.is_some() {
            return Err(RoomError::RoomFull(code.clone()));
        }
        if room.player1.id == player {
            return Err(RoomError::AlreadyInRoom(code.clone()));
        }

        let patch = RoomPatch {
            set_player2: Some(PlayerSlot::new(player.clone(), player_name)),
            ..Default::default()
        };
        self.store.update(code, patch).await?;
        tracing::info!("Player '{}' joined room '{}'", player, code);
        Ok(room)
    }

    /// Read the current room record
    pub async fn room(&self, code: &RoomCode) -> Result<Room> {
        self.store.get(code).await
    }

    /// Subscribe to continuous updates of the room record
    pub async fn subscribe(&self, code: &RoomCode) -> Result<RoomWatch> {
        self.store.watch(code).await
    }

    /// Merge a state update into one player's slot
    pub async fn update_player(
        &self,
        code: &RoomCode,
        side: PlayerSide,
        patch: SlotPatch,
    ) -> Result<Room> {
        self.store.update(code, RoomPatch::slot(side, patch)).await
    }

    /// Merge an arbitrary partial update into the room record
    pub async fn update_room(&self, code: &RoomCode, patch: RoomPatch) -> Result<Room> {
        self.store.update(code, patch).await
    }

    /// Transition the room to playing, recording the start timestamp
    pub async fn start_game(&self, code: &RoomCode) -> Result<Room> {
        let room = self.store.update(code, RoomPatch::start(now_millis())).await?;
        tracing::info!("Room '{}' started", code);
        Ok(room)
    }

    /// Record the terminal status and winner
    ///
    /// Both clients may call this concurrently; the writes carry the same
    /// deterministically computed winner, so last write wins is harmless.
    pub async fn end_game(&self, code: &RoomCode, winner: Winner) -> Result<Room> {
        let room = self
            .store
            .update(code, RoomPatch::finish(winner, now_millis()))
            .await?;
        tracing::info!("Room '{}' finished, winner: {:?}", code, winner);
        Ok(room)
    }

    /// Delete the whole room record
    ///
    /// Either player leaving tears the room down for both; remaining
    /// subscribers observe the deletion as a closed-room error.
    pub async fn leave_room(&self, code: &RoomCode, player: &PlayerId) -> Result<()> {
        self.store.remove(code).await?;
        tracing::info!("Player '{}' left room '{}', room deleted", player, code);
        Ok(())
    }
}
