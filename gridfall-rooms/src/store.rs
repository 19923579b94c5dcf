//! Storage seam for the shared room record
//!
//! The room record lives in an external backend; this module specifies the
//! interface the protocol needs (`RoomStore`) and provides an in-process
//! reference implementation (`MemoryStore`) used for local sessions and
//! tests. A networked deployment implements `RoomStore` against its real
//! database and plugs it into the same `RoomManager`/`MatchCoordinator`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::error::{Result, RoomError};
use crate::types::{PlayerSide, PlayerSlot, Room, RoomCode, RoomStatus, Winner};

/// Partial update of one player slot; unset fields are left untouched
#[derive(Debug, Default, Clone)]
pub struct SlotPatch {
    pub ready: Option<bool>,
    pub score: Option<u64>,
    pub level: Option<u32>,
    pub lines: Option<u32>,
    pub alive: Option<bool>,
    pub last_update: Option<u64>,
    pub final_score: Option<u64>,
}

impl SlotPatch {
    fn apply(&self, slot: &mut PlayerSlot) {
        if let Some(ready) = self.ready {
            slot.ready = ready;
        }
        if let Some(score) = self.score {
            slot.score = score;
        }
        if let Some(level) = self.level {
            slot.level = level;
        }
        if let Some(lines) = self.lines {
            slot.lines = lines;
        }
        if let Some(alive) = self.alive {
            slot.alive = alive;
        }
        if let Some(last_update) = self.last_update {
            slot.last_update = Some(last_update);
        }
        if let Some(final_score) = self.final_score {
            slot.final_score = Some(final_score);
        }
    }
}

/// Partial update of a room record, applied atomically by the store
///
/// Mirrors a multi-path merge: top-level fields and per-slot patches can be
/// combined in one write. `set_player2` installs a whole second slot (the
/// join operation); slot patches addressed at a missing slot are ignored.
#[derive(Debug, Default, Clone)]
pub struct RoomPatch {
    pub status: Option<RoomStatus>,
    pub winner: Option<Winner>,
    pub started_at: Option<u64>,
    pub ended_at: Option<u64>,
    pub player1: Option<SlotPatch>,
    pub player2: Option<SlotPatch>,
    pub set_player2: Option<PlayerSlot>,
}

impl RoomPatch {
    /// Patch transitioning the room to the playing status
    pub fn start(started_at: u64) -> Self {
        RoomPatch {
            status: Some(RoomStatus::Playing),
            started_at: Some(started_at),
            ..Default::default()
        }
    }

    /// Patch recording the terminal status and winner
    pub fn finish(winner: Winner, ended_at: u64) -> Self {
        RoomPatch {
            status: Some(RoomStatus::Finished),
            winner: Some(winner),
            ended_at: Some(ended_at),
            ..Default::default()
        }
    }

    /// Patch touching only the given player's slot
    pub fn slot(side: PlayerSide, patch: SlotPatch) -> Self {
        match side {
            PlayerSide::Player1 => RoomPatch {
                player1: Some(patch),
                ..Default::default()
            },
            PlayerSide::Player2 => RoomPatch {
                player2: Some(patch),
                ..Default::default()
            },
        }
    }

    /// Apply the patch to a room record in place
    pub fn apply(&self, room: &mut Room) {
        if let Some(slot) = &self.set_player2 {
            room.player2 = Some(slot.clone());
        }
        if let Some(patch) = &self.player1 {
            patch.apply(&mut room.player1);
        }
        if let (Some(patch), Some(slot)) = (&self.player2, room.player2.as_mut()) {
            patch.apply(slot);
        }
        if let Some(status) = self.status {
            room.status = status;
        }
        if let Some(winner) = self.winner {
            room.winner = Some(winner);
        }
        if let Some(started_at) = self.started_at {
            room.started_at = Some(started_at);
        }
        if let Some(ended_at) = self.ended_at {
            room.ended_at = Some(ended_at);
        }
    }
}

/// Subscription to continuous push updates of one room record
///
/// Yields the latest full record on every change; once the record is
/// deleted (or the store goes away) every pending and future wait resolves
/// to `RoomClosed`.
pub struct RoomWatch {
    code: RoomCode,
    rx: watch::Receiver<Option<Room>>,
}

impl RoomWatch {
    /// Wait for the next change and return the latest record
    pub async fn changed(&mut self) -> Result<Room> {
        self.rx
            .changed()
            .await
            .map_err(|_| RoomError::RoomClosed(self.code.clone()))?;
        match self.rx.borrow_and_update().clone() {
            Some(room) => Ok(room),
            None => Err(RoomError::RoomClosed(self.code.clone())),
        }
    }

    /// Latest record without waiting, if the room still exists
    pub fn latest(&self) -> Option<Room> {
        self.rx.borrow().clone()
    }

    /// Code of the watched room
    pub fn code(&self) -> &RoomCode {
        &self.code
    }
}

/// Backend interface for the shared room record
pub trait RoomStore: Send + Sync + 'static {
    /// Write a fresh room record (overwrites any record under the same code)
    fn insert(&self, room: Room) -> impl Future<Output = Result<()>> + Send;

    /// Read the current record
    fn get(&self, code: &RoomCode) -> impl Future<Output = Result<Room>> + Send;

    /// Merge a partial update into the record and return the result
    fn update(
        &self,
        code: &RoomCode,
        patch: RoomPatch,
    ) -> impl Future<Output = Result<Room>> + Send;

    /// Delete the record, waking all watchers with an error
    fn remove(&self, code: &RoomCode) -> impl Future<Output = Result<()>> + Send;

    /// Subscribe to continuous updates of the record
    fn watch(&self, code: &RoomCode) -> impl Future<Output = Result<RoomWatch>> + Send;
}

struct RoomEntry {
    room: Room,
    tx: watch::Sender<Option<Room>>,
}

/// In-process room store over a mutex-guarded table with one watch channel
/// per room
#[derive(Clone, Default)]
pub struct MemoryStore {
    rooms: Arc<Mutex<HashMap<RoomCode, RoomEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every room whose expiry timestamp has passed, waking watchers
    ///
    /// Returns the number of rooms removed.
    pub fn purge_expired(&self, now: u64) -> usize {
        let mut rooms = match self.rooms.lock() {
            Ok(rooms) => rooms,
            Err(_) => return 0,
        };
        let expired: Vec<RoomCode> = rooms
            .iter()
            .filter(|(_, entry)| entry.room.expires_at <= now)
            .map(|(code, _)| code.clone())
            .collect();
        for code in &expired {
            if let Some(entry) = rooms.remove(code) {
                let _ = entry.tx.send(None);
                tracing::info!("Room '{}' expired and was purged", code);
            }
        }
        expired.len()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<RoomCode, RoomEntry>>> {
        self.rooms
            .lock()
            .map_err(|_| RoomError::Store("room table lock poisoned".to_string()))
    }
}

impl RoomStore for MemoryStore {
    async fn insert(&self, room: Room) -> Result<()> {
        let mut rooms = self.lock()?;
        let (tx, _rx) = watch::channel(Some(room.clone()));
        rooms.insert(room.code.clone(), RoomEntry { room, tx });
        Ok(())
    }

    async fn get(&self, code: &RoomCode) -> Result<Room> {
        let rooms = self.lock()?;
        rooms
            .get(code)
            .map(|entry| entry.room.clone())
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))
    }

    async fn update(&self, code: &RoomCode, patch: RoomPatch) -> Result<Room> {
        let mut rooms = self.lock()?;
        let entry = rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;
        patch.apply(&mut entry.room);
        let _ = entry.tx.send(Some(entry.room.clone()));
        Ok(entry.room.clone())
    }

    async fn remove(&self, code: &RoomCode) -> Result<()> {
        let mut rooms = self.lock()?;
        match rooms.remove(code) {
            Some(entry) => {
                let _ = entry.tx.send(None);
                Ok(())
            }
            None => Err(RoomError::RoomNotFound(code.clone())),
        }
    }

    async fn watch(&self, code: &RoomCode) -> Result<RoomWatch> {
        let rooms = self.lock()?;
        let entry = rooms
            .get(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;
        Ok(RoomWatch {
            code: code.clone(),
            rx: entry.tx.subscribe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{now_millis, PlayerId, PlayerSide, PlayerSlot};

    fn sample_room() -> Room {
        Room::new(
            RoomCode::generate(),
            PlayerSlot::new(PlayerId::generate(), "host"),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let room = sample_room();
        let code = room.code.clone();
        store.insert(room.clone()).await.unwrap();
        assert_eq!(store.get(&code).await.unwrap(), room);
    }

    #[tokio::test]
    async fn test_get_missing_room() {
        let store = MemoryStore::new();
        let result = store.get(&RoomCode::generate()).await;
        assert!(matches!(result, Err(RoomError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_merges_slot_fields() {
        let store = MemoryStore::new();
        let room = sample_room();
        let code = room.code.clone();
        store.insert(room).await.unwrap();

        let patch = RoomPatch::slot(
            PlayerSide::Player1,
            SlotPatch {
                score: Some(120),
                lines: Some(3),
                ..Default::default()
            },
        );
        let updated = store.update(&code, patch).await.unwrap();
        assert_eq!(updated.player1.score, 120);
        assert_eq!(updated.player1.lines, 3);
        // untouched fields survive the merge
        assert!(updated.player1.alive);
        assert_eq!(updated.status, RoomStatus::Waiting);
    }

    #[tokio::test]
    async fn test_patch_for_missing_player2_is_ignored() {
        let store = MemoryStore::new();
        let room = sample_room();
        let code = room.code.clone();
        store.insert(room.clone()).await.unwrap();

        let patch = RoomPatch::slot(
            PlayerSide::Player2,
            SlotPatch {
                score: Some(99),
                ..Default::default()
            },
        );
        let updated = store.update(&code, patch).await.unwrap();
        assert!(updated.player2.is_none());
    }

    #[tokio::test]
    async fn test_watch_delivers_updates() {
        let store = MemoryStore::new();
        let room = sample_room();
        let code = room.code.clone();
        store.insert(room).await.unwrap();

        let mut watch = store.watch(&code).await.unwrap();
        assert!(watch.latest().is_some());

        let patch = RoomPatch::start(now_millis());
        store.update(&code, patch).await.unwrap();

        let seen = watch.changed().await.unwrap();
        assert_eq!(seen.status, RoomStatus::Playing);
        assert!(seen.started_at.is_some());
    }

    #[tokio::test]
    async fn test_watch_errors_after_removal() {
        let store = MemoryStore::new();
        let room = sample_room();
        let code = room.code.clone();
        store.insert(room).await.unwrap();

        let mut watch = store.watch(&code).await.unwrap();
        store.remove(&code).await.unwrap();

        let result = watch.changed().await;
        assert!(matches!(result, Err(RoomError::RoomClosed(_))));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        let room = sample_room();
        let code = room.code.clone();
        let expires_at = room.expires_at;
        store.insert(room).await.unwrap();

        assert_eq!(store.purge_expired(expires_at - 1), 0);
        assert_eq!(store.purge_expired(expires_at), 1);
        assert!(matches!(
            store.get(&code).await,
            Err(RoomError::RoomNotFound(_))
        ));
    }
}
