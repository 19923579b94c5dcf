//! Match coordinator driving one player's side of a two-player room
//!
//! Each player runs its own coordinator as a single task. The task owns the
//! local game engine and multiplexes four inputs in one select loop: player
//! commands, room record updates from the store subscription, the gravity
//! clock, and the periodic state sync into the player's own slot. All
//! cross-player coordination goes through the shared room record; the
//! coordinators never talk to each other directly.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::Result;
use crate::local_game::{GameInput, LocalGame};
use crate::room::RoomManager;
use crate::store::{RoomStore, RoomWatch, SlotPatch};
use crate::types::{
    now_millis, PlayerId, PlayerSide, Room, RoomCode, RoomStatus, Winner, SYNC_INTERVAL_MS,
};

/// Commands a player feeds into its coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCommand {
    /// Forward one input into the local engine
    Input(GameInput),
    /// Request the match to start (only meaningful once both slots are full)
    StartGame,
    /// Leave the match, deleting the room for both players
    Leave,
}

/// Events the coordinator reports back to its player
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// Fresh snapshot of the room record after any change
    RoomUpdated(Room),
    /// The second player has joined; the match can be started
    BothPlayersReady,
    /// The room went to playing and the local engine is running
    Started,
    /// The opponent topped out (the local game keeps going)
    OpponentEliminated,
    /// The local game topped out
    Eliminated,
    /// Terminal outcome recorded in the room
    Finished { winner: Winner, room: Room },
    /// The room record disappeared or the subscription broke mid-match
    ConnectionLost,
    /// The local player left; the coordinator has shut down
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchPhase {
    Waiting,
    Playing,
    Finished,
}

/// One player's coordinator for a two-player match
pub struct MatchCoordinator<S: RoomStore, G: LocalGame> {
    rooms: RoomManager<S>,
    game: G,
    code: RoomCode,
    side: PlayerSide,
    player: PlayerId,
    phase: MatchPhase,
    watch: RoomWatch,
    command_tx: flume::Sender<MatchCommand>,
    command_rx: flume::Receiver<MatchCommand>,
    event_tx: flume::Sender<MatchEvent>,
    event_rx: flume::Receiver<MatchEvent>,
    ready_announced: bool,
    opponent_eliminated_announced: bool,
    eliminated: bool,
}

impl<S: RoomStore, G: LocalGame> MatchCoordinator<S, G> {
    /// Create a new room and coordinate its first slot
    pub async fn host(store: Arc<S>, player: PlayerId, name: &str, game: G) -> Result<Self> {
        let rooms = RoomManager::new(store);
        let room = rooms.create_room(player.clone(), name).await?;
        let side = room.side_of(&player).unwrap_or(PlayerSide::Player1);
        let watch = rooms.subscribe(&room.code).await?;
        Ok(Self::new(rooms, game, room.code, side, player, watch))
    }

    /// Join an existing room and coordinate the slot it lands in
    pub async fn join(
        store: Arc<S>,
        code: &RoomCode,
        player: PlayerId,
        name: &str,
        game: G,
    ) -> Result<Self> {
        let rooms = RoomManager::new(store);
        rooms.join_room(code, player.clone(), name).await?;
        let room = rooms.room(code).await?;
        let side = room.side_of(&player).unwrap_or(PlayerSide::Player2);
        let watch = rooms.subscribe(code).await?;
        Ok(Self::new(rooms, game, code.clone(), side, player, watch))
    }

    fn new(
        rooms: RoomManager<S>,
        game: G,
        code: RoomCode,
        side: PlayerSide,
        player: PlayerId,
        watch: RoomWatch,
    ) -> Self {
        let (command_tx, command_rx) = flume::unbounded();
        let (event_tx, event_rx) = flume::unbounded();
        MatchCoordinator {
            rooms,
            game,
            code,
            side,
            player,
            phase: MatchPhase::Waiting,
            watch,
            command_tx,
            command_rx,
            event_tx,
            event_rx,
            ready_announced: false,
            opponent_eliminated_announced: false,
            eliminated: false,
        }
    }

    /// Code of the coordinated room
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Which slot this coordinator occupies
    pub fn side(&self) -> PlayerSide {
        self.side
    }

    /// Handle for sending commands into the running coordinator
    pub fn sender(&self) -> flume::Sender<MatchCommand> {
        self.command_tx.clone()
    }

    /// Receiver of the coordinator's event stream
    pub fn events(&self) -> flume::Receiver<MatchEvent> {
        self.event_rx.clone()
    }

    /// Drive the match until the player leaves or the room goes away
    pub async fn run(mut self) {
        let mut drop_interval = self.game.drop_interval();
        let mut gravity = interval_at(Instant::now() + drop_interval, drop_interval);
        gravity.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut was_running = self.game.is_running();
        let mut sync = tokio::time::interval(Duration::from_millis(SYNC_INTERVAL_MS));
        sync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.command_rx.recv_async() => match command {
                    Ok(MatchCommand::Input(input)) => {
                        if self.phase == MatchPhase::Playing {
                            self.game.apply(input);
                            self.after_local_step().await;
                        }
                    }
                    Ok(MatchCommand::StartGame) => self.handle_start().await,
                    Ok(MatchCommand::Leave) => {
                        self.handle_leave().await;
                        return;
                    }
                    Err(_) => {
                        // all command handles dropped, treat as leave
                        self.handle_leave().await;
                        return;
                    }
                },
                room = self.watch.changed() => match room {
                    Ok(room) => self.handle_room_update(room),
                    Err(_) => {
                        if self.phase != MatchPhase::Finished {
                            tracing::warn!(
                                "Player '{}' lost room '{}' mid-match",
                                self.player,
                                self.code
                            );
                            self.emit(MatchEvent::ConnectionLost);
                        }
                        return;
                    }
                },
                _ = gravity.tick(), if self.phase == MatchPhase::Playing && self.game.is_running() => {
                    self.game.gravity_tick();
                    self.after_local_step().await;
                }
                _ = sync.tick(), if self.phase == MatchPhase::Playing && !self.eliminated => {
                    self.push_state().await;
                }
            }

            // gravity is a fresh timer after a level change and after a
            // resume; a paused interval must not carry its old deadline
            // into the running state
            let current = self.game.drop_interval();
            let now_running = self.game.is_running();
            if current != drop_interval || (now_running && !was_running) {
                drop_interval = current;
                gravity = interval_at(Instant::now() + drop_interval, drop_interval);
                gravity.set_missed_tick_behavior(MissedTickBehavior::Delay);
            }
            was_running = now_running;
        }
    }

    /// Request the start transition in the shared record
    ///
    /// The local engine is not started here; both sides start uniformly
    /// when the subscription delivers the playing status.
    async fn handle_start(&mut self) {
        if self.phase != MatchPhase::Waiting {
            return;
        }
        match self.rooms.room(&self.code).await {
            Ok(room) if room.player2.is_none() => {
                tracing::warn!(
                    "Cannot start room '{}' before the second player joins",
                    self.code
                );
            }
            Ok(_) => {
                if let Err(err) = self.rooms.start_game(&self.code).await {
                    tracing::warn!("Failed to start room '{}': {}", self.code, err);
                }
            }
            Err(err) => {
                tracing::warn!("Failed to read room '{}': {}", self.code, err);
            }
        }
    }

    async fn handle_leave(&mut self) {
        if let Err(err) = self.rooms.leave_room(&self.code, &self.player).await {
            tracing::warn!("Failed to delete room '{}' on leave: {}", self.code, err);
        }
        self.game.stop();
        self.emit(MatchEvent::Left);
    }

    fn handle_room_update(&mut self, room: Room) {
        self.emit(MatchEvent::RoomUpdated(room.clone()));

        if self.phase == MatchPhase::Waiting {
            if room.player2.is_some() && !self.ready_announced {
                self.ready_announced = true;
                self.emit(MatchEvent::BothPlayersReady);
            }
            if room.status == RoomStatus::Playing {
                self.game.start();
                self.phase = MatchPhase::Playing;
                tracing::info!(
                    "Player '{}' starts playing in room '{}'",
                    self.player,
                    self.code
                );
                self.emit(MatchEvent::Started);
            }
        }

        if self.phase == MatchPhase::Playing {
            let opponent_out = room
                .slot(self.side.opponent())
                .is_some_and(|slot| !slot.alive);
            if opponent_out && !self.opponent_eliminated_announced {
                self.opponent_eliminated_announced = true;
                self.emit(MatchEvent::OpponentEliminated);
            }
        }

        if room.status == RoomStatus::Finished && self.phase != MatchPhase::Finished {
            self.phase = MatchPhase::Finished;
            self.game.stop();
            let winner = room.winner.unwrap_or_else(|| room.decide_winner());
            self.emit(MatchEvent::Finished { winner, room });
        }
    }

    /// Check for a local top-out after every engine step
    ///
    /// The first detection publishes the final slot state; if the opponent
    /// is already out (or gone) the terminal write follows. Both sides may
    /// race to the terminal write, the deterministic winner makes the
    /// duplicate harmless.
    async fn after_local_step(&mut self) {
        if !self.game.is_over() || self.eliminated {
            return;
        }
        self.eliminated = true;
        let stats = self.game.stats();
        tracing::info!(
            "Player '{}' topped out in room '{}' with score {}",
            self.player,
            self.code,
            stats.score
        );
        self.emit(MatchEvent::Eliminated);

        let patch = SlotPatch {
            alive: Some(false),
            score: Some(stats.score),
            level: Some(stats.level),
            lines: Some(stats.lines),
            final_score: Some(stats.score),
            last_update: Some(now_millis()),
            ..Default::default()
        };
        match self.rooms.update_player(&self.code, self.side, patch).await {
            Ok(room) => {
                let opponent_out = room
                    .slot(self.side.opponent())
                    .map(|slot| !slot.alive)
                    .unwrap_or(true);
                if opponent_out && room.status != RoomStatus::Finished {
                    if let Err(err) =
                        self.rooms.end_game(&self.code, room.decide_winner()).await
                    {
                        tracing::warn!("Failed to finish room '{}': {}", self.code, err);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to record elimination in room '{}': {}",
                    self.code,
                    err
                );
            }
        }
    }

    /// Push the current score, level and line count into our slot
    async fn push_state(&mut self) {
        if !self.game.is_active() {
            return;
        }
        let stats = self.game.stats();
        let patch = SlotPatch {
            score: Some(stats.score),
            level: Some(stats.level),
            lines: Some(stats.lines),
            last_update: Some(now_millis()),
            ..Default::default()
        };
        if let Err(err) = self.rooms.update_player(&self.code, self.side, patch).await {
            // transient write failures are dropped, the next tick retries
            tracing::warn!("Failed to sync state for room '{}': {}", self.code, err);
        }
    }

    fn emit(&self, event: MatchEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("Event receiver for room '{}' dropped", self.code);
        }
    }
}
