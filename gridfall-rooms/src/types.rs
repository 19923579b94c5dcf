/// Core types for the gridfall-rooms library
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomError};

/// Room code length in characters
pub const ROOM_CODE_LEN: usize = 8;

/// Alphabet the room code is drawn from
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Rooms expire 30 minutes after creation
pub const ROOM_TTL_MS: u64 = 30 * 60 * 1000;

/// Cadence at which a player pushes its state into its own slot
pub const SYNC_INTERVAL_MS: u64 = 100;

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Unique player identifier
///
/// Normally supplied by the external authentication layer; `generate`
/// produces a standalone identity for local sessions and tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Generate a new unique player ID
    /// Uses base58 encoding of a UUID to keep it short and copy-friendly
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let encoded = bs58::encode(uuid.as_bytes()).into_string();
        let shortened = encoded.chars().take(16).collect::<String>();
        PlayerId(shortened)
    }

    /// Create from an externally issued identity string
    /// Returns error if the string is empty or contains whitespace
    pub fn from_name(name: String) -> Result<Self> {
        if name.is_empty() {
            return Err(RoomError::InvalidPlayerId(
                "player id cannot be empty".to_string(),
            ));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(RoomError::InvalidPlayerId(format!(
                "player id '{}' contains whitespace or control characters",
                name
            )));
        }
        Ok(PlayerId(name))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 8-character room code from the A-Z0-9 alphabet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a random room code, one uniform draw per character
    ///
    /// Collision with an existing code is not checked; with 36^8 codes and
    /// a 30-minute room lifetime the chance of a clash is negligible.
    pub fn generate() -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| {
                let idx = rand::random::<u32>() as usize % ROOM_CODE_ALPHABET.len();
                ROOM_CODE_ALPHABET[idx] as char
            })
            .collect::<String>();
        RoomCode(code)
    }

    /// Parse a user-entered room code, validating length and alphabet
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        if normalized.len() != ROOM_CODE_LEN
            || !normalized
                .bytes()
                .all(|b| ROOM_CODE_ALPHABET.contains(&b))
        {
            return Err(RoomError::InvalidRoomCode(s.to_string()));
        }
        Ok(RoomCode(normalized))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Created, waiting for the second player
    Waiting,
    /// Both engines running
    Playing,
    /// Winner decided, terminal
    Finished,
}

/// Match outcome stored in the room record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Player1,
    Player2,
    Draw,
}

/// Which slot of the room a player occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSide {
    Player1,
    Player2,
}

impl PlayerSide {
    /// The other player's side
    pub fn opponent(self) -> PlayerSide {
        match self {
            PlayerSide::Player1 => PlayerSide::Player2,
            PlayerSide::Player2 => PlayerSide::Player1,
        }
    }

    /// Winner value corresponding to this side
    pub fn as_winner(self) -> Winner {
        match self {
            PlayerSide::Player1 => Winner::Player1,
            PlayerSide::Player2 => Winner::Player2,
        }
    }
}

impl std::fmt::Display for PlayerSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerSide::Player1 => write!(f, "player1"),
            PlayerSide::Player2 => write!(f, "player2"),
        }
    }
}

/// One player's portion of the room record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSlot {
    pub id: PlayerId,
    pub name: String,
    pub joined: bool,
    pub ready: bool,
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    pub alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<u64>,
}

impl PlayerSlot {
    /// Fresh slot for a player who just joined
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        PlayerSlot {
            id,
            name: name.into(),
            joined: true,
            ready: false,
            score: 0,
            level: 1,
            lines: 0,
            alive: true,
            last_update: None,
            final_score: None,
        }
    }
}

/// Shared room record coordinating two players' independent game sessions
///
/// Each player writes exclusively to its own slot; the top-level status,
/// winner and timestamps are written by whichever side detects the terminal
/// condition first (last write wins, the concurrent writes are idempotent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub code: RoomCode,
    pub created_by: PlayerId,
    pub status: RoomStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    pub expires_at: u64,
    pub player1: PlayerSlot,
    pub player2: Option<PlayerSlot>,
}

impl Room {
    /// New waiting room with the host occupying the first slot
    pub fn new(code: RoomCode, host: PlayerSlot) -> Self {
        let now = now_millis();
        Room {
            code,
            created_by: host.id.clone(),
            status: RoomStatus::Waiting,
            winner: None,
            created_at: now,
            started_at: None,
            ended_at: None,
            expires_at: now + ROOM_TTL_MS,
            player1: host,
            player2: None,
        }
    }

    /// Slot for the given side, if populated
    pub fn slot(&self, side: PlayerSide) -> Option<&PlayerSlot> {
        match side {
            PlayerSide::Player1 => Some(&self.player1),
            PlayerSide::Player2 => self.player2.as_ref(),
        }
    }

    /// Which side the given identity occupies, if any
    pub fn side_of(&self, id: &PlayerId) -> Option<PlayerSide> {
        if self.player1.id == *id {
            Some(PlayerSide::Player1)
        } else if self.player2.as_ref().is_some_and(|p| p.id == *id) {
            Some(PlayerSide::Player2)
        } else {
            None
        }
    }

    /// Winner by the currently recorded slot scores (higher score wins,
    /// equal scores are a draw, a missing opponent loses by default)
    pub fn decide_winner(&self) -> Winner {
        let p2_score = self.player2.as_ref().map(|p| p.score).unwrap_or(0);
        decide_winner(self.player1.score, p2_score)
    }
}

/// Deterministic winner computation from a pair of final scores
///
/// Both clients run this independently; it must produce the same result
/// regardless of which one performs the terminal write.
pub fn decide_winner(player1_score: u64, player2_score: u64) -> Winner {
    if player1_score > player2_score {
        Winner::Player1
    } else if player2_score > player1_score {
        Winner::Player2
    } else {
        Winner::Draw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_generation() {
        let id1 = PlayerId::generate();
        let id2 = PlayerId::generate();
        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_player_id_from_name() {
        assert!(PlayerId::from_name("user_42".to_string()).is_ok());
        assert!(PlayerId::from_name("".to_string()).is_err());
        assert!(PlayerId::from_name("has space".to_string()).is_err());
    }

    #[test]
    fn test_room_code_alphabet_and_length() {
        for _ in 0..50 {
            let code = RoomCode::generate();
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(code
                .as_str()
                .bytes()
                .all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_room_code_parse() {
        assert!(RoomCode::parse("ABCD1234").is_ok());
        // lowercase input is normalized
        assert_eq!(RoomCode::parse("abcd1234").unwrap().as_str(), "ABCD1234");
        assert!(RoomCode::parse("TOOSHORT!").is_err());
        assert!(RoomCode::parse("SEVEN77").is_err());
    }

    #[test]
    fn test_decide_winner_is_deterministic() {
        assert_eq!(decide_winner(500, 300), Winner::Player1);
        assert_eq!(decide_winner(300, 500), Winner::Player2);
        assert_eq!(decide_winner(400, 400), Winner::Draw);
        // side-independent: swapping the inputs mirrors the result
        assert_eq!(decide_winner(500, 300), Winner::Player1);
        assert_eq!(decide_winner(300, 500), Winner::Player2);
    }

    #[test]
    fn test_room_expiry_window() {
        let host = PlayerSlot::new(PlayerId::generate(), "host");
        let room = Room::new(RoomCode::generate(), host);
        assert_eq!(room.expires_at - room.created_at, ROOM_TTL_MS);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert!(room.player2.is_none());
    }

    #[test]
    fn test_room_wire_shape() {
        let host = PlayerSlot::new(
            PlayerId::from_name("host-id".to_string()).unwrap(),
            "Alice",
        );
        let room = Room::new(RoomCode::parse("QWERTY12").unwrap(), host);
        let json = serde_json::to_value(&room).unwrap();

        assert_eq!(json["code"], "QWERTY12");
        assert_eq!(json["createdBy"], "host-id");
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["player1"]["name"], "Alice");
        assert_eq!(json["player1"]["joined"], true);
        assert_eq!(json["player1"]["alive"], true);
        assert_eq!(json["player2"], serde_json::Value::Null);
        // optional fields are omitted until set
        assert!(json.get("winner").is_none());
        assert!(json.get("startedAt").is_none());

        let back: Room = serde_json::from_value(json).unwrap();
        assert_eq!(back, room);
    }

    #[test]
    fn test_winner_wire_form() {
        assert_eq!(
            serde_json::to_string(&Winner::Player1).unwrap(),
            "\"player1\""
        );
        assert_eq!(serde_json::to_string(&Winner::Draw).unwrap(), "\"draw\"");
    }

    #[test]
    fn test_side_of() {
        let host_id = PlayerId::generate();
        let guest_id = PlayerId::generate();
        let mut room = Room::new(
            RoomCode::generate(),
            PlayerSlot::new(host_id.clone(), "host"),
        );
        assert_eq!(room.side_of(&host_id), Some(PlayerSide::Player1));
        assert_eq!(room.side_of(&guest_id), None);

        room.player2 = Some(PlayerSlot::new(guest_id.clone(), "guest"));
        assert_eq!(room.side_of(&guest_id), Some(PlayerSide::Player2));
    }
}
