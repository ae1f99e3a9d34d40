//! Network protocol types shared between client and server.
//!
//! Inbound frames are envelopes `{"type": <message>, "payload": {...}}`.
//! Payload fields are coerced leniently since client input is never trusted
//! to be well-formed. Outbound messages are plain serde structs tagged by
//! `type`.
//!
//! ```text
//! CLIENT                               SERVER
//!   |--- {"type":"move", payload} ------>|  latest-wins slot
//!   |--- {"type":"attack", payload} ---->|  validated immediately
//!   |<-- {"type":"state", ...} ----------|  every tick
//!   |<-- {"type":"combat_feedback"} -----|  per resolved hit
//!   |<-- {"type":"player_left", ...} ----|  on leave
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::attacks::AttackType;
use crate::skills::SkillKey;

/// Wire protocol version. Bumped on any incompatible change to these types.
pub const PROTOCOL_VERSION: u16 = 1;

/// Disconnect reason codes carried by `player_left`.
pub mod leave_code {
    /// Transport closed normally.
    pub const NORMAL: u16 = 1000;
    /// Client asked to leave.
    pub const CONSENTED: u16 = 4000;
    /// The room is shutting down.
    pub const ROOM_SHUTDOWN: u16 = 4002;
}

/// Errors produced while decoding or encoding wire messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame is not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    /// Frame is JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,
    /// Frame has no string `type` tag.
    #[error("frame has no message type")]
    MissingType,
    /// Frame has a `type` tag this server does not handle.
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// Outbound message could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Session identity of a player inside one room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// Identity of a training dummy. Serialized as `"dummy-N"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DummyId(pub u16);

impl fmt::Display for DummyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dummy-{}", self.0)
    }
}

impl Serialize for DummyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DummyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.strip_prefix("dummy-")
            .and_then(|n| n.parse().ok())
            .map(Self)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid dummy id: {raw}")))
    }
}

/// A player's fixed combat class. Only affects cosmetics on the client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Archetype {
    /// Bow user.
    Archer,
    /// Spell caster.
    Mage,
    /// Default class.
    #[default]
    Swordsman,
    /// Dagger user.
    Assassin,
}

impl Archetype {
    /// Decodes a wire name. Unknown names yield `None`.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "Archer" => Some(Self::Archer),
            "Mage" => Some(Self::Mage),
            "Swordsman" => Some(Self::Swordsman),
            "Assassin" => Some(Self::Assassin),
            _ => None,
        }
    }
}

// ============================================================================
// INBOUND (Client -> Server)
// ============================================================================

/// Desired movement for the next ticks. Latest message wins.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveIntent {
    /// Strafe axis, `[-1, 1]` once sanitized.
    pub move_x: f32,
    /// Forward axis, `[-1, 1]` once sanitized.
    pub move_z: f32,
    /// Desired facing.
    pub yaw: f32,
    /// Sprint held.
    pub sprint: bool,
    /// Jump requested (edge-triggered).
    pub jump: bool,
}

impl MoveIntent {
    /// No input at all.
    pub const IDLE: Self = Self {
        move_x: 0.0,
        move_z: 0.0,
        yaw: 0.0,
        sprint: false,
        jump: false,
    };

    /// Coerces a `move` payload. Never fails: bad fields become neutral.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            move_x: coerce_number(value.get("moveX")).unwrap_or(0.0),
            move_z: coerce_number(value.get("moveZ")).unwrap_or(0.0),
            yaw: coerce_number(value.get("yaw")).unwrap_or(0.0),
            sprint: coerce_bool(value.get("sprint")),
            jump: coerce_bool(value.get("jump")),
        }
    }
}

/// An attack request as received, before any validation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AttackRequest {
    /// Decoded attack type, `None` if the tag was not recognized.
    pub kind: Option<AttackType>,
    /// Claimed aim yaw, if a finite number was sent.
    pub yaw: Option<f32>,
    /// Claimed aim pitch, if a finite number was sent.
    pub pitch: Option<f32>,
}

impl AttackRequest {
    /// Builds a well-formed request.
    #[must_use]
    pub const fn new(kind: AttackType, yaw: f32) -> Self {
        Self {
            kind: Some(kind),
            yaw: Some(yaw),
            pitch: None,
        }
    }

    /// Coerces an `attack` payload.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            kind: value
                .get("type")
                .and_then(Value::as_str)
                .and_then(AttackType::from_wire),
            yaw: finite_number(value.get("yaw")),
            pitch: finite_number(value.get("pitch")),
        }
    }
}

/// A validated attack intent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackIntent {
    /// Attack type.
    pub kind: AttackType,
    /// Aim yaw, wrapped.
    pub yaw: f32,
    /// Aim pitch, clamped.
    pub pitch: f32,
}

/// Session establishment options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinRequest {
    /// Requested display name, unsanitized.
    pub display_name: Option<String>,
    /// Requested archetype wire name.
    pub archetype: Option<String>,
    /// Reference to an external identity provider account.
    pub external_id: Option<String>,
}

impl JoinRequest {
    /// Builds a request from a display name and archetype.
    #[must_use]
    pub fn new(display_name: impl Into<String>, archetype: Archetype) -> Self {
        let archetype = match archetype {
            Archetype::Archer => "Archer",
            Archetype::Mage => "Mage",
            Archetype::Swordsman => "Swordsman",
            Archetype::Assassin => "Assassin",
        };
        Self {
            display_name: Some(display_name.into()),
            archetype: Some(archetype.to_owned()),
            external_id: None,
        }
    }

    /// Reads a join options bag. Non-string fields are treated as absent.
    #[must_use]
    pub fn from_options(options: &Value) -> Self {
        let text = |key: &str| options.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            display_name: text("displayName"),
            archetype: text("archetype"),
            external_id: text("externalId"),
        }
    }
}

/// Messages a connected client may send.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClientMessage {
    /// Overwrite the movement slot.
    Move(MoveIntent),
    /// Request an attack.
    Attack(AttackRequest),
}

impl ClientMessage {
    /// Decodes a JSON text frame.
    ///
    /// # Errors
    ///
    /// Fails if the frame is not a JSON object or has no known `type` tag.
    /// Field-level problems never fail; they are coerced to neutral values.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(frame).map_err(ProtocolError::Malformed)?;
        Self::from_value(&value)
    }

    /// Decodes an already-parsed envelope.
    ///
    /// # Errors
    ///
    /// See [`ClientMessage::decode`].
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        if !value.is_object() {
            return Err(ProtocolError::NotAnObject);
        }
        let payload = value.get("payload").unwrap_or(&Value::Null);
        match value.get("type").and_then(Value::as_str) {
            Some("move") => Ok(Self::Move(MoveIntent::from_value(payload))),
            Some("attack") => Ok(Self::Attack(AttackRequest::from_value(payload))),
            Some(other) => Err(ProtocolError::UnknownType(other.to_owned())),
            None => Err(ProtocolError::MissingType),
        }
    }
}

/// Numeric coercion: numbers, numeric strings and booleans. Non-finite is `None`.
fn coerce_number(value: Option<&Value>) -> Option<f32> {
    let raw = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }?;
    Some(raw as f32).filter(|v| v.is_finite())
}

/// Strict numeric read: only JSON numbers that stay finite as `f32`.
fn finite_number(value: Option<&Value>) -> Option<f32> {
    value
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
}

/// Boolean coercion by truthiness.
fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

// ============================================================================
// OUTBOUND (Server -> Client)
// ============================================================================

/// One skill track as seen by clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillView {
    /// Track.
    pub skill: SkillKey,
    /// Accumulated experience.
    pub xp: u32,
    /// Derived level.
    pub level: u32,
}

/// Replicated player state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Session id.
    pub id: PlayerId,
    /// Sanitized display name.
    pub name: String,
    /// Combat class.
    pub archetype: Archetype,
    /// Position X.
    pub x: f32,
    /// Position Y (height).
    pub y: f32,
    /// Position Z.
    pub z: f32,
    /// Facing.
    pub yaw: f32,
    /// Vertical velocity.
    pub vy: f32,
    /// Standing on the ground.
    pub on_ground: bool,
    /// Current health.
    pub hp: u32,
    /// Maximum health.
    pub max_hp: u32,
    /// Skill tracks in wire order.
    pub skills: Vec<SkillView>,
}

/// Replicated dummy state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DummyView {
    /// Dummy id.
    pub id: DummyId,
    /// Position X.
    pub x: f32,
    /// Position Y.
    pub y: f32,
    /// Position Z.
    pub z: f32,
    /// Current health.
    pub hp: u32,
    /// Maximum health.
    pub max_hp: u32,
    /// Revival time while dead.
    pub respawn_at: Option<u64>,
}

/// Full world state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    /// Server wall-clock time in milliseconds since the Unix epoch.
    pub server_time: u64,
    /// All players, ordered by id.
    pub players: Vec<PlayerView>,
    /// All dummies, ordered by id.
    pub dummies: Vec<DummyView>,
}

/// One state publication. Sequence numbers only move forward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorldPatch {
    /// Complete state; resets any client mirror.
    Full {
        /// Protocol version.
        version: u16,
        /// Publication sequence.
        seq: u64,
        /// The world.
        snapshot: WorldSnapshot,
    },
    /// Changes relative to publication `base_seq`.
    Delta {
        /// Protocol version.
        version: u16,
        /// Publication sequence.
        seq: u64,
        /// Sequence this delta applies on top of.
        #[serde(rename = "baseSeq")]
        base_seq: u64,
        /// Server time of this publication.
        #[serde(rename = "serverTime")]
        server_time: u64,
        /// Players that changed or appeared.
        players: Vec<PlayerView>,
        /// Players that disappeared.
        #[serde(rename = "removedPlayers")]
        removed_players: Vec<PlayerId>,
        /// Dummies that changed.
        dummies: Vec<DummyView>,
    },
}

impl WorldPatch {
    /// Publication sequence.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        match self {
            Self::Full { seq, .. } | Self::Delta { seq, .. } => *seq,
        }
    }
}

/// Who received a hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "targetKind", content = "targetId", rename_all = "lowercase")]
pub enum TargetRef {
    /// A training dummy.
    Dummy(DummyId),
    /// Another player.
    Player(PlayerId),
}

/// Per-hit feedback broadcast to every client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatFeedback {
    /// Attacker.
    pub source_id: PlayerId,
    /// Victim.
    #[serde(flatten)]
    pub target: TargetRef,
    /// Attack that landed.
    pub attack_type: AttackType,
    /// Damage dealt.
    pub damage: u32,
    /// Skill trained by the hit.
    pub skill: SkillKey,
    /// Level of that skill after the xp award.
    pub skill_level: u32,
    /// Experience awarded.
    pub xp_awarded: u32,
    /// Victim health after the hit (full if the victim respawned).
    pub target_hp: u32,
    /// Victim maximum health.
    pub target_max_hp: u32,
    /// Server time of the hit.
    pub timestamp: u64,
}

/// Messages broadcast by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// World state publication.
    State(WorldPatch),
    /// A hit landed.
    CombatFeedback(CombatFeedback),
    /// A player left the room.
    PlayerLeft {
        /// Who left.
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        /// Disconnect reason, see [`leave_code`].
        code: u16,
    },
}

impl ServerMessage {
    /// Encodes this message as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Fails only if a value cannot be represented in JSON.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_move_coercion() {
        let msg = ClientMessage::decode(
            r#"{"type":"move","payload":{"moveX":"0.5","moveZ":true,"yaw":null,"sprint":1,"jump":""}}"#,
        )
        .unwrap();

        let ClientMessage::Move(intent) = msg else {
            panic!("expected move");
        };
        assert_eq!(intent.move_x, 0.5);
        assert_eq!(intent.move_z, 1.0);
        assert_eq!(intent.yaw, 0.0);
        assert!(intent.sprint);
        assert!(!intent.jump);
    }

    #[test]
    fn test_move_garbage_is_neutral() {
        let intent = MoveIntent::from_value(&json!({"moveX": "abc", "moveZ": [1], "yaw": {}}));
        assert_eq!(intent, MoveIntent::IDLE);
    }

    #[test]
    fn test_move_overflow_is_neutral() {
        let intent = MoveIntent::from_value(&json!({"moveX": 1e300, "yaw": "1e300"}));
        assert_eq!(intent.move_x, 0.0);
        assert_eq!(intent.yaw, 0.0);
    }

    #[test]
    fn test_attack_decoding() {
        let msg = ClientMessage::decode(
            r#"{"type":"attack","payload":{"type":"archer","yaw":0.25}}"#,
        )
        .unwrap();
        let ClientMessage::Attack(request) = msg else {
            panic!("expected attack");
        };
        assert_eq!(request.kind, Some(AttackType::Archer));
        assert_eq!(request.yaw, Some(0.25));
        assert_eq!(request.pitch, None);

        // no payload at all still decodes, with nothing usable in it
        let msg = ClientMessage::decode(r#"{"type":"attack"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Attack(AttackRequest::default()));
    }

    #[test]
    fn test_attack_yaw_must_be_number() {
        let request = AttackRequest::from_value(&json!({"type": "sword", "yaw": "1.0"}));
        assert_eq!(request.kind, Some(AttackType::Sword));
        assert_eq!(request.yaw, None);
    }

    #[test]
    fn test_unknown_message_type() {
        assert!(matches!(
            ClientMessage::decode(r#"{"type":"teleport"}"#),
            Err(ProtocolError::UnknownType(t)) if t == "teleport"
        ));
        assert!(matches!(
            ClientMessage::decode("[1,2]"),
            Err(ProtocolError::NotAnObject)
        ));
        assert!(matches!(
            ClientMessage::decode("{"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_join_options() {
        let request = JoinRequest::from_options(&json!({
            "displayName": "  Rin  ",
            "archetype": 7,
            "externalId": "uid-42",
        }));
        assert_eq!(request.display_name.as_deref(), Some("  Rin  "));
        assert_eq!(request.archetype, None);
        assert_eq!(request.external_id.as_deref(), Some("uid-42"));
    }

    #[test]
    fn test_dummy_id_wire_format() {
        let id = DummyId(3);
        assert_eq!(serde_json::to_value(id).unwrap(), json!("dummy-3"));
        let back: DummyId = serde_json::from_value(json!("dummy-3")).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_value::<DummyId>(json!("dummy-x")).is_err());
    }

    #[test]
    fn test_feedback_shape() {
        let message = ServerMessage::CombatFeedback(CombatFeedback {
            source_id: PlayerId(1),
            target: TargetRef::Dummy(DummyId(2)),
            attack_type: AttackType::Sword,
            damage: 16,
            skill: SkillKey::SwordPrecision,
            skill_level: 1,
            xp_awarded: 14,
            target_hp: 124,
            target_max_hp: 140,
            timestamp: 1_000,
        });

        let value: Value = serde_json::from_str(&message.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "combat_feedback");
        assert_eq!(value["sourceId"], 1);
        assert_eq!(value["targetKind"], "dummy");
        assert_eq!(value["targetId"], "dummy-2");
        assert_eq!(value["attackType"], "sword");
        assert_eq!(value["skill"], "SwordPrecision");
        assert_eq!(value["targetHp"], 124);
    }

    #[test]
    fn test_state_message_decodes_back() {
        let message = ServerMessage::State(WorldPatch::Full {
            version: PROTOCOL_VERSION,
            seq: 7,
            snapshot: WorldSnapshot {
                server_time: 42,
                players: Vec::new(),
                dummies: vec![DummyView {
                    id: DummyId(1),
                    x: 16.0,
                    y: 0.0,
                    z: 0.0,
                    hp: 140,
                    max_hp: 140,
                    respawn_at: None,
                }],
            },
        });

        let json = message.encode().unwrap();
        let decoded: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, message);
    }
}
