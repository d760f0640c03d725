use serde::{Deserialize, Serialize};
use serde_json::Value;

/// All message opcodes exchanged with the phone. Values are the wire
/// bytes and must stay stable within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Bye = 0,

    C2sHandshakePublicKey = 1,
    S2cHandshakePublicKeyUnknown = 2,
    S2cHandshakePublicKeyKnown = 3,
    S2cHandshakeChallenge = 4,
    /// Reserved for the phone-initiated direction; the companion never sends it.
    C2sHandshakeChallenge = 5,
    C2sHandshakeResponse = 6,
    /// Reserved echo of our own response. Accepted and ignored.
    S2cHandshakeResponse = 7,
    S2cHandshakeOk = 8,
    /// Reserved for the phone-initiated direction; the companion never sends it.
    C2sHandshakeOk = 9,

    C2sRequestContacts = 10,
    S2cResponseContacts = 11,
}

impl Opcode {
    pub fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::Bye,
            1 => Self::C2sHandshakePublicKey,
            2 => Self::S2cHandshakePublicKeyUnknown,
            3 => Self::S2cHandshakePublicKeyKnown,
            4 => Self::S2cHandshakeChallenge,
            5 => Self::C2sHandshakeChallenge,
            6 => Self::C2sHandshakeResponse,
            7 => Self::S2cHandshakeResponse,
            8 => Self::S2cHandshakeOk,
            9 => Self::C2sHandshakeOk,
            10 => Self::C2sRequestContacts,
            11 => Self::S2cResponseContacts,
            _ => return None,
        })
    }
}

/// One decoded application message: raw opcode byte plus a schema-free
/// JSON payload tree. Unknown opcodes are preserved so the dispatcher can
/// decide to ignore them.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub opcode: u8,
    pub payload: Value,
}

impl Message {
    pub fn new(opcode: Opcode, payload: Value) -> Self {
        Self {
            opcode: opcode as u8,
            payload,
        }
    }

    /// Empty-bodied message, e.g. `Bye` or the contacts request.
    pub fn empty(opcode: Opcode) -> Self {
        Self::new(opcode, Value::Object(serde_json::Map::new()))
    }

    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }
}

/// First message after the secure channel comes up: our public key,
/// base64 over the PEM text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyPayload {
    pub key: String,
}

/// Server-issued challenge, `"<server-id>:<nonce>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengePayload {
    pub challenge: String,
}

/// Our answer: the challenge verbatim plus a base64 signature over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub challenge: String,
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for b in 0..=11u8 {
            let op = Opcode::from_u8(b).unwrap();
            assert_eq!(op as u8, b);
        }
        assert!(Opcode::from_u8(12).is_none());
        assert!(Opcode::from_u8(255).is_none());
    }

    #[test]
    fn test_empty_message_payload() {
        let msg = Message::empty(Opcode::C2sRequestContacts);
        assert_eq!(msg.opcode, 10);
        assert_eq!(msg.payload, serde_json::json!({}));
        assert_eq!(msg.opcode(), Some(Opcode::C2sRequestContacts));
    }

    #[test]
    fn test_challenge_payload_parses() {
        let payload: ChallengePayload =
            serde_json::from_value(serde_json::json!({"challenge": "abc:123"})).unwrap();
        assert_eq!(payload.challenge, "abc:123");
    }
}
