//! The pairing state machine.
//!
//! Runs client-side over the framed channel: we open with our public
//! key, the phone answers with a key verdict and a challenge of the form
//! `"<server-id>:<nonce>"`, we verify the server id against a digest of
//! the certificate the channel actually presented, sign the challenge,
//! and wait for the final OK. Verifying the id binds the challenge to
//! this specific channel; signing proves we hold the paired private key.
//!
//! The machine is pure: it consumes decoded messages and emits actions
//! for the session loop to perform, so every transition is testable
//! without a socket.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde_json::Value;
use tracing::{debug, info};

use tether_shared::digest::server_id;
use tether_shared::error::HandshakeError;
use tether_shared::keypair::SharedKeypair;
use tether_shared::protocol::{
    ChallengePayload, Message, Opcode, PublicKeyPayload, ResponsePayload,
};

/// Where the pairing currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Public key sent; the phone has not judged it yet.
    AwaitingKeyVerdict,
    /// Verdict seen (pure UI feedback); waiting for the challenge.
    AwaitingChallenge,
    /// Challenge answered; waiting for the final OK.
    AwaitingFinalOk,
    Authenticated,
    Closed,
}

/// What the session loop must do after feeding the machine one message.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeEvent {
    /// Write this frame to the channel.
    SendFrame(Message),
    /// Ask the user to confirm our fingerprint on the phone.
    ConfirmFingerprint { fingerprint: String },
    /// The phone already recognizes our key.
    PeerRecognized,
    /// Pairing complete; contact sync may begin.
    Authenticated,
}

pub struct Handshake {
    phase: HandshakePhase,
    server_id: String,
    keypair: SharedKeypair,
}

impl Handshake {
    /// `certificate_der` is the raw certificate the secure channel
    /// presented; its digest is the only server id we will accept in a
    /// challenge.
    pub fn new(keypair: SharedKeypair, certificate_der: &[u8]) -> Self {
        Self {
            phase: HandshakePhase::AwaitingKeyVerdict,
            server_id: server_id(certificate_der),
            keypair,
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    /// The first application message on a fresh channel: our public key,
    /// base64 over the PEM text.
    pub fn opening_message(&self) -> Message {
        let payload = PublicKeyPayload {
            key: BASE64_STANDARD.encode(self.keypair.public_key_pem()),
        };
        Message::new(
            Opcode::C2sHandshakePublicKey,
            serde_json::to_value(payload).expect("payload struct serializes"),
        )
    }

    /// Mark the handshake dead after a fatal session error.
    pub fn close(&mut self) {
        self.phase = HandshakePhase::Closed;
    }

    /// Feed one decoded handshake message. An `Err` is a trust failure:
    /// the caller must close the connection without retrying.
    pub fn on_message(
        &mut self,
        opcode: Opcode,
        payload: &Value,
    ) -> Result<Vec<HandshakeEvent>, HandshakeError> {
        match opcode {
            Opcode::S2cHandshakePublicKeyUnknown => {
                self.note_verdict();
                Ok(vec![HandshakeEvent::ConfirmFingerprint {
                    fingerprint: self.keypair.fingerprint().to_string(),
                }])
            }

            Opcode::S2cHandshakePublicKeyKnown => {
                self.note_verdict();
                Ok(vec![HandshakeEvent::PeerRecognized])
            }

            Opcode::S2cHandshakeChallenge => self.on_challenge(payload),

            // Reserved echo of our own response opcode.
            Opcode::S2cHandshakeResponse => Ok(Vec::new()),

            Opcode::S2cHandshakeOk => {
                if self.phase != HandshakePhase::AwaitingFinalOk {
                    debug!(phase = ?self.phase, "Ignoring unexpected handshake OK");
                    return Ok(Vec::new());
                }
                info!("Handshake complete");
                self.phase = HandshakePhase::Authenticated;
                Ok(vec![HandshakeEvent::Authenticated])
            }

            other => {
                debug!(opcode = ?other, "Ignoring non-handshake opcode in handshake");
                Ok(Vec::new())
            }
        }
    }

    // A verdict is feedback, not an advance; it only moves the nominal
    // AwaitingKeyVerdict -> AwaitingChallenge edge.
    fn note_verdict(&mut self) {
        if self.phase == HandshakePhase::AwaitingKeyVerdict {
            self.phase = HandshakePhase::AwaitingChallenge;
        }
    }

    fn on_challenge(&mut self, payload: &Value) -> Result<Vec<HandshakeEvent>, HandshakeError> {
        if !matches!(
            self.phase,
            HandshakePhase::AwaitingKeyVerdict | HandshakePhase::AwaitingChallenge
        ) {
            debug!(phase = ?self.phase, "Ignoring challenge outside pairing");
            return Ok(Vec::new());
        }

        let challenge: ChallengePayload = serde_json::from_value(payload.clone())
            .map_err(|_| HandshakeError::MissingField("challenge"))?;

        let parts: Vec<&str> = challenge.challenge.split(':').collect();
        if parts.len() != 2 {
            return Err(HandshakeError::MalformedChallenge);
        }
        if parts[0] != self.server_id {
            // The challenge was minted for a different channel: relay or
            // spoofing. Fatal, no renegotiation.
            return Err(HandshakeError::ServerIdMismatch);
        }

        let signature = BASE64_STANDARD.encode(self.keypair.sign(challenge.challenge.as_bytes()));
        let response = ResponsePayload {
            challenge: challenge.challenge,
            signature,
        };

        self.phase = HandshakePhase::AwaitingFinalOk;
        Ok(vec![HandshakeEvent::SendFrame(Message::new(
            Opcode::C2sHandshakeResponse,
            serde_json::to_value(response).expect("payload struct serializes"),
        ))])
    }
}
