//! The single active phone session.
//!
//! One tokio task owns the secure channel end to end: it connects,
//! drives the pairing handshake, dispatches decoded frames in arrival
//! order, and reports its lifecycle through typed notifications. Framing
//! or trust failures tear the session down immediately; the final state
//! change carries the error that ended it.

use std::net::SocketAddr;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tether_shared::keypair::SharedKeypair;
use tether_shared::protocol::{Message, Opcode};
use tether_shared::types::ConnectionState;

use crate::framing::{decode_segment, encode_frame, FrameBuffer};
use crate::handshake::{Handshake, HandshakeEvent, HandshakePhase};
use crate::tls::connect_phone;

/// Commands sent *into* the session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Say goodbye and tear the session down.
    Close,
}

/// Notifications sent *from* the session task.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    /// The phone does not know our key yet; the user must confirm this
    /// fingerprint on the phone.
    ConfirmFingerprint { fingerprint: String },
    /// The phone recognized our key.
    PeerRecognized,
    /// A contact-sync payload arrived on the authenticated channel.
    ContactsReceived { payload: Value },
}

/// Handle to the running session task.
pub struct SessionHandle {
    pub remote: SocketAddr,
    commands: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Request a graceful close. Idempotent; the task may already be gone.
    pub fn close(&self) {
        let _ = self.commands.try_send(SessionCommand::Close);
    }

    /// Whether the session task has fully torn down. A new connection is
    /// only admissible once this is true.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the session task for one connection attempt.
pub fn spawn_session(
    remote: SocketAddr,
    keypair: SharedKeypair,
    events: mpsc::Sender<SessionEvent>,
) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(16);
    let task = tokio::spawn(run_session(remote, keypair, events, cmd_rx));
    SessionHandle {
        remote,
        commands: cmd_tx,
        task,
    }
}

async fn run_session(
    remote: SocketAddr,
    keypair: SharedKeypair,
    events: mpsc::Sender<SessionEvent>,
    mut commands: mpsc::Receiver<SessionCommand>,
) {
    let _ = events
        .send(SessionEvent::StateChanged(ConnectionState::Connecting))
        .await;

    let (stream, certificate) = match connect_phone(remote).await {
        Ok(connected) => connected,
        Err(e) => {
            warn!(addr = %remote, error = %e, "Connect failed");
            let _ = events
                .send(SessionEvent::StateChanged(ConnectionState::Closed {
                    error: Some(format!("{e:#}")),
                }))
                .await;
            return;
        }
    };

    info!(addr = %remote, "Connected, identifying phone");
    let _ = events
        .send(SessionEvent::StateChanged(ConnectionState::Connected))
        .await;

    let mut handshake = Handshake::new(keypair, &certificate);
    let (mut reader, mut writer) = tokio::io::split(stream);

    // The channel opens with our public key.
    let mut error: Option<String> = None;
    let opening = handshake.opening_message();
    if let Err(e) = write_frame(&mut writer, &opening).await {
        error = Some(e.to_string());
    }

    let mut buffer = FrameBuffer::new();
    let mut read_buf = vec![0u8; 8192];

    'session: while error.is_none() {
        tokio::select! {
            read = reader.read(&mut read_buf) => {
                match read {
                    Ok(0) => {
                        debug!(addr = %remote, "Peer closed the channel");
                        break 'session;
                    }
                    Ok(n) => {
                        buffer.extend(&read_buf[..n]);
                        // Segments are handled strictly left-to-right.
                        while let Some(segment) = buffer.next_segment() {
                            let frame = match decode_segment(&segment) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    // No partial-message recovery: a bad
                                    // frame kills the connection.
                                    warn!(addr = %remote, error = %e, "Frame decode failed");
                                    error = Some(e.to_string());
                                    break 'session;
                                }
                            };
                            debug!(
                                opcode = frame.message.opcode,
                                advertised_len = frame.advertised_len,
                                decompressed_len = frame.decompressed_len,
                                "Frame received"
                            );
                            if let Err(e) =
                                dispatch(frame.message, &mut handshake, &events, &mut writer).await
                            {
                                warn!(addr = %remote, error = %e, "Session error");
                                error = Some(format!("{e:#}"));
                                break 'session;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(addr = %remote, error = %e, "Read failed");
                        error = Some(e.to_string());
                        break 'session;
                    }
                }
            }

            cmd = commands.recv() => {
                match cmd {
                    Some(SessionCommand::Close) | None => {
                        debug!(addr = %remote, "Closing session");
                        let bye = Message::empty(Opcode::Bye);
                        let _ = write_frame(&mut writer, &bye).await;
                        let _ = writer.shutdown().await;
                        break 'session;
                    }
                }
            }
        }
    }

    handshake.close();
    info!(addr = %remote, error = ?error, "Session ended");
    let _ = events
        .send(SessionEvent::StateChanged(ConnectionState::Closed { error }))
        .await;
}

/// Route one decoded message. Handshake opcodes feed the state machine;
/// the contacts response is only honored after authentication; everything
/// else is tolerated as a no-op.
async fn dispatch<W>(
    message: Message,
    handshake: &mut Handshake,
    events: &mpsc::Sender<SessionEvent>,
    writer: &mut W,
) -> anyhow::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let Some(opcode) = message.opcode() else {
        debug!(opcode = message.opcode, "Ignoring unknown opcode");
        return Ok(());
    };

    match opcode {
        Opcode::Bye => {
            debug!("Peer said goodbye");
            Ok(())
        }

        Opcode::S2cHandshakePublicKeyUnknown
        | Opcode::S2cHandshakePublicKeyKnown
        | Opcode::S2cHandshakeChallenge
        | Opcode::S2cHandshakeResponse
        | Opcode::S2cHandshakeOk => {
            let actions = handshake.on_message(opcode, &message.payload)?;
            for action in actions {
                match action {
                    HandshakeEvent::SendFrame(msg) => write_frame(writer, &msg).await?,
                    HandshakeEvent::ConfirmFingerprint { fingerprint } => {
                        let _ = events
                            .send(SessionEvent::ConfirmFingerprint { fingerprint })
                            .await;
                    }
                    HandshakeEvent::PeerRecognized => {
                        let _ = events.send(SessionEvent::PeerRecognized).await;
                    }
                    HandshakeEvent::Authenticated => {
                        let _ = events
                            .send(SessionEvent::StateChanged(ConnectionState::Authenticated))
                            .await;
                        // First authenticated action: ask for the contacts.
                        let request = Message::empty(Opcode::C2sRequestContacts);
                        write_frame(writer, &request).await?;
                    }
                }
            }
            Ok(())
        }

        Opcode::S2cResponseContacts => {
            if handshake.phase() == HandshakePhase::Authenticated {
                let _ = events
                    .send(SessionEvent::ContactsReceived {
                        payload: message.payload,
                    })
                    .await;
            } else {
                // Protocol violation, tolerated passively.
                debug!("Ignoring contacts response before authentication");
            }
            Ok(())
        }

        Opcode::C2sHandshakePublicKey
        | Opcode::C2sHandshakeChallenge
        | Opcode::C2sHandshakeResponse
        | Opcode::C2sHandshakeOk
        | Opcode::C2sRequestContacts => {
            debug!(opcode = ?opcode, "Ignoring client-direction opcode from peer");
            Ok(())
        }
    }
}

async fn write_frame<W>(writer: &mut W, message: &Message) -> anyhow::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let frame = encode_frame(message.opcode, &message.payload)?;
    writer.write_all(&frame).await?;
    debug!(
        opcode = message.opcode,
        frame_len = frame.len(),
        "Frame sent"
    );
    Ok(())
}
