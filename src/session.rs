//! One chat session over one connection.
//!
//! ```text
//! stdin thread ──lines──► foreground loop ──chat frames──► write half
//!                                                            server
//! stdout ◄──text── listener task ◄──frames── FrameReader ◄── read half
//! ```
//!
//! The foreground loop and the listener share a [`CancellationToken`].
//! Whichever side finishes first cancels it: the listener when the server
//! closes the connection, the foreground loop when input runs out. The
//! foreground then joins the listener before returning, so no task
//! outlives [`Session::run`].

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::constants::CONNECTION_CLOSED_NOTICE;
use crate::identity;
use crate::message::OutgoingMessage;
use crate::socket::connection::{self, Connection, ConnectionReader, ConnectionWriter};
use crate::socket::framing::{self, FrameReader, Incoming};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Standard input reached end-of-file.
    InputExhausted,
    /// The server closed the connection.
    ServerClosed,
    /// The session's cancellation token was cancelled from outside.
    Cancelled,
}

/// How the listener task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerEnd {
    ServerClosed,
    Cancelled,
}

/// Build the handshake for `config`, resolving the display name.
///
/// The legacy `name` handshake marks an account-derived name with `~`;
/// the `auth` handshake sends it bare.
pub fn handshake(config: &Config) -> Result<OutgoingMessage> {
    let name = identity::display_name(config.name.as_deref(), config.legacy_handshake)?;
    Ok(if config.legacy_handshake {
        OutgoingMessage::Name(name)
    } else {
        OutgoingMessage::guest_auth(name, config.join)
    })
}

/// A connected session, ready to run.
pub struct Session {
    frames: FrameReader<ConnectionReader>,
    writer: ConnectionWriter,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open the connection named by `config`.
    ///
    /// # Errors
    ///
    /// Connection failures are returned with the address attached.
    pub async fn connect(config: &Config) -> Result<Self> {
        let conn = connection::open(&config.address).await?;
        Ok(Self::new(conn, config.max_frame_size))
    }

    /// Wrap an already open connection.
    pub fn new(conn: Connection, max_frame_size: u32) -> Self {
        let (reader, writer) = conn.into_split();
        Self::from_halves(reader, writer, max_frame_size)
    }

    /// Build a session from separate read and write halves.
    pub fn from_halves(
        reader: ConnectionReader,
        writer: ConnectionWriter,
        max_frame_size: u32,
    ) -> Self {
        Self {
            frames: FrameReader::new(reader).with_max_frame_size(max_frame_size),
            writer,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the session when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the session to completion.
    ///
    /// Sends `handshake`, prints every incoming frame to `output`, and
    /// sends one `chat` frame per line received on `input`.
    ///
    /// # Errors
    ///
    /// Send failures, input read failures, oversized or non-UTF-8 frames
    /// end the session with an error. There is no retry.
    pub async fn run<O>(
        self,
        handshake: OutgoingMessage,
        mut input: UnboundedReceiver<io::Result<String>>,
        output: O,
    ) -> Result<SessionEnd>
    where
        O: AsyncWrite + Send + Unpin + 'static,
    {
        let Self {
            frames,
            mut writer,
            cancel,
        } = self;

        send_message(&mut writer, &handshake)
            .await
            .context("Failed to send handshake")?;
        log::info!("[Session] Sent {} handshake", handshake.tag());

        let listener = tokio::spawn(listen(frames, output, cancel.clone()));

        let forwarded = forward_input(&mut writer, &mut input, &cancel).await;
        cancel.cancel();

        let listener_end = listener.await.context("Listener task panicked")?;
        let end = forwarded?;
        let end = match listener_end? {
            ListenerEnd::ServerClosed => SessionEnd::ServerClosed,
            ListenerEnd::Cancelled => end,
        };

        if end == SessionEnd::InputExhausted {
            if let Err(e) = writer.shutdown().await {
                log::debug!("[Session] Shutdown after end of input failed: {e}");
            }
        }

        log::info!("[Session] Ended: {end:?}");
        Ok(end)
    }
}

/// Serialize and send one message.
pub async fn send_message<W>(writer: &mut W, msg: &OutgoingMessage) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    framing::send(writer, &msg.to_payload()?).await
}

/// Foreground loop: input lines → chat frames, until input ends or the
/// token is cancelled.
async fn forward_input(
    writer: &mut ConnectionWriter,
    input: &mut UnboundedReceiver<io::Result<String>>,
    cancel: &CancellationToken,
) -> Result<SessionEnd> {
    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            line = input.recv() => line,
        };
        let Some(line) = line else {
            log::debug!("[Session] End of input");
            return Ok(SessionEnd::InputExhausted);
        };
        let line = line.context("Failed to read standard input")?;

        send_message(writer, &OutgoingMessage::chat(&line))
            .await
            .context("Failed to send chat message")?;
    }
}

/// Listener task: print frames until the server closes or the token is
/// cancelled. Cancels the token on the way out.
async fn listen<O>(
    mut frames: FrameReader<ConnectionReader>,
    mut output: O,
    cancel: CancellationToken,
) -> Result<ListenerEnd>
where
    O: AsyncWrite + Send + Unpin,
{
    let result: Result<ListenerEnd> = async {
        loop {
            let incoming = tokio::select! {
                () = cancel.cancelled() => return Ok(ListenerEnd::Cancelled),
                incoming = frames.next() => incoming?,
            };

            match incoming {
                Incoming::Closed => {
                    log::info!("[Session] Server closed the connection");
                    print_line(&mut output, CONNECTION_CLOSED_NOTICE).await?;
                    return Ok(ListenerEnd::ServerClosed);
                }
                Incoming::Frame(payload) => {
                    let text = String::from_utf8(payload).context("Server sent a non-UTF-8 frame")?;
                    print_line(&mut output, &text).await?;
                }
            }
        }
    }
    .await;

    if let Err(e) = &result {
        log::error!("[Session] Listener stopped: {e:#}");
    }
    cancel.cancel();
    result
}

async fn print_line<O>(output: &mut O, text: &str) -> Result<()>
where
    O: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

/// Read standard input on a dedicated thread.
///
/// Each line arrives without its line ending. The channel closes at
/// end-of-file or after forwarding a read error. The thread is detached;
/// a blocked terminal read does not keep the process alive.
pub fn spawn_stdin_reader() -> Result<UnboundedReceiver<io::Result<String>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader thread")?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::framing::receive;
    use tokio::io::{AsyncReadExt, DuplexStream};

    struct Harness {
        session: Session,
        server_rx: tokio::io::ReadHalf<DuplexStream>,
        server_tx: tokio::io::WriteHalf<DuplexStream>,
    }

    fn harness() -> Harness {
        let (client, server) = tokio::io::duplex(4096);
        let (client_rx, client_tx) = tokio::io::split(client);
        let (server_rx, server_tx) = tokio::io::split(server);
        Harness {
            session: Session::from_halves(Box::new(client_rx), Box::new(client_tx), 1024),
            server_rx,
            server_tx,
        }
    }

    async fn next_json(reader: &mut tokio::io::ReadHalf<DuplexStream>) -> serde_json::Value {
        serde_json::from_slice(&receive(reader).await.unwrap()).unwrap()
    }

    #[test]
    fn test_handshake_auth_uses_config() {
        let config = Config {
            name: Some("alice".to_string()),
            join: true,
            ..Config::default()
        };
        assert_eq!(handshake(&config).unwrap(), OutgoingMessage::guest_auth("alice", true));
    }

    #[test]
    fn test_handshake_legacy() {
        let config = Config {
            name: Some("alice".to_string()),
            legacy_handshake: true,
            ..Config::default()
        };
        assert_eq!(
            handshake(&config).unwrap(),
            OutgoingMessage::Name("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_input_exhausted_ends_session() {
        let Harness {
            session,
            mut server_rx,
            server_tx: _server_tx,
        } = harness();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (out_w, mut out_r) = tokio::io::duplex(4096);

        input_tx.send(Ok("hello world".to_string())).unwrap();
        input_tx.send(Ok("second".to_string())).unwrap();
        drop(input_tx);

        let end = session
            .run(OutgoingMessage::guest_auth("alice", false), input_rx, out_w)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::InputExhausted);

        assert_eq!(
            next_json(&mut server_rx).await,
            serde_json::json!(["auth", {"name": "alice", "join": false, "type": "guest"}])
        );
        assert_eq!(next_json(&mut server_rx).await, serde_json::json!(["chat", "hello world"]));
        assert_eq!(next_json(&mut server_rx).await, serde_json::json!(["chat", "second"]));
        // Write half was shut down after input ended.
        assert!(receive(&mut server_rx).await.unwrap().is_empty());

        let mut printed = String::new();
        out_r.read_to_string(&mut printed).await.unwrap();
        assert_eq!(printed, "");
    }

    #[tokio::test]
    async fn test_server_close_ends_session() {
        let Harness {
            session,
            mut server_rx,
            mut server_tx,
        } = harness();
        let (_input_tx, input_rx) = mpsc::unbounded_channel();
        let (out_w, mut out_r) = tokio::io::duplex(4096);

        let run = tokio::spawn(session.run(
            OutgoingMessage::Name("~alice".to_string()),
            input_rx,
            out_w,
        ));

        assert_eq!(next_json(&mut server_rx).await, serde_json::json!(["name", "~alice"]));
        framing::send(&mut server_tx, br#"["message","alice connected",""]"#)
            .await
            .unwrap();
        server_tx.shutdown().await.unwrap();

        assert_eq!(run.await.unwrap().unwrap(), SessionEnd::ServerClosed);

        let mut printed = String::new();
        out_r.read_to_string(&mut printed).await.unwrap();
        assert_eq!(
            printed,
            "[\"message\",\"alice connected\",\"\"]\nConnection closed by server\n"
        );
    }

    #[tokio::test]
    async fn test_non_utf8_frame_is_error() {
        let Harness {
            session,
            server_rx: _server_rx,
            mut server_tx,
        } = harness();
        let (_input_tx, input_rx) = mpsc::unbounded_channel();
        let (out_w, _out_r) = tokio::io::duplex(4096);

        framing::send(&mut server_tx, &[0xff, 0xfe]).await.unwrap();

        let err = session
            .run(OutgoingMessage::chat("x"), input_rx, out_w)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("non-UTF-8"));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_error() {
        let Harness {
            session,
            server_rx: _server_rx,
            mut server_tx,
        } = harness();
        let (_input_tx, input_rx) = mpsc::unbounded_channel();
        let (out_w, _out_r) = tokio::io::duplex(4096);

        server_tx.write_all(&4096u32.to_be_bytes()).await.unwrap();

        let err = session
            .run(OutgoingMessage::chat("x"), input_rx, out_w)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Frame too large"));
    }

    #[tokio::test]
    async fn test_input_error_is_fatal() {
        let Harness {
            session,
            server_rx: _server_rx,
            server_tx: _server_tx,
        } = harness();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (out_w, _out_r) = tokio::io::duplex(4096);

        input_tx
            .send(Err(io::Error::new(io::ErrorKind::InvalidData, "bad utf-8")))
            .unwrap();

        let err = session
            .run(OutgoingMessage::chat("x"), input_rx, out_w)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("standard input"));
    }

    #[tokio::test]
    async fn test_external_cancel_stops_session() {
        let Harness {
            session,
            server_rx: _server_rx,
            server_tx: _server_tx,
        } = harness();
        let (_input_tx, input_rx) = mpsc::unbounded_channel();
        let (out_w, _out_r) = tokio::io::duplex(4096);

        let token = session.cancellation_token();
        let run = tokio::spawn(session.run(OutgoingMessage::chat("x"), input_rx, out_w));
        token.cancel();

        assert_eq!(run.await.unwrap().unwrap(), SessionEnd::Cancelled);
    }
}
