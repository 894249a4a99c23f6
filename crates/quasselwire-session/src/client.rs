//! Async driver: one [`Session`] over one connection.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use quasselwire_frame::FrameCodec;
use quasselwire_types::BufferInfo;

use crate::error::Result;
use crate::event::NotificationSink;
use crate::session::{Output, Session};

/// Requests from the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    SendInput { buffer: BufferInfo, text: String },
    RequestBacklog {
        buffer_id: i32,
        first: i32,
        last: i32,
        limit: i32,
    },
    HideBuffer { buffer_id: i32 },
    UnhideBuffer { buffer_id: i32, index: i32 },
    Disconnect,
}

type Transport<T> = Framed<T, FrameCodec>;

/// Run `session` over `io` until the core hangs up, a fatal error occurs, or
/// a [`ClientCommand::Disconnect`] arrives (or every command sender is
/// dropped).
///
/// Non-fatal errors (undecodable messages, malformed arguments) are logged
/// and the loop carries on. The session is closed on every exit path.
pub async fn run_session<T, S>(
    io: T,
    session: &mut Session,
    mut commands: mpsc::Receiver<ClientCommand>,
    sink: &mut S,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: NotificationSink + ?Sized,
{
    let codec = FrameCodec::with_max_payload(session.config().max_frame_size);
    let mut transport = Framed::new(io, codec);
    let result = drive(&mut transport, session, &mut commands, sink).await;
    session.close();
    result
}

async fn drive<T, S>(
    transport: &mut Transport<T>,
    session: &mut Session,
    commands: &mut mpsc::Receiver<ClientCommand>,
    sink: &mut S,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: NotificationSink + ?Sized,
{
    transport.send(session.start()?).await?;

    loop {
        tokio::select! {
            frame = transport.next() => {
                let Some(frame) = frame else {
                    tracing::info!("core closed the connection");
                    return Ok(());
                };
                match session.handle_frame(&frame?) {
                    Ok(output) => deliver(transport, sink, output).await?,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => tracing::warn!(error = %err, "dropping message"),
                }
            }
            () = session.next_heartbeat() => {
                tracing::debug!("sending heartbeat");
                transport.send(session.heartbeat_request()?).await?;
            }
            command = commands.recv() => {
                let command = match command {
                    None | Some(ClientCommand::Disconnect) => {
                        tracing::info!("disconnect requested");
                        return Ok(());
                    }
                    Some(command) => command,
                };
                match session.apply(command) {
                    Ok(Some(frame)) => transport.send(frame).await?,
                    Ok(None) => {}
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => tracing::warn!(error = %err, "command rejected"),
                }
            }
        }
    }
}

async fn deliver<T, S>(transport: &mut Transport<T>, sink: &mut S, output: Output) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: NotificationSink + ?Sized,
{
    for event in output.events {
        sink.notify(event);
    }
    for frame in output.frames {
        transport.feed(frame).await?;
    }
    transport.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use quasselwire_types::Variant;
    use tokio::io::DuplexStream;

    use super::*;
    use crate::config::SessionConfig;
    use crate::error::{HandshakeError, SessionError};
    use crate::event::Event;
    use crate::session::SessionState;
    use crate::test_support::*;

    type Core = Framed<DuplexStream, FrameCodec>;

    fn connect() -> (DuplexStream, Core) {
        let (client, core) = tokio::io::duplex(64 * 1024);
        (client, Framed::new(core, FrameCodec::new()))
    }

    async fn recv(core: &mut Core) -> Variant {
        let payload: Bytes = core.next().await.unwrap().unwrap();
        read(&payload)
    }

    /// Answer the handshake and swallow the five state requests.
    async fn log_in(core: &mut Core) {
        let init = recv(core).await;
        assert_eq!(text(&init, "MsgType"), "ClientInit");
        let [init_ack, login_ack, session_init] =
            <[Bytes; 3]>::try_from(handshake_frames()).unwrap();
        core.send(init_ack).await.unwrap();
        assert_eq!(text(&recv(core).await, "MsgType"), "ClientLogin");
        core.send(login_ack).await.unwrap();
        core.send(session_init).await.unwrap();
        for _ in 0..5 {
            recv(core).await;
        }
    }

    #[tokio::test]
    async fn delivers_events_until_core_hangs_up() {
        let (client, mut core) = connect();
        let core_task = tokio::spawn(async move {
            log_in(&mut core).await;
            let topic = list([
                Variant::int(1),
                Variant::string("IrcChannel"),
                Variant::string("1/#rust"),
                Variant::string("setTopic"),
                Variant::string("be kind"),
            ]);
            core.send(frame(&topic)).await.unwrap();
            // Unknown sync key: logged and skipped.
            let unknown = list([
                Variant::int(1),
                Variant::string("Identity"),
                Variant::string("0"),
                Variant::string("update"),
            ]);
            core.send(frame(&unknown)).await.unwrap();
        });

        let mut session = new_session();
        let (_commands_tx, commands) = mpsc::channel(4);
        let mut events: Vec<Event> = Vec::new();
        run_session(client, &mut session, commands, &mut events)
            .await
            .unwrap();
        core_task.await.unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].name(), "initializeBuffer");
        assert_eq!(
            events[2],
            Event::TopicChanged {
                network_id: 1,
                buffer_name: "#rust".into(),
                topic: "be kind".into(),
            }
        );
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn commands_are_sent_once_active() {
        let (client, mut core) = connect();
        let (commands_tx, commands) = mpsc::channel(4);
        let core_task = tokio::spawn(async move {
            log_in(&mut core).await;
            commands_tx
                .send(ClientCommand::SendInput {
                    buffer: channel(3, "#rust"),
                    text: "/join #tokio".into(),
                })
                .await
                .unwrap();
            let input = recv(&mut core).await;
            assert_eq!(item(&input, 3), &Variant::string("/JOIN #tokio"));

            commands_tx.send(ClientCommand::Disconnect).await.unwrap();
            // Client side is gone after disconnect.
            assert!(core.next().await.is_none());
        });

        let mut session = new_session();
        let mut events: Vec<Event> = Vec::new();
        run_session(client, &mut session, commands, &mut events)
            .await
            .unwrap();
        drop(session);
        core_task.await.unwrap();
    }

    #[tokio::test]
    async fn unexpected_handshake_reply_ends_the_session() {
        let (client, mut core) = connect();
        let core_task = tokio::spawn(async move {
            recv(&mut core).await;
            core.send(handshake("ClientLoginAck")).await.unwrap();
            core
        });

        let mut session = new_session();
        let (_commands_tx, commands) = mpsc::channel(1);
        let mut events: Vec<Event> = Vec::new();
        let err = run_session(client, &mut session, commands, &mut events)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::Handshake(HandshakeError::UnexpectedMessage { .. })
        ));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(events.is_empty());
        core_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_flow_both_ways() {
        let (client, mut core) = connect();
        let core_task = tokio::spawn(async move {
            log_in(&mut core).await;
            let started = tokio::time::Instant::now();

            let heartbeat = recv(&mut core).await;
            assert_eq!(started.elapsed(), Duration::from_secs(30));
            assert_eq!(item(&heartbeat, 0), &Variant::int(5));
            assert_eq!(item(&heartbeat, 1), &Variant::time(32_700_000));

            core.send(frame(&list([Variant::int(5), Variant::time(0)])))
                .await
                .unwrap();
            let reply = recv(&mut core).await;
            assert_eq!(item(&reply, 0), &Variant::int(6));
        });

        let mut session = new_session_with(SessionConfig {
            heartbeat_interval: Some(Duration::from_secs(30)),
            ..SessionConfig::default()
        });
        let (_commands_tx, commands) = mpsc::channel(1);
        let mut events: Vec<Event> = Vec::new();
        run_session(client, &mut session, commands, &mut events)
            .await
            .unwrap();
        core_task.await.unwrap();
        assert!(!session.heartbeat_running());
    }
}
