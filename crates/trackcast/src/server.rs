//! Trackcast server
//!
//! Accepts renderer clients over WebSocket and producer feeds over TCP,
//! and wires both into the distribution hub. Each client connection runs
//! one session task; each producer connection runs one ingest task.

use anyhow::{bail, Context, Result};
use bytes::BytesMut;
use clap::{Parser, ValueEnum};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};
use trackcast_session::{
    Hub, Output, Session, SessionConfig, SessionPhase, Subscription,
};
use trackcast_state::{
    slots::{SlotEngine, RANGES},
    Action, MemoryRange, RangeAssembler, StateCodec, StateEngine,
};
use trackcast_wire::{packet, FrameCodec, Packet, ServerMessage};

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_tracing(&self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Trackcast server - state fan-out for tracker overlays")]
struct Args {
    /// Address for renderer WebSocket connections
    #[arg(short, long, default_value = "0.0.0.0:24801")]
    bind: SocketAddr,

    /// Address for producer feed connections
    #[arg(short, long, default_value = "127.0.0.1:24802")]
    producer_bind: SocketAddr,

    /// Ping cadence in seconds
    #[arg(long, default_value = "30")]
    ping_interval: u64,

    /// How long a client has to answer a ping, in seconds
    #[arg(long, default_value = "60")]
    pong_window: u64,

    /// Restream to register, as "name=runner1,runner2". Repeatable.
    #[arg(long = "restream")]
    restreams: Vec<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

pub async fn run() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level.as_tracing())
        .init();

    let hub = Arc::new(Hub::new(Arc::new(SlotEngine::new())));
    for spec in &args.restreams {
        let (name, runners) = spec
            .split_once('=')
            .with_context(|| format!("bad restream spec: {spec}"))?;
        hub.create_restream(name, runners.split(',').map(str::to_owned))
            .await;
        info!(restream = name, "restream registered");
    }

    let config = SessionConfig {
        ping_interval: Duration::from_secs(args.ping_interval),
        pong_window: Duration::from_secs(args.pong_window),
    };

    let client_listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    let producer_listener = TcpListener::bind(args.producer_bind)
        .await
        .with_context(|| format!("failed to bind {}", args.producer_bind))?;
    info!(clients = %args.bind, producers = %args.producer_bind, "listening");

    let producer_hub = Arc::clone(&hub);
    tokio::spawn(async move {
        loop {
            match producer_listener.accept().await {
                Ok((stream, peer)) => {
                    info!(%peer, "producer connected");
                    let hub = Arc::clone(&producer_hub);
                    tokio::spawn(async move {
                        if let Err(e) = handle_producer(hub, RANGES.to_vec(), stream).await {
                            warn!(%peer, "producer connection ended: {e}");
                        }
                    });
                }
                Err(e) => error!("producer accept failed: {e}"),
            }
        }
    });

    loop {
        let (stream, peer) = client_listener.accept().await?;
        debug!(%peer, "client connected");
        let hub = Arc::clone(&hub);
        let config = config.clone();
        tokio::spawn(async move {
            match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => {
                    if let Err(e) = handle_client(hub, ws, config).await {
                        debug!(%peer, "client session ended: {e}");
                    }
                }
                Err(e) => debug!(%peer, "websocket handshake failed: {e}"),
            }
        });
    }
}

/// Drives one renderer session: decode, act, encode, one message at a
/// time, interleaved with hub notifications and the keepalive timers.
pub async fn handle_client<E: StateEngine>(
    hub: Arc<Hub<E>>,
    ws: WebSocketStream<TcpStream>,
    config: SessionConfig,
) -> Result<()> {
    let (mut sink, mut stream) = ws.split();
    let mut session = Session::new();
    session.on_open();

    let mut subscription: Option<Subscription> = None;
    let mut notify: Option<watch::Receiver<()>> = None;
    let mut ping = tokio::time::interval(config.ping_interval);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut pong_deadline: Option<std::pin::Pin<Box<tokio::time::Sleep>>> = None;

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Binary(bytes))) => {
                    let outputs = match session.on_client_bytes(&bytes) {
                        Ok(outputs) => outputs,
                        Err(e) => {
                            let _ = send(&mut sink, &ServerMessage::from_error(&e)).await;
                            break;
                        }
                    };
                    for output in outputs {
                        match output {
                            Output::Subscribe(sub) => match hub.subscribe(&sub).await {
                                Ok((cells, rx)) => {
                                    notify = Some(rx);
                                    subscription = Some(sub);
                                    send(&mut sink, &session.init_cells(cells)).await?;
                                }
                                Err(e) => {
                                    let _ = send(&mut sink, &ServerMessage::from_error(&e)).await;
                                    session.on_close();
                                    return Ok(());
                                }
                            },
                            Output::Click(click) => {
                                if let Err(e) = hub.click(&click).await {
                                    let _ = send(&mut sink, &ServerMessage::from_error(&e)).await;
                                    session.on_close();
                                    return Ok(());
                                }
                            }
                        }
                    }
                    if !session.awaiting_pong() {
                        pong_deadline = None;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // transport-level ping/pong/text
                Some(Err(e)) => {
                    debug!("client transport error: {e}");
                    break;
                }
            },
            _ = ping.tick(), if session.phase() == SessionPhase::Subscribed => {
                match session.start_ping() {
                    Ok(msg) => {
                        send(&mut sink, &msg).await?;
                        pong_deadline = Some(Box::pin(tokio::time::sleep(config.pong_window)));
                    }
                    Err(e) => {
                        let _ = send(&mut sink, &ServerMessage::from_error(&e)).await;
                        break;
                    }
                }
            },
            () = async { pong_deadline.as_mut().expect("deadline armed").await }, if pong_deadline.is_some() => {
                pong_deadline = None;
                if let Err(e) = session.pong_deadline() {
                    let _ = send(&mut sink, &ServerMessage::from_error(&e)).await;
                    break;
                }
            },
            changed = async { notify.as_mut().expect("notify armed").changed().await }, if notify.is_some() => {
                if changed.is_ok() {
                    let sub = subscription.as_ref().expect("subscribed session has a subscription");
                    match hub.render(sub).await {
                        Ok(cells) => {
                            for update in session.on_cells(cells) {
                                send(&mut sink, &update).await?;
                            }
                        }
                        Err(e) => {
                            let _ = send(&mut sink, &ServerMessage::from_error(&e)).await;
                            break;
                        }
                    }
                }
            },
        }
    }
    session.on_close();
    let _ = sink.close().await;
    Ok(())
}

async fn send<S>(sink: &mut S, msg: &ServerMessage) -> Result<()>
where
    S: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    sink.send(Message::Binary(msg.encode()))
        .await
        .context("failed to write to client")
}

/// Ingests one producer connection: version handshake, room name, then
/// framed range packets until Goodbye or EOF. Snapshot parse failures are
/// logged and skipped; the previous state stays authoritative.
pub async fn handle_producer<E: StateEngine>(
    hub: Arc<Hub<E>>,
    ranges: Vec<MemoryRange>,
    mut stream: TcpStream,
) -> Result<()> {
    let version = stream.read_u8().await.context("failed to read version byte")?;
    packet::check_version(version)?;
    let room_len = stream.read_u64().await.context("failed to read room length")?;
    if room_len > 255 {
        bail!("room name of {room_len} bytes refused");
    }
    let mut raw = vec![0; room_len as usize];
    stream
        .read_exact(&mut raw)
        .await
        .context("failed to read room name")?;
    let room = String::from_utf8(raw).context("room name is not UTF-8")?;
    info!(%room, "producer handshake complete");

    let mut assembler = RangeAssembler::new(ranges);
    let mut codec = StateCodec::new(Arc::clone(hub.engine()));
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        while let Some(packet) = FrameCodec::decode(&mut buf)? {
            if let Packet::Goodbye = packet {
                info!(%room, "producer said goodbye");
                return Ok(());
            }
            let Some(snapshot) = assembler.apply(&packet)? else {
                continue;
            };
            match codec.decide(&snapshot) {
                Ok(Action::SendFull(state)) => hub.publish(&room, state).await,
                Ok(Action::SendDiff(diff)) => hub.apply_diff(&room, &diff).await?,
                Ok(Action::NoOp) => {}
                Err(e) => warn!(%room, "snapshot failed to parse, keeping previous state: {e}"),
            }
        }
        if stream.read_buf(&mut buf).await? == 0 {
            bail!("producer stream ended without goodbye");
        }
    }
}
