//! WebSocket remote link.
//!
//! The remote controller connects to `/ws?session=<id>` and sends JSON
//! [`LinkCommand`]s. Commands are queued on [`LINK_CHANNEL`] and drained by the
//! link task through [`WsLink`]; every accepted command is answered with the
//! last published battery percentage.

extern crate alloc;

use alloc::{format, string::String};
use core::convert::Infallible;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use embassy_net::Stack;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, mutex::Mutex};
use embassy_time::Duration;
use embedded_io_async::Read;
use hashbrown::HashMap;
use lazy_static::lazy_static;
use picoserve::{
    extract::FromRequest,
    io::embedded_io_async as embedded_aio,
    request::{RequestBody, RequestParts},
    response::ws::{Message, ReadMessageError, SocketRx, SocketTx, WebSocketCallback, WebSocketUpgrade},
    url_encoded::deserialize_form,
    Router,
};
use serde::Deserialize;

use crate::utils::controllers::{LinkCommand, WirelessLink};

/// Commands received from peers, waiting for the link task.
pub static LINK_CHANNEL: Channel<CriticalSectionRawMutex, LinkCommand, 8> = Channel::new();
/// Battery percentage last published by the link task.
pub static BATTERY_LEVEL: AtomicU8 = AtomicU8::new(0);
static PEER_COUNT: AtomicU32 = AtomicU32::new(0);

pub struct ServerTimer;
pub struct WebSocket {
    session: String,
}
/// Sockets open under one session id.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub connections: u32,
    pub opened_at: u64,
}
pub struct SessionManager;

lazy_static! {
    pub static ref SESSION_STORE: Mutex<CriticalSectionRawMutex, HashMap<String, SessionState>> =
        Mutex::new(HashMap::new());
}

#[allow(unused_qualifications)]
impl picoserve::Timer for ServerTimer {
    type Duration = embassy_time::Duration;
    type TimeoutError = embassy_time::TimeoutError;

    async fn run_with_timeout<F: core::future::Future>(
        &mut self,
        duration: Self::Duration,
        future: F,
    ) -> Result<F::Output, Self::TimeoutError> {
        embassy_time::with_timeout(duration, future).await
    }
}

fn battery_reply() -> String {
    format!("{{\"battery\":{}}}", BATTERY_LEVEL.load(Ordering::Relaxed))
}

impl WebSocketCallback for WebSocket {
    async fn run<Reader, Writer>(
        self,
        rx: SocketRx<Reader>,
        tx: SocketTx<Writer>,
    ) -> Result<(), Writer::Error>
    where
        Reader: embedded_aio::Read,
        Writer: embedded_aio::Write<Error = Reader::Error>,
    {
        SessionManager::open_session(&self.session, embassy_time::Instant::now().as_secs()).await;
        let result = serve(&self.session, rx, tx).await;
        SessionManager::close_session(&self.session, embassy_time::Instant::now().as_secs()).await;
        result
    }
}

async fn serve<Reader, Writer>(
    session: &str,
    mut rx: SocketRx<Reader>,
    mut tx: SocketTx<Writer>,
) -> Result<(), Writer::Error>
where
    Reader: embedded_aio::Read,
    Writer: embedded_aio::Write<Error = Reader::Error>,
{
    let mut buffer = [0; 1024];

    tx.send_text("Connected").await?;

    let close_reason = loop {
        let parsed = match rx.next_message(&mut buffer).await {
            Ok(Message::Pong(_)) => continue,
            Ok(Message::Ping(data)) => {
                tx.send_pong(data).await?;
                continue;
            }
            Ok(Message::Close(reason)) => {
                tracing::info!(?reason, session, "websocket closed");
                break None;
            }
            Ok(Message::Text(data)) => serde_json::from_str::<LinkCommand>(data),
            Ok(Message::Binary(data)) => serde_json::from_slice::<LinkCommand>(data),
            Err(error) => {
                tracing::error!(?error, "websocket error");
                let code = match error {
                    ReadMessageError::TextIsNotUtf8 => 1007,
                    ReadMessageError::ReservedOpcode(_) => 1003,
                    ReadMessageError::ReadFrameError(_)
                    | ReadMessageError::UnexpectedMessageStart
                    | ReadMessageError::MessageStartsWithContinuation => 1002,
                    ReadMessageError::Io(err) => return Err(err),
                };
                break Some((code, "Websocket Error"));
            }
        };

        match parsed {
            Ok(cmd) => {
                LINK_CHANNEL.send(cmd).await;
                tx.send_text(&battery_reply()).await?;
            }
            Err(error) => {
                tracing::error!(?error, "error deserializing LinkCommand");
                tx.send_text("Invalid command format").await?
            }
        }
    };

    tx.close(close_reason).await
}

impl SessionManager {
    /// Counts one more socket under `session_id`.
    pub async fn open_session(
        session_id: &str,
        timestamp: u64,
    ) {
        let mut store = SESSION_STORE.lock().await;
        store
            .entry(String::from(session_id))
            .or_insert(SessionState {
                connections: 0,
                opened_at: timestamp,
            })
            .connections += 1;
        PEER_COUNT.store(open_sockets(&store), Ordering::Relaxed);
    }

    /// Drops one socket of `session_id`; the entry goes with its last socket.
    /// Returns false if the session was not open.
    pub async fn close_session(
        session_id: &str,
        timestamp: u64,
    ) -> bool {
        let mut store = SESSION_STORE.lock().await;
        let Some(state) = store.get_mut(session_id) else {
            return false;
        };
        state.connections = state.connections.saturating_sub(1);
        if state.connections == 0 {
            let lasted = timestamp.saturating_sub(state.opened_at);
            store.remove(session_id);
            tracing::info!(session = session_id, lasted_s = lasted, "session ended");
        }
        PEER_COUNT.store(open_sockets(&store), Ordering::Relaxed);
        true
    }

    /// Number of open sockets, readable without the store lock.
    pub fn peer_count() -> u32 {
        PEER_COUNT.load(Ordering::Relaxed)
    }
}

fn open_sockets(store: &HashMap<String, SessionState>) -> u32 {
    store.values().map(|s| s.connections).sum()
}

/// [`WirelessLink`] over the WebSocket server.
///
/// The server itself runs in its own task (see [`run`]); this handle only
/// exchanges data with it.
pub struct WsLink {
    mac: [u8; 6],
    name: Option<String>,
}

impl WsLink {
    pub fn new(mac: [u8; 6]) -> Self {
        Self { mac, name: None }
    }

    /// Name set by the last `start_advertising`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl WirelessLink for WsLink {
    type Error = Infallible;

    fn hardware_address(&self) -> [u8; 6] {
        self.mac
    }

    fn start_advertising(
        &mut self,
        name: &str,
    ) -> Result<(), Self::Error> {
        self.name = Some(String::from(name));
        Ok(())
    }

    fn connected_peer_count(&self) -> u32 {
        SessionManager::peer_count()
    }

    fn publish_battery(
        &mut self,
        percentage: u8,
    ) -> Result<(), Self::Error> {
        BATTERY_LEVEL.store(percentage, Ordering::Relaxed);
        Ok(())
    }

    fn poll_command(&mut self) -> Option<LinkCommand> {
        LINK_CHANNEL.try_receive().ok()
    }
}

/// Serve the remote link on `port`.
pub async fn run(
    id: usize,
    port: u16,
    stack: Stack<'static>,
    config: Option<&'static picoserve::Config<Duration>>,
) -> ! {
    let default_config = picoserve::Config::new(picoserve::Timeouts {
        start_read_request: Some(Duration::from_secs(5)),
        persistent_start_read_request: None,
        read_request: Some(Duration::from_secs(1)),
        write: Some(Duration::from_secs(5)),
    });

    let config = config.unwrap_or(&default_config);

    let router = Router::new().route(
        "/ws",
        picoserve::routing::get(|params: WsConnectionParams| async move {
            let session_id = params.query.session;
            tracing::info!(session = %session_id, "new remote connection");
            params
                .upgrade
                .on_upgrade(WebSocket {
                    session: session_id,
                })
                .with_protocol("messages")
        }),
    );

    if let Some(ip_cfg) = stack.config_v4() {
        tracing::info!("Starting link server at {}:{}", ip_cfg.address, port);
    } else {
        tracing::warn!("Starting link server on port {port}, but no IPv4 address is assigned yet!");
    }

    let (mut rx_buffer, mut tx_buffer, mut http_buffer) = ([0; 1024], [0; 1024], [0; 4096]);

    picoserve::listen_and_serve_with_state(
        id,
        &router,
        config,
        stack,
        port,
        &mut rx_buffer,
        &mut tx_buffer,
        &mut http_buffer,
        &(),
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    session: String,
}

pub struct WsConnectionParams {
    pub upgrade: WebSocketUpgrade,
    pub query: QueryParams,
}

impl<'r, S> FromRequest<'r, S> for WsConnectionParams {
    type Rejection = &'static str;

    async fn from_request<R: Read>(
        state: &'r S,
        parts: RequestParts<'r>,
        body: RequestBody<'r, R>,
    ) -> Result<Self, Self::Rejection> {
        let upgrade = WebSocketUpgrade::from_request(state, parts.clone(), body)
            .await
            .map_err(|_| "Failed to extract WebSocketUpgrade")?;

        let query_str = parts.query().ok_or("Missing query parameters")?;
        let query =
            deserialize_form::<QueryParams>(query_str).map_err(|_| "Invalid query parameters")?;

        if query.session.is_empty() {
            return Err("Session ID is required");
        }

        Ok(WsConnectionParams { upgrade, query })
    }
}
