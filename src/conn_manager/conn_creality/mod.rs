pub mod cfs_probe;
pub mod creality_commands;
pub mod creality_types;
pub(crate) mod parse;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use futures::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpStream, task::JoinHandle, time::Instant};
use tokio_tungstenite::{
    tungstenite::{self, Message},
    MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{
        printer_config::{ClientTimings, PrinterConfigCreality},
        printer_id::PrinterId,
    },
    conn_manager::{backoff::Backoff, command_queue::CommandQueue, ConnState},
    status::{DeviceState, FeatureStatus, StateListener, StateStore},
};

use creality_commands::CrealityCmd;
use creality_types::{Identity, InfoResponse, Method};
use parse::Frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client for one printer's LAN websocket (`ws://<host>:9999/`).
///
/// Keeps a single connection alive in a background task, merges everything
/// the printer pushes into a [`StateStore`], and writes queued commands back
/// over the same socket.
pub struct CrealityClient {
    shared: Arc<ClientShared>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct ClientShared {
    printer_cfg: PrinterConfigCreality,
    timings: ClientTimings,
    http: reqwest::Client,
    store: StateStore,
    queue: CommandQueue,
    identity: RwLock<Identity>,
    conn_state: RwLock<ConnState>,
}

enum EpochEnd {
    Stopped,
    Closed,
    Failed(anyhow::Error),
}

/// new
impl CrealityClient {
    pub fn new(printer_cfg: PrinterConfigCreality) -> Result<Self> {
        Self::with_timings(printer_cfg, ClientTimings::default())
    }

    pub fn with_timings(printer_cfg: PrinterConfigCreality, timings: ClientTimings) -> Result<Self> {
        let http = reqwest::ClientBuilder::new()
            .timeout(timings.info_timeout)
            .build()?;

        let identity = Identity::from_host(&printer_cfg.host);

        Ok(Self {
            shared: Arc::new(ClientShared {
                printer_cfg,
                timings,
                http,
                store: StateStore::new(),
                queue: CommandQueue::new(),
                identity: RwLock::new(identity),
                conn_state: RwLock::new(ConnState::Disconnected),
            }),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        })
    }
}

/// getters
impl CrealityClient {
    pub fn id(&self) -> &PrinterId {
        &self.shared.printer_cfg.id
    }

    pub fn config(&self) -> &PrinterConfigCreality {
        &self.shared.printer_cfg
    }

    pub fn store(&self) -> &StateStore {
        &self.shared.store
    }

    pub fn snapshot(&self) -> DeviceState {
        self.shared.store.snapshot()
    }

    pub fn add_listener(&self, listener: impl StateListener + 'static) {
        self.shared.store.add_listener(listener);
    }

    pub fn identity(&self) -> Identity {
        self.shared.identity.read().clone()
    }

    pub fn unique_id(&self) -> String {
        self.shared.identity.read().unique_id.clone()
    }

    pub fn conn_state(&self) -> ConnState {
        *self.shared.conn_state.read()
    }

    pub fn cfs_support(&self) -> FeatureStatus {
        self.shared.store.cfs_support()
    }
}

/// commands
impl CrealityClient {
    /// Queues `{"method": "set", "params": params}`. Delivery is best effort.
    pub fn enqueue_command(&self, params: Map<String, Value>) {
        self.shared.queue.enqueue(Method::Set, params);
    }

    pub fn send_cmd(&self, cmd: &CrealityCmd) {
        self.enqueue_command(cmd.to_params());
    }

    /// Asks the printer to push `boxsInfo` now
    pub fn request_boxs_info(&self) {
        self.shared.queue.request_boxs_info();
    }
}

/// start, stop
impl CrealityClient {
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() || self.cancel.is_cancelled() {
            warn!("client for {} already started", self.shared.printer_cfg.host);
            return;
        }
        let shared = self.shared.clone();
        let cancel = self.cancel.clone();
        *task = Some(tokio::spawn(shared.run(cancel)));
    }

    /// Cancels the connection loop and waits for it to unwind. The socket is
    /// closed on the way out and no listener is called after this returns.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("connection task for {} ended badly: {:?}", self.shared.printer_cfg.host, e);
            }
        }
        self.shared.store.set_online_silent(false);
        *self.shared.conn_state.write() = ConnState::Disconnected;
    }

    /// `GET /info` for model and mac. Never fails: on error the identity
    /// stays as it was, with the host as unique id unless a mac is known.
    pub async fn fetch_info(&self) -> Identity {
        let host = &self.shared.printer_cfg.host;
        match self.shared.get_info().await {
            Ok(info) => {
                let identity = Identity::from_info(info, host);
                info!(
                    "Creality info: model={:?} mac={:?}",
                    identity.model, identity.mac
                );
                *self.shared.identity.write() = identity.clone();
                identity
            }
            Err(e) => {
                warn!("failed to GET /info from {}: {:?}", host, e);
                let mut identity = self.shared.identity.write();
                if identity.mac.is_none() {
                    identity.unique_id = host.clone();
                }
                identity.clone()
            }
        }
    }
}

impl Drop for CrealityClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// MARK: connection loop
impl ClientShared {
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut backoff = Backoff::new(self.timings.backoff.clone());
        let host = self.printer_cfg.host.clone();

        loop {
            self.set_conn_state(ConnState::Connecting);
            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                res = self.connect() => res,
            };

            match connected {
                Ok(ws) => {
                    backoff.reset();
                    match self.run_epoch(ws, &cancel).await {
                        EpochEnd::Stopped => break,
                        EpochEnd::Closed => {
                            info!("connection to {} closed by printer", host);
                            self.set_conn_state(ConnState::Closing);
                        }
                        EpochEnd::Failed(e) => {
                            warn!("WS to {} disconnected ({:?}), reconnecting", host, e);
                            self.set_conn_state(ConnState::Failed);
                        }
                    }
                }
                Err(e) => {
                    warn!("failed to connect to {}: {:?}", host, e);
                    self.set_conn_state(ConnState::Failed);
                }
            }

            self.store.set_online(false);
            self.set_conn_state(ConnState::Disconnected);

            let delay = backoff.next_delay();
            debug!("reconnecting to {} in {:?}", host, delay);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("connection loop for {} stopped", host);
    }

    async fn connect(&self) -> Result<WsStream> {
        let url = url::Url::parse(&self.printer_cfg.ws_url())?;
        info!("connecting to {}", url);

        let (ws, _) = tokio::time::timeout(
            self.timings.connect_timeout,
            tokio_tungstenite::connect_async(url.as_str()),
        )
        .await
        .map_err(|_| anyhow!("timed out connecting to {}", url))??;

        Ok(ws)
    }

    /// One connection's lifetime: receive, send and the materials box probe
    /// run together until one of the first two ends or the client is stopped.
    async fn run_epoch(&self, ws: WsStream, cancel: &CancellationToken) -> EpochEnd {
        let (sink, stream) = ws.split();
        let sink = tokio::sync::Mutex::new(sink);

        self.store.begin_epoch();
        self.set_conn_state(ConnState::Connected);

        let end = {
            let recv = recv_loop(&self.store, &self.timings, stream, &sink);
            let send = send_loop(&self.queue, &sink);
            let probe = cfs_probe::probe_materials_box(&self.store, &self.queue, &self.timings.cfs);
            tokio::pin!(recv, send, probe);

            let mut probing = true;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break EpochEnd::Stopped,
                    res = &mut recv => break match res {
                        Ok(()) => EpochEnd::Closed,
                        Err(e) => EpochEnd::Failed(e),
                    },
                    res = &mut send => break match res {
                        Ok(()) => EpochEnd::Failed(anyhow!("command queue closed")),
                        Err(e) => EpochEnd::Failed(e),
                    },
                    status = &mut probe, if probing => {
                        probing = false;
                        debug!("materials box probe finished: {:?}", status);
                    }
                }
            }
        };

        let mut sink = sink.into_inner();
        match tokio::time::timeout(Duration::from_secs(1), sink.close()).await {
            Ok(Ok(())) => trace!("websocket closed"),
            Ok(Err(e)) => trace!("error closing websocket: {}", e),
            Err(_) => trace!("timed out closing websocket"),
        }

        end
    }

    fn set_conn_state(&self, state: ConnState) {
        {
            let mut current = self.conn_state.write();
            if *current == state {
                return;
            }
            *current = state;
        }
        debug!("{}: {}", self.printer_cfg.host, state.to_text());
        self.store.notify_conn_state(state);
    }

    async fn get_info(&self) -> Result<InfoResponse> {
        let url = self.printer_cfg.info_url();
        debug!("GET {}", url);

        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            bail!("GET /info returned HTTP {}", resp.status());
        }

        Ok(resp.json().await?)
    }
}

/// Ingests frames until the peer closes or errors. The wait for each frame is
/// bounded by `recv_poll` so the heartbeat check also runs on a quiet socket.
async fn recv_loop<St, Si>(
    store: &StateStore,
    timings: &ClientTimings,
    mut stream: St,
    sink: &tokio::sync::Mutex<Si>,
) -> Result<()>
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    Si: Sink<Message> + Unpin,
{
    let mut last_ping = Instant::now();
    loop {
        match tokio::time::timeout(timings.recv_poll, stream.next()).await {
            Ok(Some(Ok(msg))) => match parse::parse_message(msg) {
                Frame::Update(m) => store.ingest(&m),
                Frame::Dropped | Frame::Ignored => {}
                Frame::Closed => return Ok(()),
            },
            Ok(Some(Err(e))) => return Err(anyhow::Error::new(e).context("websocket receive failed")),
            Ok(None) => return Ok(()),
            Err(_) => {}
        }

        if last_ping.elapsed() > timings.heartbeat {
            // best effort, never wait on the send loop
            match sink.try_lock() {
                Ok(mut sink) => {
                    let ping = sink.send(Message::Ping(Vec::new()));
                    match tokio::time::timeout(timings.recv_poll, ping).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) => trace!("heartbeat send failed"),
                        Err(_) => trace!("heartbeat send timed out"),
                    }
                }
                Err(_) => trace!("sink busy, skipping heartbeat"),
            }
            last_ping = Instant::now();
        }
    }
}

/// Writes queued envelopes one at a time. A failed write drops that envelope
/// and moves on to the next.
async fn send_loop<Si>(queue: &CommandQueue, sink: &tokio::sync::Mutex<Si>) -> Result<()>
where
    Si: Sink<Message> + Unpin,
    Si::Error: std::fmt::Display,
{
    while let Some(envelope) = queue.pop().await {
        let text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to encode command: {}", e);
                continue;
            }
        };
        let res = sink.lock().await.send(Message::Text(text)).await;
        match res {
            Ok(()) => debug!("WS -> {:?}", envelope),
            Err(e) => debug!("failed to send WS cmd: {}", e),
        }
    }
    Ok(())
}
