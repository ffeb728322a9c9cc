use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use tokio::sync::mpsc::UnboundedSender;

use super::ConnState;
use crate::{
    config::printer_id::PrinterId,
    status::{DeviceState, StateListener},
};

#[derive(Debug, Clone)]
pub enum WorkerMsg {
    StatusUpdate(Box<DeviceState>),

    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

impl From<ConnState> for WorkerMsg {
    fn from(state: ConnState) -> Self {
        match state {
            ConnState::Connecting => WorkerMsg::Connecting,
            ConnState::Connected => WorkerMsg::Connected,
            ConnState::Closing | ConnState::Failed => WorkerMsg::Reconnecting,
            ConnState::Disconnected => WorkerMsg::Disconnected,
        }
    }
}

/// Forwards state changes into a channel, tagged with the printer id
pub struct ChannelListener {
    id: PrinterId,
    tx: UnboundedSender<(PrinterId, WorkerMsg)>,
}

impl ChannelListener {
    pub fn new(id: PrinterId, tx: UnboundedSender<(PrinterId, WorkerMsg)>) -> Self {
        Self { id, tx }
    }

    fn send(&self, msg: WorkerMsg) -> Result<()> {
        self.tx
            .send((self.id.clone(), msg))
            .map_err(|_| anyhow!("worker channel closed for {}", self.id))
    }
}

impl StateListener for ChannelListener {
    fn on_change(&self, state: &DeviceState) -> Result<()> {
        self.send(WorkerMsg::StatusUpdate(Box::new(state.clone())))
    }

    fn on_conn_state(&self, conn: ConnState) -> Result<()> {
        self.send(conn.into())
    }
}
