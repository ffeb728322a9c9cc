pub mod backoff;
pub mod command_queue;
pub mod conn_creality;
pub mod worker_message;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use serde::Serialize;

pub use command_queue::CommandQueue;
pub use conn_creality::CrealityClient;
pub use worker_message::{ChannelListener, WorkerMsg};

/// Connection lifecycle, one pass per epoch:
/// `Disconnected -> Connecting -> Connected -> (Closing | Failed) -> Disconnected`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Failed,
}

impl ConnState {
    pub fn to_text(&self) -> &'static str {
        match self {
            ConnState::Disconnected => "disconnected",
            ConnState::Connecting => "connecting",
            ConnState::Connected => "connected",
            ConnState::Closing => "closing",
            ConnState::Failed => "failed",
        }
    }
}
