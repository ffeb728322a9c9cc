use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use super::conn_creality::creality_types::{CommandEnvelope, Method};

/// Unbounded FIFO of outbound envelopes.
///
/// Any number of producers; the connection's send loop is the only consumer.
/// Survives reconnects, so commands queued while offline go out on the next
/// connection.
#[derive(Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<CommandEnvelope>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<CommandEnvelope>>>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Never blocks; failures are logged only.
    pub fn enqueue(&self, method: Method, params: Map<String, Value>) {
        self.push(CommandEnvelope::new(method, params));
    }

    pub fn push(&self, envelope: CommandEnvelope) {
        if let Err(e) = self.tx.send(envelope) {
            debug!("command queue closed, dropping {:?}", e.0);
        }
    }

    pub fn send_cmd(&self, params: Map<String, Value>) {
        self.enqueue(Method::Set, params);
    }

    pub fn request_boxs_info(&self) {
        self.push(CommandEnvelope::boxs_info());
    }

    /// Waits for the next envelope. Cancel safe.
    pub async fn pop(&self) -> Option<CommandEnvelope> {
        self.rx.lock().await.recv().await
    }

    pub fn try_pop(&self) -> Option<CommandEnvelope> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn fifo_across_producers() {
        let queue = CommandQueue::new();
        let producer = queue.clone();

        producer.send_cmd(params(json!({"lightSw": 1})));
        queue.request_boxs_info();
        producer.send_cmd(params(json!({"fan": 0})));

        let first = queue.pop().await.unwrap();
        assert_eq!(first.method, Method::Set);
        assert_eq!(first.params, params(json!({"lightSw": 1})));
        assert_eq!(queue.pop().await.unwrap(), CommandEnvelope::boxs_info());
        assert_eq!(queue.pop().await.unwrap().params, params(json!({"fan": 0})));
        assert!(queue.try_pop().is_none());
    }

    #[tokio::test]
    async fn pop_waits_for_producer() {
        let queue = CommandQueue::new();
        let producer = queue.clone();
        let handle = tokio::spawn(async move { queue.pop().await });

        tokio::task::yield_now().await;
        producer.send_cmd(params(json!({"fanCase": 1})));

        let env = handle.await.unwrap().unwrap();
        assert_eq!(env.params, params(json!({"fanCase": 1})));
    }
}
