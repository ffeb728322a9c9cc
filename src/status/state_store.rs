use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use super::{DeviceState, FeatureStatus};
use crate::conn_manager::ConnState;

/// Observer for state changes.
///
/// Called synchronously from the connection task, once per merge and in
/// registration order. Errors and panics are logged and do not reach the
/// other listeners.
pub trait StateListener: Send + Sync {
    fn on_change(&self, state: &DeviceState) -> Result<()>;

    fn on_conn_state(&self, _conn: ConnState) -> Result<()> {
        Ok(())
    }
}

impl<F> StateListener for F
where
    F: Fn(&DeviceState) -> Result<()> + Send + Sync,
{
    fn on_change(&self, state: &DeviceState) -> Result<()> {
        self(state)
    }
}

/// Shared device snapshot. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct StateStore {
    state: Arc<RwLock<DeviceState>>,
    listeners: Arc<RwLock<Vec<Arc<dyn StateListener>>>>,
}

/// reads
impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DeviceState {
        self.state.read().clone()
    }

    pub fn is_online(&self) -> bool {
        self.state.read().online
    }

    pub fn cfs_support(&self) -> FeatureStatus {
        self.state.read().cfs_support
    }
}

/// writes
impl StateStore {
    /// Merges one decoded message and notifies listeners.
    pub fn ingest(&self, msg: &Map<String, Value>) {
        let now = chrono::Utc::now().timestamp_millis();
        let detected = self.state.write().merge(msg, now);
        if detected {
            info!("materials box detected");
        }
        self.notify();
    }

    /// Start of a connection epoch: online, materials box support unknown again.
    pub fn begin_epoch(&self) {
        {
            let mut state = self.state.write();
            state.online = true;
            state.cfs_support = FeatureStatus::Unknown;
        }
        self.notify();
    }

    pub fn set_online(&self, online: bool) {
        self.set_online_silent(online);
        self.notify();
    }

    /// Used during shutdown, after which listeners must not be called
    pub(crate) fn set_online_silent(&self, online: bool) {
        self.state.write().online = online;
    }

    /// Only moves `Unknown` to `Unsupported`, a late detection wins.
    pub fn mark_cfs_unsupported(&self) -> FeatureStatus {
        let mut state = self.state.write();
        if state.cfs_support == FeatureStatus::Unknown {
            state.cfs_support = FeatureStatus::Unsupported;
        }
        state.cfs_support
    }
}

/// listeners
impl StateStore {
    pub fn add_listener(&self, listener: impl StateListener + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    pub fn notify(&self) {
        let listeners = self.listeners.read().clone();
        if listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (i, listener) in listeners.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| listener.on_change(&snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("state listener {} failed: {:?}", i, e),
                Err(_) => error!("state listener {} panicked", i),
            }
        }
    }

    pub(crate) fn notify_conn_state(&self, conn: ConnState) {
        let listeners = self.listeners.read().clone();
        for (i, listener) in listeners.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| listener.on_conn_state(conn))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("state listener {} failed: {:?}", i, e),
                Err(_) => error!("state listener {} panicked", i),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn msg(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn listeners_run_in_order_once_per_merge() {
        let store = StateStore::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["a", "b", "c"] {
            let calls = calls.clone();
            store.add_listener(move |_: &DeviceState| -> Result<()> {
                calls.lock().push(name);
                Ok(())
            });
        }

        store.ingest(&msg(json!({"fan": 1})));
        store.ingest(&msg(json!({"fan": 0})));
        assert_eq!(*calls.lock(), vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn failing_listeners_do_not_stop_others() {
        let store = StateStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        store.add_listener(|_: &DeviceState| -> Result<()> { bail!("nope") });
        store.add_listener(|_: &DeviceState| -> Result<()> { panic!("listener bug") });
        {
            let seen = seen.clone();
            store.add_listener(move |s: &DeviceState| -> Result<()> {
                seen.lock().push(s.print_progress);
                Ok(())
            });
        }

        store.ingest(&msg(json!({"printProgress": 40})));
        store.ingest(&msg(json!({"printProgress": 41})));
        assert_eq!(*seen.lock(), vec![40, 41]);
        assert_eq!(store.snapshot().print_progress, 41);
    }

    #[test]
    fn listener_sees_post_merge_state() {
        let store = StateStore::new();
        let seen = Arc::new(Mutex::new(None));
        {
            let seen = seen.clone();
            store.add_listener(move |s: &DeviceState| -> Result<()> {
                *seen.lock() = Some((s.temperature.nozzle.value, s.temperature.nozzle.target));
                Ok(())
            });
        }
        store.ingest(&msg(json!({"nozzleTemp": 200, "targetNozzleTemp": 210})));
        assert_eq!(*seen.lock(), Some((200.0, 210.0)));
    }

    #[test]
    fn concurrent_reads_never_see_half_a_merge() {
        let store = StateStore::new();
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..2000 {
                    store.ingest(&msg(json!({"nozzleTemp": i, "targetNozzleTemp": i})));
                }
            })
        };
        for _ in 0..2000 {
            let s = store.snapshot();
            assert_eq!(s.temperature.nozzle.value, s.temperature.nozzle.target);
        }
        writer.join().unwrap();
    }

    #[test]
    fn epoch_resets_cfs_support() {
        let store = StateStore::new();
        store.begin_epoch();
        assert!(store.is_online());
        store.ingest(&msg(json!({"boxsInfo": {"materialBoxs": []}})));
        assert_eq!(store.cfs_support(), FeatureStatus::Detected);

        // a late unsupported verdict does not override detection
        assert_eq!(store.mark_cfs_unsupported(), FeatureStatus::Detected);

        store.set_online(false);
        store.begin_epoch();
        assert_eq!(store.cfs_support(), FeatureStatus::Unknown);
        assert_eq!(store.mark_cfs_unsupported(), FeatureStatus::Unsupported);
        // payload is kept across epochs
        assert!(store.snapshot().material_boxes.is_some());
    }
}
