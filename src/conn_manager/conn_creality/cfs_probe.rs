//! Materials box detection.
//!
//! Not every printer has a materials box, and the ones that do only report it
//! when asked. Each connection asks a few times; if an answer shows up the
//! probe turns into a periodic refresh, otherwise the box is marked
//! unsupported until the next connection.

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::printer_config::CfsProbeTimings,
    conn_manager::command_queue::CommandQueue,
    status::{FeatureStatus, StateStore},
};

/// Only returns when the box stays silent; after a detection it keeps
/// re-requesting until dropped along with the connection.
pub(crate) async fn probe_materials_box(
    store: &StateStore,
    queue: &CommandQueue,
    timings: &CfsProbeTimings,
) -> FeatureStatus {
    if !wait_for_detection(store, queue, timings).await {
        let status = store.mark_cfs_unsupported();
        if status == FeatureStatus::Unsupported {
            info!("materials box not detected, disabling polling");
            return status;
        }
    }

    info!(
        "materials box present, refreshing every {:?}",
        timings.refresh_interval
    );
    refresh_loop(queue, timings).await
}

async fn wait_for_detection(
    store: &StateStore,
    queue: &CommandQueue,
    timings: &CfsProbeTimings,
) -> bool {
    for attempt in 1..=timings.attempts {
        debug!("materials box probe attempt {}/{}", attempt, timings.attempts);
        queue.request_boxs_info();
        for _ in 0..timings.polls_per_attempt {
            if store.cfs_support() == FeatureStatus::Detected {
                return true;
            }
            tokio::time::sleep(timings.poll_interval).await;
        }
        if store.cfs_support() == FeatureStatus::Detected {
            return true;
        }
    }
    false
}

async fn refresh_loop(queue: &CommandQueue, timings: &CfsProbeTimings) -> FeatureStatus {
    let mut timer = tokio::time::interval_at(
        tokio::time::Instant::now() + timings.refresh_interval,
        timings.refresh_interval,
    );
    loop {
        timer.tick().await;
        trace!("refreshing materials box info");
        queue.request_boxs_info();
    }
}
