#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use std::{collections::HashMap, env, path::Path};

use creality_watcher::{
    conn_manager::{ChannelListener, WorkerMsg},
    logging,
    status::fields,
    AppConfig, CrealityClient, DeviceState, PrinterId, PrinterState,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let _log_guard = logging::init_logs();

    let config = load_config()?;
    ensure!(!config.is_empty(), "no printers configured");

    let (msg_tx, mut msg_rx) = tokio::sync::mpsc::unbounded_channel::<(PrinterId, WorkerMsg)>();

    let mut clients: HashMap<PrinterId, CrealityClient> = HashMap::new();
    let mut names: HashMap<PrinterId, String> = HashMap::new();
    for printer in config.printers() {
        let id = printer.id.clone();
        let client = CrealityClient::new(printer.clone())?;
        client.add_listener(ChannelListener::new(id.clone(), msg_tx.clone()));
        client.start();

        let identity = client.fetch_info().await;
        info!(
            "watching {} ({}) at {}, unique id {}",
            printer.name,
            identity.display_model(),
            printer.host,
            identity.unique_id
        );

        names.insert(id.clone(), printer.name.clone());
        clients.insert(id, client);
    }
    drop(msg_tx);

    let mut last_status: HashMap<PrinterId, PrinterState> = HashMap::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            msg = msg_rx.recv() => {
                let Some((id, msg)) = msg else {
                    break;
                };
                let name = names.get(&id).map(String::as_str).unwrap_or("?");
                handle_msg(name, &id, msg, &mut last_status);
            }
            res = &mut shutdown => {
                if let Err(e) = res {
                    error!("failed to listen for ctrl-c: {:?}", e);
                }
                info!("shutting down");
                break;
            }
        }
    }

    for (_, client) in clients.iter() {
        client.stop().await;
    }

    Ok(())
}

/// `CREALITY_CONFIG`, then `config.toml`, then `CREALITY_HOST`
fn load_config() -> Result<AppConfig> {
    if let Ok(path) = env::var("CREALITY_CONFIG") {
        return AppConfig::load_from_file(path);
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return AppConfig::load_from_file(DEFAULT_CONFIG_PATH);
    }
    AppConfig::from_env().context("no config file found and CREALITY_HOST not set")
}

fn handle_msg(
    name: &str,
    id: &PrinterId,
    msg: WorkerMsg,
    last_status: &mut HashMap<PrinterId, PrinterState>,
) {
    match msg {
        WorkerMsg::StatusUpdate(state) => {
            let status = state.status();
            if last_status.insert(id.clone(), status) != Some(status) {
                if status.is_error() {
                    warn!(
                        "{}: {} (errcode {}, level {})",
                        name,
                        status.to_text(),
                        state.error.code,
                        state.error.level
                    );
                } else {
                    info!("{}: {}", name, status.to_text());
                }
                log_materials(name, &state);
            }
            debug!("{}: {}", name, fields::summary(&state));
        }
        WorkerMsg::Connecting => debug!("{}: connecting", name),
        WorkerMsg::Connected => info!("{}: connected", name),
        WorkerMsg::Reconnecting => warn!("{}: connection lost", name),
        WorkerMsg::Disconnected => debug!("{}: disconnected", name),
    }
}

fn log_materials(name: &str, state: &DeviceState) {
    let Some(boxes) = state.material_boxes.as_ref() else {
        return;
    };
    for b in boxes.cfs_boxes() {
        let slots = b
            .slots
            .iter()
            .flatten()
            .map(|s| {
                format!(
                    "{}:{} {} {}%",
                    s.id,
                    s.material_type,
                    s.color_hex().unwrap_or_default(),
                    s.percent.unwrap_or(0)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "{}: CFS {} temp={:?} humidity={:?} [{}]",
            name, b.id, b.temp, b.humidity, slots
        );
    }
}
