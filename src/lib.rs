#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod config;
pub mod conn_manager;
pub mod logging;
pub mod status;

pub use config::{
    printer_config::{ClientTimings, PrinterConfigCreality},
    printer_id::PrinterId,
    AppConfig,
};
pub use conn_manager::{
    conn_creality::{
        creality_commands::CrealityCmd,
        creality_types::{CommandEnvelope, Identity, Method},
    },
    ConnState, CrealityClient, WorkerMsg,
};
pub use status::{DeviceState, FeatureStatus, PrinterState, StateListener, StateStore};
