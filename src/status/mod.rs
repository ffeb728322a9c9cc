pub mod cfs;
pub mod creality_status;
pub mod fields;
pub mod normalize;
pub mod state_store;

pub use creality_status::DeviceState;
pub use state_store::{StateListener, StateStore};

use serde::Serialize;

/// Printer status as shown to users, derived from the raw `state` code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrinterState {
    Unknown,
    Offline,
    Idle,
    Printing,
    Complete,
    Failed,
    Abort,
    Paused,
    Pausing,
    Stopping,
    Restoring,
}

impl Default for PrinterState {
    fn default() -> Self {
        PrinterState::Unknown
    }
}

impl PrinterState {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            None => PrinterState::Unknown,
            Some(-1) => PrinterState::Offline,
            Some(0) => PrinterState::Idle,
            Some(1) => PrinterState::Printing,
            Some(2) => PrinterState::Complete,
            Some(3) => PrinterState::Failed,
            Some(4) => PrinterState::Abort,
            Some(5) => PrinterState::Paused,
            Some(6) => PrinterState::Pausing,
            Some(7) => PrinterState::Stopping,
            Some(8) => PrinterState::Restoring,
            Some(_) => PrinterState::Unknown,
        }
    }

    pub fn to_text(&self) -> &'static str {
        match self {
            PrinterState::Unknown => "unknown",
            PrinterState::Offline => "offline",
            PrinterState::Idle => "idle",
            PrinterState::Printing => "printing",
            PrinterState::Complete => "complete",
            PrinterState::Failed => "failed",
            PrinterState::Abort => "abort",
            PrinterState::Paused => "paused",
            PrinterState::Pausing => "pausing",
            PrinterState::Stopping => "stopping",
            PrinterState::Restoring => "restoring",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PrinterState::Failed | PrinterState::Abort)
    }
}

/// Whether the optional materials box answered during the current connection
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureStatus {
    #[default]
    Unknown,
    Detected,
    Unsupported,
}
