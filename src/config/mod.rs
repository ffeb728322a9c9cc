pub mod printer_config;
pub mod printer_id;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use std::{path::Path, sync::Arc};

use crate::config::{printer_config::PrinterConfigCreality, printer_id::PrinterId};

#[derive(Clone)]
pub struct AppConfig {
    /// insertion order, for stable output
    ids: Arc<RwLock<Vec<PrinterId>>>,
    printers: Arc<DashMap<PrinterId, PrinterConfigCreality>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    printers: Vec<PrinterConfigCreality>,
}

/// load
impl AppConfig {
    pub fn empty() -> Self {
        Self {
            ids: Arc::new(RwLock::new(Vec::new())),
            printers: Arc::new(DashMap::new()),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        let out = Self::empty();
        for printer in file.printers {
            out.add_printer(printer)?;
        }
        Ok(out)
    }

    /// `CREALITY_HOST` is required, `CREALITY_NAME` and `CREALITY_ID` are optional
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("CREALITY_HOST").context("CREALITY_HOST not set")?;
        let name = std::env::var("CREALITY_NAME").unwrap_or_else(|_| format!("Creality {}", host));
        let id = std::env::var("CREALITY_ID")
            .map(PrinterId::from)
            .unwrap_or_else(|_| PrinterId::generate());

        let out = Self::empty();
        out.add_printer(PrinterConfigCreality::from_id(name, host, id))?;
        Ok(out)
    }
}

impl AppConfig {
    pub fn add_printer(&self, mut config: PrinterConfigCreality) -> Result<PrinterId> {
        ensure!(!config.host.trim().is_empty(), "printer host is empty");
        config.host = config.host.trim().to_string();
        if config.id.is_empty() {
            config.id = PrinterId::generate();
        }

        let id = config.id.clone();
        let mut ids = self.ids.write();
        if ids.contains(&id) {
            bail!("printer already exists: {}", id);
        }
        ids.push(id.clone());
        self.printers.insert(id.clone(), config);
        debug!("added printer {}", id);
        Ok(id)
    }

    pub fn printer_ids(&self) -> Vec<PrinterId> {
        self.ids.read().clone()
    }

    pub fn printers(&self) -> Vec<PrinterConfigCreality> {
        self.printer_ids()
            .iter()
            .filter_map(|id| self.get_printer(id))
            .collect()
    }

    pub fn get_printer(&self, id: &PrinterId) -> Option<PrinterConfigCreality> {
        self.printers.get(id).map(|v| v.value().clone())
    }

    pub fn is_empty(&self) -> bool {
        self.printers.is_empty()
    }
}
