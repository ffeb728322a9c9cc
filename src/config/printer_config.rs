use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::printer_id::PrinterId;

pub const DEFAULT_WS_PORT: u16 = 9999;
pub const DEFAULT_HTTP_PORT: u16 = 80;

fn default_ws_port() -> u16 {
    DEFAULT_WS_PORT
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterConfigCreality {
    #[serde(default = "PrinterId::empty")]
    pub id: PrinterId,
    pub name: String,
    pub host: String,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    /// serves `/info` and the print preview image
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl PrinterConfigCreality {
    pub fn new(name: String, host: String) -> Self {
        Self::from_id(name, host, PrinterId::generate())
    }

    pub fn from_id(name: String, host: String, id: PrinterId) -> Self {
        Self {
            id,
            name,
            host,
            ws_port: DEFAULT_WS_PORT,
            http_port: DEFAULT_HTTP_PORT,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/", self.host, self.ws_port)
    }

    pub fn info_url(&self) -> String {
        format!("http://{}:{}/info", self.host, self.http_port)
    }

    pub fn preview_image_url(&self) -> String {
        format!(
            "http://{}:{}/downloads/original/current_print_image.png",
            self.host, self.http_port
        )
    }
}

/// Materials box probe schedule
#[derive(Debug, Clone, PartialEq)]
pub struct CfsProbeTimings {
    pub attempts: usize,
    pub polls_per_attempt: usize,
    pub poll_interval: Duration,
    /// re-request period once a materials box has answered
    pub refresh_interval: Duration,
}

impl Default for CfsProbeTimings {
    fn default() -> Self {
        Self {
            attempts: 5,
            polls_per_attempt: 10,
            poll_interval: Duration::from_secs(1),
            refresh_interval: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientTimings {
    pub connect_timeout: Duration,
    pub info_timeout: Duration,
    pub heartbeat: Duration,
    /// upper bound on a single receive wait, so the heartbeat check runs on idle sockets
    pub recv_poll: Duration,
    pub backoff: Vec<Duration>,
    pub cfs: CfsProbeTimings,
}

impl Default for ClientTimings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            info_timeout: Duration::from_secs(6),
            heartbeat: Duration::from_secs(10),
            recv_poll: Duration::from_secs(1),
            backoff: [1, 2, 5, 10, 20, 30]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
            cfs: CfsProbeTimings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_use_configured_ports() {
        let mut cfg = PrinterConfigCreality::new("k1".to_string(), "192.168.1.40".to_string());
        assert_eq!(cfg.ws_url(), "ws://192.168.1.40:9999/");
        assert_eq!(cfg.info_url(), "http://192.168.1.40:80/info");

        cfg.http_port = 8081;
        assert_eq!(
            cfg.preview_image_url(),
            "http://192.168.1.40:8081/downloads/original/current_print_image.png"
        );
    }

    #[test]
    fn ports_default_when_missing() {
        let cfg: PrinterConfigCreality = toml::from_str(
            r#"
            name = "k2"
            host = "10.0.0.2"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.ws_port, DEFAULT_WS_PORT);
        assert_eq!(cfg.http_port, DEFAULT_HTTP_PORT);
        assert!(cfg.id.is_empty());
    }
}
