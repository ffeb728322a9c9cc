use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Set,
    Get,
}

/// Outbound frame: `{"method": "set"|"get", "params": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub method: Method,
    pub params: Map<String, Value>,
}

impl CommandEnvelope {
    pub fn new(method: Method, params: Map<String, Value>) -> Self {
        Self { method, params }
    }

    pub fn set(params: Map<String, Value>) -> Self {
        Self::new(Method::Set, params)
    }

    /// `{"method": "get", "params": {"boxsInfo": 1}}`
    pub fn boxs_info() -> Self {
        let mut params = Map::new();
        params.insert("boxsInfo".to_string(), Value::from(1));
        Self::new(Method::Get, params)
    }
}

/// Response body of `GET /info`
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct InfoResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
}

/// Device identity, from `/info` or the configured host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub model: Option<String>,
    pub mac: Option<String>,
    /// mac when known, otherwise the host
    pub unique_id: String,
}

impl Identity {
    pub fn from_host(host: &str) -> Self {
        Self {
            model: None,
            mac: None,
            unique_id: host.to_string(),
        }
    }

    pub fn from_info(info: InfoResponse, host: &str) -> Self {
        let mac = info.mac.filter(|m| !m.trim().is_empty());
        let unique_id = mac.clone().unwrap_or_else(|| host.to_string());
        Self {
            model: info.model.filter(|m| !m.trim().is_empty()),
            mac,
            unique_id,
        }
    }

    pub fn display_model(&self) -> &str {
        self.model.as_deref().unwrap_or("Creality Printer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_wire_shape() {
        let env = CommandEnvelope::boxs_info();
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"method": "get", "params": {"boxsInfo": 1}})
        );

        let mut params = Map::new();
        params.insert("lightSw".to_string(), json!(1));
        assert_eq!(
            serde_json::to_value(CommandEnvelope::set(params)).unwrap(),
            json!({"method": "set", "params": {"lightSw": 1}})
        );
    }

    #[test]
    fn identity_prefers_mac() {
        let info: InfoResponse =
            serde_json::from_value(json!({"model": "K1 Max", "mac": "aa:bb:cc", "extra": 1}))
                .unwrap();
        let id = Identity::from_info(info, "10.0.0.5");
        assert_eq!(id.unique_id, "aa:bb:cc");
        assert_eq!(id.display_model(), "K1 Max");

        let id = Identity::from_info(InfoResponse::default(), "10.0.0.5");
        assert_eq!(id.unique_id, "10.0.0.5");
        assert_eq!(id.display_model(), "Creality Printer");
    }
}
