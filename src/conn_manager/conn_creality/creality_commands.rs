use serde_json::{json, Map, Value};

/// `set` commands understood by the LAN websocket
#[derive(Debug, Clone, PartialEq)]
pub enum CrealityCmd {
    Light(bool),
    ModelFan(bool),
    AuxFan(bool),
    CaseFan(bool),
    /// passed through untouched
    Raw(Map<String, Value>),
}

impl CrealityCmd {
    pub fn to_params(&self) -> Map<String, Value> {
        let switch = |key: &str, on: bool| {
            let mut m = Map::new();
            m.insert(key.to_string(), json!(on as i64));
            m
        };
        match self {
            CrealityCmd::Light(on) => switch("lightSw", *on),
            CrealityCmd::ModelFan(on) => switch("fan", *on),
            CrealityCmd::AuxFan(on) => switch("fanAuxiliary", *on),
            CrealityCmd::CaseFan(on) => switch("fanCase", *on),
            CrealityCmd::Raw(params) => params.clone(),
        }
    }
}
