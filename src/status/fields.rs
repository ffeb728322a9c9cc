//! Printer fields exposed to display layers.
//!
//! A single table of `(key, accessor)` pairs, so front ends iterate it instead
//! of defining one type per sensor.

use serde::Serialize;

use super::DeviceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    Celsius,
    Percent,
    Seconds,
}

impl Unit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Percent => "%",
            Unit::Seconds => "s",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Int(i64),
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{:.1}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

pub struct FieldDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<Unit>,
    pub get: fn(&DeviceState) -> Option<FieldValue>,
}

impl FieldDescriptor {
    pub fn value(&self, state: &DeviceState) -> Option<FieldValue> {
        (self.get)(state)
    }

    pub fn render(&self, state: &DeviceState) -> String {
        match (self.value(state), self.unit) {
            (Some(v), Some(unit)) => format!("{}{}", v, unit.suffix()),
            (Some(v), None) => v.to_string(),
            (None, _) => "-".to_string(),
        }
    }
}

pub static PRINTER_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        key: "nozzle_temp",
        name: "Nozzle Temperature",
        unit: Some(Unit::Celsius),
        get: |s| Some(FieldValue::Float(s.temperature.nozzle.value)),
    },
    FieldDescriptor {
        key: "bed_temp",
        name: "Bed Temperature",
        unit: Some(Unit::Celsius),
        get: |s| Some(FieldValue::Float(s.temperature.bed.value)),
    },
    FieldDescriptor {
        key: "chamber_temp",
        name: "Chamber Temperature",
        unit: Some(Unit::Celsius),
        get: |s| Some(FieldValue::Float(s.temperature.chamber.value)),
    },
    FieldDescriptor {
        key: "progress",
        name: "Print Progress",
        unit: Some(Unit::Percent),
        get: |s| Some(FieldValue::Int(s.print_progress)),
    },
    FieldDescriptor {
        key: "time_left",
        name: "Time Remaining",
        unit: Some(Unit::Seconds),
        get: |s| Some(FieldValue::Int(s.print_left_time)),
    },
    FieldDescriptor {
        key: "job_time",
        name: "Time Elapsed",
        unit: Some(Unit::Seconds),
        get: |s| Some(FieldValue::Int(s.print_job_time)),
    },
    FieldDescriptor {
        key: "file",
        name: "Current File",
        unit: None,
        get: |s| {
            (!s.print_file_name.is_empty()).then(|| FieldValue::Text(s.print_file_name.clone()))
        },
    },
    FieldDescriptor {
        key: "state_text",
        name: "State",
        unit: None,
        get: |s| Some(FieldValue::Text(s.status().to_text().to_string())),
    },
    FieldDescriptor {
        key: "state_code",
        name: "State Code",
        unit: None,
        get: |s| s.state.map(FieldValue::Int),
    },
    FieldDescriptor {
        key: "layer",
        name: "Layer",
        unit: None,
        get: |s| s.layer.map(FieldValue::Int),
    },
    FieldDescriptor {
        key: "total_layer",
        name: "Total Layers",
        unit: None,
        get: |s| s.total_layer.map(FieldValue::Int),
    },
];

pub fn field(key: &str) -> Option<&'static FieldDescriptor> {
    PRINTER_FIELDS.iter().find(|f| f.key == key)
}

/// One line summary, `key=value` pairs in table order
pub fn summary(state: &DeviceState) -> String {
    PRINTER_FIELDS
        .iter()
        .map(|f| format!("{}={}", f.key, f.render(state)))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = PRINTER_FIELDS.iter().map(|f| f.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), PRINTER_FIELDS.len());
    }

    #[test]
    fn reads_through_accessors() {
        let mut s = DeviceState::default();
        s.online = true;
        s.merge(
            json!({"nozzleTemp": 210.04, "state": 1, "printFileName": "/usr/data/cube.gcode"})
                .as_object()
                .unwrap(),
            1,
        );

        assert_eq!(field("nozzle_temp").unwrap().render(&s), "210.0°C");
        assert_eq!(field("state_text").unwrap().render(&s), "printing");
        assert_eq!(
            field("file").unwrap().value(&s),
            Some(FieldValue::Text("cube.gcode".to_string()))
        );
        assert_eq!(field("layer").unwrap().render(&s), "-");
        assert!(field("nope").is_none());
    }

    #[test]
    fn summary_lists_every_field() {
        let line = summary(&DeviceState::default());
        for f in PRINTER_FIELDS {
            assert!(line.contains(&format!("{}=", f.key)));
        }
        assert!(line.contains("state_text=offline"));
    }
}
