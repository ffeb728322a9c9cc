use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    cfs::MaterialBoxes,
    normalize::{int, num, opt_int, string},
    FeatureStatus, PrinterState,
};

pub const MAX_NOZZLE_TEMP: f64 = 350.0;
pub const MAX_BED_TEMP: f64 = 120.0;
pub const MAX_CHAMBER_TEMP: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub online: bool,
    /// ms since epoch of the last ingested message, -1 before the first
    pub timestamp: i64,
    /// ms since epoch of the last `boxsInfo`, -1 before the first
    pub box_info_timestamp: i64,
    pub temperature: Temperatures,
    pub print_progress: i64,
    /// seconds
    pub print_left_time: i64,
    /// seconds
    pub print_job_time: i64,
    /// basename only
    pub print_file_name: String,
    pub device_state: Option<Value>,
    pub state: Option<i64>,
    pub layer: Option<i64>,
    pub total_layer: Option<i64>,
    pub controls: Controls,
    pub error: PrinterError,
    pub material_boxes: Option<MaterialBoxes>,
    pub cfs_support: FeatureStatus,
    /// union of every field ever received
    pub raw_fields: Map<String, Value>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            online: false,
            timestamp: -1,
            box_info_timestamp: -1,
            temperature: Temperatures::default(),
            print_progress: 0,
            print_left_time: 0,
            print_job_time: 0,
            print_file_name: String::new(),
            device_state: None,
            state: None,
            layer: None,
            total_layer: None,
            controls: Controls::default(),
            error: PrinterError::default(),
            material_boxes: None,
            cfs_support: FeatureStatus::Unknown,
            raw_fields: Map::new(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct TempReading {
    pub value: f64,
    pub target: f64,
    pub max: f64,
}

impl TempReading {
    fn with_max(max: f64) -> Self {
        Self {
            max,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Temperatures {
    pub nozzle: TempReading,
    pub bed: TempReading,
    pub chamber: TempReading,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            nozzle: TempReading::with_max(MAX_NOZZLE_TEMP),
            bed: TempReading::with_max(MAX_BED_TEMP),
            chamber: TempReading::with_max(MAX_CHAMBER_TEMP),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub feedrate_pct: i64,
    pub fan: i64,
    pub model_fan_pct: i64,
    pub aux_fan_pct: i64,
    pub case_fan_pct: i64,
    pub light_switch: i64,
    pub fan_aux: i64,
    pub fan_case: i64,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            feedrate_pct: 100,
            fan: 0,
            model_fan_pct: 0,
            aux_fan_pct: 0,
            case_fan_pct: 0,
            light_switch: 0,
            fan_aux: 0,
            fan_case: 0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrinterError {
    pub code: i64,
    pub key: i64,
    pub level: i64,
}

/// MARK: merge
impl DeviceState {
    /// Applies one inbound message. Keys absent from `r` leave their fields untouched.
    ///
    /// Returns true when this message is the first materials box payload of the
    /// current connection.
    pub fn merge(&mut self, r: &Map<String, Value>, now_ms: i64) -> bool {
        self.timestamp = self.timestamp.max(now_ms);

        let mut cfs_detected = false;
        if let Some(info) = r.get("boxsInfo") {
            self.material_boxes = Some(MaterialBoxes::from_value(info));
            self.box_info_timestamp = self.box_info_timestamp.max(self.timestamp);
            if self.cfs_support == FeatureStatus::Unknown {
                self.cfs_support = FeatureStatus::Detected;
                cfs_detected = true;
            }
        }

        if let Some(v) = r.get("printProgress") {
            self.print_progress = int(v, 0);
        }
        if let Some(v) = r.get("printLeftTime") {
            self.print_left_time = int(v, 0);
        }
        if let Some(v) = r.get("printJobTime") {
            self.print_job_time = int(v, 0);
        }
        if let Some(v) = r.get("printFileName") {
            self.print_file_name = basename(&string(v)).to_string();
        }
        if let Some(v) = r.get("deviceState") {
            self.device_state = Some(v.clone());
        }
        if let Some(v) = r.get("state") {
            self.state = opt_int(v);
        }
        if let Some(v) = r.get("layer") {
            self.layer = opt_int(v);
        }
        if let Some(v) = r.get("TotalLayer") {
            self.total_layer = opt_int(v);
        }

        self.temperature.merge(r);
        self.controls.merge(r);
        if let Some(Value::Object(err)) = r.get("err") {
            self.error.merge(err);
        }

        for (k, v) in r {
            self.raw_fields.insert(k.clone(), v.clone());
        }

        cfs_detected
    }
}

impl Temperatures {
    pub fn merge(&mut self, r: &Map<String, Value>) {
        let fields: [(&str, &mut f64, f64); 7] = [
            ("nozzleTemp", &mut self.nozzle.value, 0.0),
            ("bedTemp0", &mut self.bed.value, 0.0),
            ("boxTemp", &mut self.chamber.value, 0.0),
            ("targetNozzleTemp", &mut self.nozzle.target, 0.0),
            ("targetBedTemp0", &mut self.bed.target, 0.0),
            ("maxNozzleTemp", &mut self.nozzle.max, MAX_NOZZLE_TEMP),
            ("maxBedTemp", &mut self.bed.max, MAX_BED_TEMP),
        ];
        for (key, field, default) in fields {
            if let Some(v) = r.get(key) {
                *field = num(v, default);
            }
        }
    }
}

impl Controls {
    pub fn merge(&mut self, r: &Map<String, Value>) {
        let fields: [(&str, &mut i64, i64); 8] = [
            ("curFeedratePct", &mut self.feedrate_pct, 100),
            ("fan", &mut self.fan, 0),
            ("modelFanPct", &mut self.model_fan_pct, 0),
            ("auxiliaryFanPct", &mut self.aux_fan_pct, 0),
            ("caseFanPct", &mut self.case_fan_pct, 0),
            ("lightSw", &mut self.light_switch, 0),
            ("fanAuxiliary", &mut self.fan_aux, 0),
            ("fanCase", &mut self.fan_case, 0),
        ];
        for (key, field, default) in fields {
            if let Some(v) = r.get(key) {
                *field = int(v, default);
            }
        }
    }

    pub fn light_on(&self) -> bool {
        self.light_switch == 1
    }

    pub fn model_fan_on(&self) -> bool {
        self.fan == 1 || self.model_fan_pct > 0
    }

    pub fn aux_fan_on(&self) -> bool {
        self.fan_aux == 1 || self.aux_fan_pct > 0
    }

    pub fn case_fan_on(&self) -> bool {
        self.fan_case == 1 || self.case_fan_pct > 0
    }
}

impl PrinterError {
    pub fn merge(&mut self, err: &Map<String, Value>) {
        if let Some(v) = err.get("errcode") {
            self.code = int(v, 0);
        }
        if let Some(v) = err.get("key") {
            self.key = int(v, 0);
        }
        if let Some(v) = err.get("errLevel") {
            self.level = int(v, 0);
        }
    }

    pub fn is_set(&self) -> bool {
        self.code != 0
    }
}

/// getters
impl DeviceState {
    pub fn status(&self) -> PrinterState {
        if !self.online {
            return PrinterState::Offline;
        }
        PrinterState::from_code(self.state)
    }

    pub fn is_printing(&self) -> bool {
        self.state == Some(1)
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.raw_fields.get(key)
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
