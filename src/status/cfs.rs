//! Materials box ("CFS") payload, as reported under `boxsInfo`.

use serde::Serialize;
use serde_json::Value;

use super::normalize::{int, num, opt_int, opt_string, string};

pub const SLOTS_PER_BOX: usize = 4;

/// `type` of a real materials box; other types are spool holders
pub const BOX_TYPE_CFS: i64 = 0;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct MaterialBoxes {
    pub boxes: Vec<MaterialBox>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct MaterialBox {
    pub id: i64,
    pub box_type: i64,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub slots: [Option<MaterialSlot>; SLOTS_PER_BOX],
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct MaterialSlot {
    pub id: usize,
    pub name: String,
    pub vendor: String,
    pub material_type: String,
    /// as sent by the printer, see [`MaterialSlot::color_hex`]
    pub color: String,
    pub percent: Option<i64>,
    pub state: Option<i64>,
    pub selected: Option<i64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub rfid: Option<String>,
}

impl MaterialBoxes {
    /// Never fails, malformed entries are skipped.
    pub fn from_value(v: &Value) -> Self {
        let boxes = v
            .get("materialBoxs")
            .and_then(Value::as_array)
            .map(|boxes| boxes.iter().filter_map(MaterialBox::from_value).collect())
            .unwrap_or_default();
        Self { boxes }
    }

    pub fn cfs_boxes(&self) -> impl Iterator<Item = &MaterialBox> {
        self.boxes.iter().filter(|b| b.is_cfs())
    }

    pub fn cfs_box(&self, box_id: i64) -> Option<&MaterialBox> {
        self.cfs_boxes().find(|b| b.id == box_id)
    }

    pub fn selected_slot(&self) -> Option<(&MaterialBox, &MaterialSlot)> {
        self.cfs_boxes().find_map(|b| {
            b.slots
                .iter()
                .flatten()
                .find(|s| s.selected == Some(1))
                .map(|s| (b, s))
        })
    }
}

impl MaterialBox {
    fn from_value(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let id = opt_int(obj.get("id")?)?;

        let mut slots: [Option<MaterialSlot>; SLOTS_PER_BOX] = Default::default();
        if let Some(materials) = obj.get("materials").and_then(Value::as_array) {
            for m in materials {
                let Some(slot) = MaterialSlot::from_value(m) else {
                    continue;
                };
                if slot.id < SLOTS_PER_BOX {
                    let idx = slot.id;
                    slots[idx] = Some(slot);
                }
            }
        }

        Some(Self {
            id,
            box_type: obj.get("type").map(|t| int(t, -1)).unwrap_or(-1),
            temp: obj.get("temp").map(|t| num(t, f64::NAN)).filter(|t| t.is_finite()),
            humidity: obj
                .get("humidity")
                .map(|h| num(h, f64::NAN))
                .filter(|h| h.is_finite()),
            slots,
        })
    }

    pub fn is_cfs(&self) -> bool {
        self.box_type == BOX_TYPE_CFS
    }

    pub fn slot(&self, slot_id: usize) -> Option<&MaterialSlot> {
        self.slots.get(slot_id).and_then(Option::as_ref)
    }
}

impl MaterialSlot {
    fn from_value(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let id = usize::try_from(opt_int(obj.get("id")?)?).ok()?;

        let text = |k: &str| obj.get(k).map(string).unwrap_or_default();
        let opt_num = |k: &str| {
            obj.get(k)
                .map(|t| num(t, f64::NAN))
                .filter(|t| t.is_finite())
        };

        Some(Self {
            id,
            name: text("name"),
            vendor: text("vendor"),
            material_type: text("type"),
            color: text("color"),
            percent: obj.get("percent").and_then(opt_int),
            state: obj.get("state").and_then(opt_int),
            selected: obj.get("selected").and_then(opt_int),
            min_temp: opt_num("minTemp"),
            max_temp: opt_num("maxTemp"),
            rfid: obj.get("rfid").and_then(opt_string),
        })
    }

    /// Firmware sends colours like `0ffffff`; keep the last six hex digits.
    pub fn color_hex(&self) -> Option<String> {
        let c = self.color.trim();
        if c.is_empty() {
            return None;
        }
        if c.starts_with('#') {
            return Some(c.to_string());
        }
        match c.len() {
            6..=8 => c
                .get(c.len() - 6..)
                .map(|tail| format!("#{}", tail))
                .or_else(|| Some(c.to_string())),
            _ => Some(c.to_string()),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected == Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "materialBoxs": [
                {
                    "id": 0,
                    "type": 1,
                    "materials": [{"id": 0, "name": "ext", "type": "PLA"}]
                },
                {
                    "id": 1,
                    "type": 0,
                    "temp": "27",
                    "humidity": 41,
                    "materials": [
                        {
                            "id": 0, "name": "Hyper PLA", "vendor": "Creality",
                            "type": "PLA", "color": "0ffffff", "percent": 90,
                            "state": 1, "selected": 0, "minTemp": 190, "maxTemp": 230,
                            "rfid": "0276"
                        },
                        {"id": 2, "name": "CR-PETG", "type": "PETG", "color": "#09ea7ae", "selected": 1},
                        {"id": 7, "name": "bogus"},
                        "garbage"
                    ]
                },
                {"type": 0}
            ]
        })
    }

    #[test]
    fn parses_boxes_and_slots() {
        let boxes = MaterialBoxes::from_value(&sample());
        assert_eq!(boxes.boxes.len(), 2);

        let cfs: Vec<_> = boxes.cfs_boxes().collect();
        assert_eq!(cfs.len(), 1);

        let b = boxes.cfs_box(1).unwrap();
        assert_eq!(b.temp, Some(27.0));
        assert_eq!(b.humidity, Some(41.0));

        let s0 = b.slot(0).unwrap();
        assert_eq!(s0.vendor, "Creality");
        assert_eq!(s0.material_type, "PLA");
        assert_eq!(s0.percent, Some(90));
        assert_eq!(s0.min_temp, Some(190.0));
        assert_eq!(s0.rfid.as_deref(), Some("0276"));

        assert!(b.slot(1).is_none());
        assert!(b.slot(2).is_some());
        assert!(b.slot(7).is_none());
    }

    #[test]
    fn spool_holder_is_not_cfs() {
        let boxes = MaterialBoxes::from_value(&sample());
        assert!(boxes.cfs_box(0).is_none());
    }

    #[test]
    fn finds_selected_slot() {
        let boxes = MaterialBoxes::from_value(&sample());
        let (b, s) = boxes.selected_slot().unwrap();
        assert_eq!(b.id, 1);
        assert_eq!(s.name, "CR-PETG");
        assert!(s.is_selected());
    }

    #[test]
    fn color_normalization() {
        let slot = |c: &str| MaterialSlot {
            color: c.to_string(),
            ..Default::default()
        };
        assert_eq!(slot("0ffffff").color_hex().as_deref(), Some("#ffffff"));
        assert_eq!(slot("ff0000").color_hex().as_deref(), Some("#ff0000"));
        assert_eq!(slot("#09ea7ae").color_hex().as_deref(), Some("#09ea7ae"));
        assert_eq!(slot("abc").color_hex().as_deref(), Some("abc"));
        assert_eq!(slot("").color_hex(), None);
    }

    #[test]
    fn non_object_payload_is_empty() {
        assert!(MaterialBoxes::from_value(&json!(null)).boxes.is_empty());
        assert!(MaterialBoxes::from_value(&json!({"materialBoxs": 3})).boxes.is_empty());
    }
}
