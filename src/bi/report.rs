// Decoded-table data model and aggregation
// Folds the flat (key, value) stream from the entry decoder into one report

use super::names;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Keys stored as a list even when only one entry occurs, so the report
/// shape stays predictable for consumers.
const ALWAYS_A_LIST: &[&str] = &["NamedGroup", "BlockDevice", "ProgramFeature"];

/// Report key: a human-readable name when the entry identifier is
/// recognized, the raw identifier otherwise. Consumers must tolerate both.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Name(String),
    Id(u32),
}

impl Key {
    pub fn name(name: impl Into<String>) -> Self {
        Key::Name(name.into())
    }

    /// Key for an id-carrying entry: the space-stripped display name when
    /// the id is in the name table, the raw id otherwise.
    pub fn for_id(id: u32) -> Self {
        match names::id_key_name(id) {
            Some(name) => Key::Name(name),
            None => Key::Id(id),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Id(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // JSON object keys are strings; raw ids render in decimal.
        match self {
            Key::Name(name) => serializer.serialize_str(name),
            Key::Id(id) => serializer.collect_str(id),
        }
    }
}

/// Attributes attached to one GPIO pin. The two pin entry kinds contribute
/// different fields, so both are optional and merge field-by-field.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PinInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PinInfo {
    /// Overlay the populated fields of `other` onto this record; fields the
    /// later record does not carry are kept.
    fn merge(&mut self, other: PinInfo) {
        if other.function.is_some() {
            self.function = other.function;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
    }
}

/// Pin number to attributes, ordered by pin.
pub type PinMap = BTreeMap<u8, PinInfo>;

/// A storage region declared by the firmware.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDevice {
    pub name: String,
    pub address: u32,
    pub size: u32,
    pub flags: u16,
}

/// A group record that owns other entries sharing its numeric id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedGroup {
    pub label: String,
    pub parent: u32,
    pub flags: u16,
    pub tag: u16,
    pub id: u32,

    /// Entries re-homed from the top level during aggregation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<Value>>,
}

/// One decoded value; `List` accumulates repeats of the same key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(u32),
    Str(String),
    Device(BlockDevice),
    Group(NamedGroup),
    Pins(PinMap),
    List(Vec<Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<u32> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_device(&self) -> Option<&BlockDevice> {
        match self {
            Value::Device(device) => Some(device),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&NamedGroup> {
        match self {
            Value::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_pins(&self) -> Option<&PinMap> {
        match self {
            Value::Pins(pins) => Some(pins),
            _ => None,
        }
    }
}

/// The fully decoded info table: an ordered mapping from key to value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: BTreeMap<Key, Value>,
}

impl Report {
    /// Fold decoded pairs (in entry order) into a report, then re-home
    /// named-group data.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Key, Value)>) -> Self {
        let mut report = Report::default();
        for (key, value) in pairs {
            report.fold(key, value);
        }
        report.attach_group_data();
        report
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_name(&self, name: &str) -> Option<&Value> {
        self.entries.get(&Key::name(name))
    }

    pub fn get_id(&self, id: u32) -> Option<&Value> {
        self.entries.get(&Key::Id(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to a JSON value (string keys throughout).
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn fold(&mut self, key: Key, value: Value) {
        let Some(first) = self.entries.remove(&key) else {
            let value = if always_a_list(&key) {
                Value::List(vec![value])
            } else {
                value
            };
            self.entries.insert(key, value);
            return;
        };

        // The key repeats: pin maps merge, lists append, scalars promote
        // to a two-element list in entry order.
        let merged = match (first, value) {
            (Value::Pins(mut pins), Value::Pins(new_pins)) => {
                for (pin, info) in new_pins {
                    pins.entry(pin).or_default().merge(info);
                }
                Value::Pins(pins)
            }
            (Value::List(mut items), value) => {
                items.push(value);
                Value::List(items)
            }
            (first, value) => Value::List(vec![first, value]),
        };
        self.entries.insert(key, merged);
    }

    /// Move top-level values whose raw-id key matches a named group's id
    /// under that group's `data` field. Groups are taken out of the map
    /// first and the map rewritten afterwards; walking in list order means
    /// the first group claiming an id wins.
    fn attach_group_data(&mut self) {
        let group_key = Key::name("NamedGroup");
        let mut groups = match self.entries.remove(&group_key) {
            Some(Value::List(groups)) => groups,
            Some(other) => {
                self.entries.insert(group_key, other);
                return;
            }
            None => return,
        };

        for value in groups.iter_mut() {
            if let Value::Group(group) = value {
                if let Some(data) = self.entries.remove(&Key::Id(group.id)) {
                    group.data = Some(Box::new(data));
                }
            }
        }

        self.entries.insert(group_key, Value::List(groups));
    }
}

fn always_a_list(key: &Key) -> bool {
    matches!(key, Key::Name(name) if ALWAYS_A_LIST.contains(&name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: u32, label: &str) -> Value {
        Value::Group(NamedGroup {
            label: label.to_string(),
            parent: 0,
            flags: 0,
            tag: 0x5052,
            id,
            data: None,
        })
    }

    #[test]
    fn test_key_for_id() {
        assert_eq!(
            Key::for_id(names::ID_PROGRAM_NAME),
            Key::name("ProgramName")
        );
        assert_eq!(Key::for_id(0x1234_5678), Key::Id(0x1234_5678));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::name("ProgramName").to_string(), "ProgramName");
        assert_eq!(Key::Id(7).to_string(), "7");
    }

    #[test]
    fn test_single_scalar_stays_scalar() {
        let report = Report::from_pairs(vec![(Key::name("PicoBoard"), Value::Str("pico_w".into()))]);
        assert_eq!(
            report.get_name("PicoBoard").and_then(Value::as_str),
            Some("pico_w")
        );
    }

    #[test]
    fn test_repeats_promote_to_list_in_order() {
        let key = Key::Id(0x42);
        let report = Report::from_pairs(vec![
            (key.clone(), Value::Int(1)),
            (key.clone(), Value::Int(2)),
            (key.clone(), Value::Int(3)),
        ]);

        let items = report.get_id(0x42).and_then(Value::as_list).unwrap();
        assert_eq!(
            items,
            &[Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_always_list_keys_wrap_single_values() {
        let report = Report::from_pairs(vec![(
            Key::name("ProgramFeature"),
            Value::Str("USB".into()),
        )]);

        let items = report
            .get_name("ProgramFeature")
            .and_then(Value::as_list)
            .unwrap();
        assert_eq!(items, &[Value::Str("USB".into())]);
    }

    #[test]
    fn test_pin_maps_merge_field_by_field() {
        let first: PinMap = [(
            1u8,
            PinInfo {
                function: Some("I2C".into()),
                name: None,
            },
        )]
        .into_iter()
        .collect();
        let second: PinMap = [
            (
                1u8,
                PinInfo {
                    function: None,
                    name: Some("SDA".into()),
                },
            ),
            (
                2u8,
                PinInfo {
                    function: None,
                    name: Some("SCL".into()),
                },
            ),
        ]
        .into_iter()
        .collect();

        let report = Report::from_pairs(vec![
            (Key::name("Pins"), Value::Pins(first)),
            (Key::name("Pins"), Value::Pins(second)),
        ]);

        let pins = report.get_name("Pins").and_then(Value::as_pins).unwrap();
        assert_eq!(pins.len(), 2);
        // The later name-only record must not erase the earlier function.
        assert_eq!(pins[&1].function.as_deref(), Some("I2C"));
        assert_eq!(pins[&1].name.as_deref(), Some("SDA"));
        assert_eq!(pins[&2].name.as_deref(), Some("SCL"));
    }

    #[test]
    fn test_later_pin_function_overwrites_earlier() {
        let mk = |func: &str| -> PinMap {
            [(
                4u8,
                PinInfo {
                    function: Some(func.into()),
                    name: None,
                },
            )]
            .into_iter()
            .collect()
        };

        let report = Report::from_pairs(vec![
            (Key::name("Pins"), Value::Pins(mk("SPI"))),
            (Key::name("Pins"), Value::Pins(mk("I2C"))),
        ]);

        let pins = report.get_name("Pins").and_then(Value::as_pins).unwrap();
        assert_eq!(pins[&4].function.as_deref(), Some("I2C"));
    }

    #[test]
    fn test_group_claims_matching_raw_id_values() {
        let report = Report::from_pairs(vec![
            (Key::name("NamedGroup"), group(7, "UDI")),
            (Key::Id(7), Value::Str("first".into())),
            (Key::Id(7), Value::Str("second".into())),
        ]);

        // The raw-id key must be gone from the top level.
        assert!(report.get_id(7).is_none());

        let groups = report
            .get_name("NamedGroup")
            .and_then(Value::as_list)
            .unwrap();
        let group = groups[0].as_group().unwrap();
        let data = group.data.as_deref().and_then(Value::as_list).unwrap();
        assert_eq!(
            data,
            &[Value::Str("first".into()), Value::Str("second".into())]
        );
    }

    #[test]
    fn test_group_without_matching_id_keeps_no_data() {
        let report = Report::from_pairs(vec![
            (Key::name("NamedGroup"), group(9, "empty")),
            (Key::Id(8), Value::Int(1)),
        ]);

        let groups = report
            .get_name("NamedGroup")
            .and_then(Value::as_list)
            .unwrap();
        assert!(groups[0].as_group().unwrap().data.is_none());
        assert!(report.get_id(8).is_some());
    }

    #[test]
    fn test_first_group_wins_on_shared_id() {
        let report = Report::from_pairs(vec![
            (Key::name("NamedGroup"), group(5, "one")),
            (Key::name("NamedGroup"), group(5, "two")),
            (Key::Id(5), Value::Int(77)),
        ]);

        let groups = report
            .get_name("NamedGroup")
            .and_then(Value::as_list)
            .unwrap();
        let first = groups[0].as_group().unwrap();
        let second = groups[1].as_group().unwrap();
        assert_eq!(first.data.as_deref().and_then(Value::as_int), Some(77));
        assert!(second.data.is_none());
    }

    #[test]
    fn test_to_json_stringifies_keys() {
        let pins: PinMap = [(
            2u8,
            PinInfo {
                function: Some("UART".into()),
                name: None,
            },
        )]
        .into_iter()
        .collect();

        let report = Report::from_pairs(vec![
            (Key::name("ProgramName"), Value::Str("blink".into())),
            (Key::Id(0x4A99_D719), Value::Str("sys".into())),
            (Key::name("Pins"), Value::Pins(pins)),
        ]);

        let json = report.to_json().unwrap();
        assert_eq!(json["ProgramName"], "blink");
        assert_eq!(json[0x4A99_D719u32.to_string().as_str()], "sys");
        assert_eq!(json["Pins"]["2"]["function"], "UART");
        // Absent pin fields are omitted, not null.
        assert!(json["Pins"]["2"].get("name").is_none());
    }

    #[test]
    fn test_json_device_and_group_field_order() {
        let report = Report::from_pairs(vec![(
            Key::name("BlockDevice"),
            Value::Device(BlockDevice {
                name: "flash".into(),
                address: 0x1012_C000,
                size: 0x0008_0000,
                flags: 7,
            }),
        )]);

        let json = report.to_json().unwrap();
        let device = &json["BlockDevice"][0];
        assert_eq!(device["name"], "flash");
        assert_eq!(device["address"], 0x1012_C000u32);
        assert_eq!(device["size"], 0x0008_0000u32);
        assert_eq!(device["flags"], 7);
    }
}
