use serde::{Deserialize, Serialize};

// https://ngff.openmicroscopy.org/0.5/#axes-md

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Time,
    Channel,
    Space,
    #[serde(other)]
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,

    #[serde(rename = "type")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_type: Option<AxisType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Axis {
    /// Axis for a dimension symbol: `t` is time in milliseconds, `c` is a
    /// channel, anything else is space in micrometers.
    pub fn from_symbol(symbol: char) -> Self {
        let (axis_type, unit) = match symbol {
            't' => (AxisType::Time, Some("millisecond")),
            'c' => (AxisType::Channel, None),
            _ => (AxisType::Space, Some("micrometer")),
        };
        Self {
            name: symbol.to_string(),
            axis_type: Some(axis_type),
            unit: unit.map(str::to_string),
        }
    }

    pub fn is_space(&self) -> bool {
        self.axis_type == Some(AxisType::Space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn symbols_map_to_kind_and_unit() {
        let t = Axis::from_symbol('t');
        assert_eq!(t.axis_type, Some(AxisType::Time));
        assert_eq!(t.unit.as_deref(), Some("millisecond"));

        let c = Axis::from_symbol('c');
        assert_eq!(c.axis_type, Some(AxisType::Channel));
        assert_eq!(c.unit, None);

        for symbol in ['z', 'y', 'x', 'q'] {
            let axis = Axis::from_symbol(symbol);
            assert!(axis.is_space());
            assert_eq!(axis.unit.as_deref(), Some("micrometer"));
        }
    }

    #[test]
    fn channel_axis_serializes_without_unit() {
        let value = serde_json::to_value(Axis::from_symbol('c')).unwrap();
        assert_eq!(value, json!({"name": "c", "type": "channel"}));
    }

    #[test]
    fn unknown_type_is_custom() {
        let axis: Axis = serde_json::from_value(json!({"name": "a", "type": "angle"})).unwrap();
        assert_eq!(axis.axis_type, Some(AxisType::Custom));

        let axis: Axis = serde_json::from_value(json!({"name": "a"})).unwrap();
        assert_eq!(axis.axis_type, None);
    }
}
