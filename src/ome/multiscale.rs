use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;

use super::axis::Axis;
use super::coordinate_transformations::CoordinateTransformation;

/// OME-Zarr version written into new archives.
pub const OME_VERSION: &str = "0.5";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub path: String,

    #[serde(rename = "coordinateTransformations")]
    pub coordinate_transformations: Vec<CoordinateTransformation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multiscale {
    /// Only present in the 0.4 layout; 0.5 keeps the version on the `ome` object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downscaling_type: Option<String>,

    pub axes: Vec<Axis>,

    // ordered by largest (i.e. highest resolution) to smallest.
    pub datasets: Vec<Dataset>,

    // applied after the per-dataset transformations
    #[serde(rename = "coordinateTransformations")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate_transformations: Option<Vec<CoordinateTransformation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// The OME part of a root group's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct OmeAttributes {
    pub version: Option<String>,
    pub multiscales: Vec<Multiscale>,
}

impl OmeAttributes {
    /// Wrap multiscales into the 0.5 attribute layout:
    /// `{"ome": {"version": "0.5", "multiscales": [...]}}`.
    pub fn new(multiscales: Vec<Multiscale>) -> Self {
        Self {
            version: Some(OME_VERSION.to_string()),
            multiscales,
        }
    }

    /// Read the OME attributes of a group, accepting both the 0.5 layout
    /// (under `ome`) and the older one (`multiscales` at the top level).
    pub fn from_attributes(attributes: &Map<String, Value>) -> Result<Self, SchemaError> {
        let (container, version) = match attributes.get("ome") {
            Some(Value::Object(ome)) => {
                let version = match ome.get("version") {
                    None => None,
                    Some(Value::String(v)) => Some(v.clone()),
                    Some(other) => {
                        return Err(SchemaError::new(format!(
                            "ome.version must be a string, got {other}"
                        )));
                    }
                };
                (ome, version)
            }
            Some(other) => {
                return Err(SchemaError::new(format!(
                    "attribute \"ome\" must be an object, got {other}"
                )));
            }
            None => (attributes, None),
        };

        let multiscales = match container.get("multiscales") {
            Some(value @ Value::Array(_)) => {
                Vec::<Multiscale>::deserialize(value).map_err(|e| {
                    SchemaError::new(format!("invalid multiscales metadata: {e}"))
                })?
            }
            Some(other) => {
                return Err(SchemaError::new(format!(
                    "multiscales must be an array, got {other}"
                )));
            }
            None => return Err(SchemaError::new("no multiscales metadata found")),
        };

        Ok(Self {
            version,
            multiscales,
        })
    }

    pub fn to_attributes(&self) -> Map<String, Value> {
        let mut ome = Map::new();
        if let Some(version) = &self.version {
            ome.insert("version".to_string(), Value::String(version.clone()));
        }
        ome.insert(
            "multiscales".to_string(),
            serde_json::to_value(&self.multiscales).unwrap_or(Value::Array(Vec::new())),
        );
        let mut attributes = Map::new();
        attributes.insert("ome".to_string(), Value::Object(ome));
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attributes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn multiscale_json() -> Value {
        json!({
            "axes": [{"name": "y", "type": "space"}, {"name": "x", "type": "space"}],
            "datasets": [{"path": "0", "coordinateTransformations": [{"type": "scale", "scale": [1.0, 1.0]}]}]
        })
    }

    #[test]
    fn reads_version_05_layout() {
        let attrs = attributes(json!({"ome": {"version": "0.5", "multiscales": [multiscale_json()]}}));
        let ome = OmeAttributes::from_attributes(&attrs).unwrap();
        assert_eq!(ome.version.as_deref(), Some("0.5"));
        assert_eq!(ome.multiscales[0].datasets[0].path, "0");
        assert_eq!(ome.to_attributes(), attrs);
    }

    #[test]
    fn reads_version_04_layout() {
        let mut multiscale = multiscale_json();
        multiscale["version"] = json!(0.4);
        let attrs = attributes(json!({"multiscales": [multiscale]}));
        let ome = OmeAttributes::from_attributes(&attrs).unwrap();
        assert_eq!(ome.version, None);
        assert_eq!(ome.multiscales[0].version, Some(json!(0.4)));
    }

    #[test]
    fn missing_multiscales_is_a_schema_error() {
        let attrs = attributes(json!({"ome": {"version": "0.5"}}));
        assert!(OmeAttributes::from_attributes(&attrs).is_err());

        let attrs = attributes(json!({"ome": "0.5"}));
        assert!(OmeAttributes::from_attributes(&attrs).is_err());
    }
}
