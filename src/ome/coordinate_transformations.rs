use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CoordinateTransformation {
    Identity,
    Scale { scale: Vec<f64> },
    Translation { translation: Vec<f64> },
}

impl CoordinateTransformation {
    pub fn kind(&self) -> &'static str {
        match self {
            CoordinateTransformation::Identity => "identity",
            CoordinateTransformation::Scale { .. } => "scale",
            CoordinateTransformation::Translation { .. } => "translation",
        }
    }

    /// Number of values, i.e. the dimensionality the transformation applies to.
    pub fn dimensions(&self) -> Option<usize> {
        match self {
            CoordinateTransformation::Identity => None,
            CoordinateTransformation::Scale { scale } => Some(scale.len()),
            CoordinateTransformation::Translation { translation } => Some(translation.len()),
        }
    }
}
