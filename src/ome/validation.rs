//! Structural checks of the OME attributes on a store root.
//!
//! Covers the multiscales rules of OME-NGFF 0.4 and 0.5: axis counts, kinds
//! and order, one `scale` per dataset optionally followed by one
//! `translation`, and dataset paths that resolve to arrays in the store.

use serde_json::Value;
use std::collections::HashSet;

use crate::error::SchemaError;
use crate::store::StoreReader;

use super::axis::{Axis, AxisType};
use super::coordinate_transformations::CoordinateTransformation;
use super::multiscale::{Multiscale, OmeAttributes};

/// Validates the OME attributes of a store root.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, store: &dyn StoreReader) -> Result<OmeAttributes, SchemaError>;
}

/// The bundled [`SchemaValidator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OmeValidator;

impl SchemaValidator for OmeValidator {
    fn validate(&self, store: &dyn StoreReader) -> Result<OmeAttributes, SchemaError> {
        let root = store.root_document();
        let Value::Object(document) = root else {
            return Err(SchemaError::new(format!(
                "root metadata must be an object, got {root}"
            )));
        };
        match document.get("node_type").and_then(Value::as_str) {
            Some("group") => {}
            other => {
                return Err(SchemaError::new(format!(
                    "root node must be a group, got {}",
                    other.unwrap_or("no node_type")
                )));
            }
        }
        let attributes = store
            .root_attributes()
            .ok_or_else(|| SchemaError::new("root group has no attributes"))?;

        let ome = OmeAttributes::from_attributes(attributes)?;
        if ome.multiscales.is_empty() {
            return Err(SchemaError::new("multiscales must not be empty"));
        }

        let mut problems = Vec::new();
        for (i, multiscale) in ome.multiscales.iter().enumerate() {
            check_multiscale(multiscale, store, &mut |p| {
                problems.push(format!("multiscales[{i}]: {p}"))
            });
        }

        if problems.is_empty() {
            Ok(ome)
        } else {
            Err(SchemaError { problems })
        }
    }
}

fn check_multiscale(
    multiscale: &Multiscale,
    store: &dyn StoreReader,
    report: &mut dyn FnMut(String),
) {
    check_axes(&multiscale.axes, report);
    let ndim = multiscale.axes.len();

    if multiscale.datasets.is_empty() {
        report("datasets must not be empty".to_string());
    }
    for dataset in &multiscale.datasets {
        let path = &dataset.path;
        if !store.has_array(path) {
            report(format!("dataset {path:?} is not an array in the store"));
        }
        check_transformations(&dataset.coordinate_transformations, ndim, true, &mut |p| {
            report(format!("dataset {path:?}: {p}"))
        });
    }

    if let Some(transformations) = &multiscale.coordinate_transformations {
        check_transformations(transformations, ndim, false, &mut |p| {
            report(format!("coordinateTransformations: {p}"))
        });
    }
}

fn check_axes(axes: &[Axis], report: &mut dyn FnMut(String)) {
    if !(2..=5).contains(&axes.len()) {
        report(format!("expected 2 to 5 axes, got {}", axes.len()));
    }

    let mut names = HashSet::new();
    for axis in axes {
        if !names.insert(axis.name.as_str()) {
            report(format!("duplicate axis name {:?}", axis.name));
        }
    }

    let count = |kind: AxisType| axes.iter().filter(|a| a.axis_type == Some(kind)).count();
    let space = count(AxisType::Space);
    if !(2..=3).contains(&space) {
        report(format!("expected 2 or 3 space axes, got {space}"));
    }
    if count(AxisType::Time) > 1 {
        report("more than one time axis".to_string());
    }
    if count(AxisType::Channel) > 1 {
        report("more than one channel axis".to_string());
    }

    if let Some(pos) = axes.iter().position(|a| a.axis_type == Some(AxisType::Time)) {
        if pos != 0 {
            report(format!("time axis must come first, found at {pos}"));
        }
    }
    if let Some(first_space) = axes.iter().position(Axis::is_space) {
        if axes[first_space..].iter().any(|a| !a.is_space()) {
            report("space axes must be the last axes".to_string());
        }
    }
}

/// Datasets need exactly one scale; elsewhere a scale is optional. At most
/// one translation, and only after the scale.
fn check_transformations(
    transformations: &[CoordinateTransformation],
    ndim: usize,
    scale_required: bool,
    report: &mut dyn FnMut(String),
) {
    let mut scales = 0;
    let mut translations = 0;
    for (i, transformation) in transformations.iter().enumerate() {
        match transformation {
            CoordinateTransformation::Identity => {
                report("identity transformations are not allowed here".to_string());
                continue;
            }
            CoordinateTransformation::Scale { .. } => {
                scales += 1;
                if i != 0 {
                    report("scale must be the first transformation".to_string());
                }
            }
            CoordinateTransformation::Translation { .. } => {
                translations += 1;
                if scales == 0 {
                    report("translation must follow a scale".to_string());
                }
            }
        }
        if let Some(n) = transformation.dimensions() {
            if n != ndim {
                report(format!(
                    "{} has {n} values for {ndim} axes",
                    transformation.kind()
                ));
            }
        }
    }

    if scale_required && scales != 1 {
        report(format!("expected exactly one scale, got {scales}"));
    }
    if !scale_required && scales > 1 {
        report(format!("expected at most one scale, got {scales}"));
    }
    if translations > 1 {
        report(format!("expected at most one translation, got {translations}"));
    }
}
