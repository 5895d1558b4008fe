//! OME-NGFF multiscale metadata: the model, a builder for new pyramids and
//! a structural validator.

mod axis;
mod builder;
mod coordinate_transformations;
mod multiscale;
mod validation;

pub use axis::{Axis, AxisType};
pub use builder::MultiscaleBuilder;
pub use coordinate_transformations::CoordinateTransformation;
pub use multiscale::{Dataset, Multiscale, OME_VERSION, OmeAttributes};
pub use validation::{OmeValidator, SchemaValidator};
