//! Multiscale metadata for new pyramids.

use std::collections::BTreeMap;

use super::axis::Axis;
use super::coordinate_transformations::CoordinateTransformation;
use super::multiscale::{Dataset, Multiscale};

/// Builds the `multiscales` entry for a pyramid written level by level.
///
/// Every level gets one `scale` transformation. Spatial axes grow by the
/// cumulative downscale factor (level `n` has `downscale^n` times the base
/// pixel size), time and channel axes keep the base value. A `translation`
/// follows only when some axis has a nonzero offset; offsets are the same on
/// every level.
#[derive(Debug, Clone)]
pub struct MultiscaleBuilder {
    dim_order: String,
    pixel_size: BTreeMap<char, f64>,
    translation: BTreeMap<char, f64>,
    max_level: usize,
    downscale: f64,
    name: Option<String>,
}

impl MultiscaleBuilder {
    pub fn new(dim_order: &str) -> Self {
        Self {
            dim_order: dim_order.to_string(),
            pixel_size: BTreeMap::new(),
            translation: BTreeMap::new(),
            max_level: 0,
            downscale: 2.0,
            name: None,
        }
    }

    /// Physical pixel size per axis symbol; axes without an entry use 1.
    pub fn pixel_size(mut self, pixel_size: BTreeMap<char, f64>) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    /// Offset per axis symbol; axes without an entry use 0.
    pub fn translation(mut self, translation: BTreeMap<char, f64>) -> Self {
        self.translation = translation;
        self
    }

    /// Levels `0..=max_level`, each `downscale` times smaller than the previous.
    pub fn levels(mut self, max_level: usize, downscale: f64) -> Self {
        self.max_level = max_level;
        self.downscale = downscale;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn axes(&self) -> Vec<Axis> {
        self.dim_order.chars().map(Axis::from_symbol).collect()
    }

    /// Transformations of one level.
    pub fn transformations(&self, level: usize) -> Vec<CoordinateTransformation> {
        let factor = self.downscale.powi(level as i32);
        let axes = self.axes();

        let scale: Vec<f64> = self
            .dim_order
            .chars()
            .zip(&axes)
            .map(|(symbol, axis)| {
                let base = self.pixel_size.get(&symbol).copied().unwrap_or(1.0);
                if axis.is_space() { base * factor } else { base }
            })
            .collect();

        let translation: Vec<f64> = self
            .dim_order
            .chars()
            .map(|symbol| self.translation.get(&symbol).copied().unwrap_or(0.0))
            .collect();

        let mut transformations = vec![CoordinateTransformation::Scale { scale }];
        if translation.iter().any(|&t| t != 0.0) {
            transformations.push(CoordinateTransformation::Translation { translation });
        }
        transformations
    }

    pub fn build(&self) -> Multiscale {
        let datasets = (0..=self.max_level)
            .map(|level| Dataset {
                path: level.to_string(),
                coordinate_transformations: self.transformations(level),
            })
            .collect();

        Multiscale {
            version: None,
            name: self.name.clone(),
            downscaling_type: None,
            axes: self.axes(),
            datasets,
            coordinate_transformations: None,
            metadata: None,
        }
    }
}
