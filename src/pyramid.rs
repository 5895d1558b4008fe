//! In-memory arrays and the downscaler used to build pyramids.

use crate::error::{Error, Result};

/// A dense n-dimensional `f64` array in C (row-major) order.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl ArrayData {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != values.len() {
            return Err(Error::InvalidParameter(format!(
                "shape {:?} needs {} values, got {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    /// Fill an array by evaluating `f` at every index.
    pub fn from_fn(shape: Vec<usize>, f: impl Fn(&[usize]) -> f64) -> Self {
        let values = Indices::new(&shape).map(|index| f(&index)).collect();
        Self { shape, values }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at `index`, or `None` outside the array.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        Some(self.values[offset])
    }
}

/// Iterates every index of a shape in C order.
pub(crate) struct Indices {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl Indices {
    pub(crate) fn new(shape: &[usize]) -> Self {
        let next = if shape.contains(&0) {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        Self {
            shape: shape.to_vec(),
            next,
        }
    }
}

impl Iterator for Indices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut advanced = current.clone();
        for axis in (0..self.shape.len()).rev() {
            advanced[axis] += 1;
            if advanced[axis] < self.shape[axis] {
                self.next = Some(advanced);
                break;
            }
            advanced[axis] = 0;
        }
        Some(current)
    }
}

/// Downscaling policy for pyramids: each level shrinks the last two
/// dimensions by `downscale` using a block mean, up to `max_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaler {
    pub downscale: usize,
    pub max_level: usize,
}

impl Default for Scaler {
    fn default() -> Self {
        Self {
            downscale: 2,
            max_level: 4,
        }
    }
}

impl Scaler {
    pub fn resize(&self, data: &ArrayData) -> ArrayData {
        let factor = self.downscale.max(1);
        let ndim = data.ndim();
        let first_scaled = ndim.saturating_sub(2);

        let out_shape: Vec<usize> = data
            .shape()
            .iter()
            .enumerate()
            .map(|(axis, &dim)| {
                if axis >= first_scaled {
                    (dim / factor).max(1)
                } else {
                    dim
                }
            })
            .collect();

        ArrayData::from_fn(out_shape, |out| {
            // Block extent along each axis; unscaled axes contribute a single index
            let ranges: Vec<(usize, usize)> = out
                .iter()
                .enumerate()
                .map(|(axis, &o)| {
                    if axis >= first_scaled {
                        let start = o * factor;
                        (start, (start + factor).min(data.shape()[axis]))
                    } else {
                        (o, o + 1)
                    }
                })
                .collect();
            let extent: Vec<usize> = ranges.iter().map(|(start, end)| end - start).collect();

            let mut sum = 0.0;
            let mut count = 0usize;
            for offset in Indices::new(&extent) {
                let index: Vec<usize> = offset
                    .iter()
                    .zip(&ranges)
                    .map(|(o, (start, _))| start + o)
                    .collect();
                if let Some(value) = data.get(&index) {
                    sum += value;
                    count += 1;
                }
            }
            if count == 0 { 0.0 } else { sum / count as f64 }
        })
    }

    /// All levels `0..=max_level`, level 0 being `data` itself.
    pub fn pyramid(&self, data: ArrayData) -> Vec<ArrayData> {
        let mut levels = Vec::with_capacity(self.max_level + 1);
        levels.push(data);
        for level in 1..=self.max_level {
            let next = self.resize(&levels[level - 1]);
            levels.push(next);
        }
        levels
    }
}
