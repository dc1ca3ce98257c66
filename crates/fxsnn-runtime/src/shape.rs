//! Population shapes and broadcasting of initial values

use crate::error::{Result, RuntimeError};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Non-empty tuple of positive dimension sizes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<usize>", into = "Vec<usize>"))]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a validated shape
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        if dims.is_empty() {
            return Err(RuntimeError::shape("shape must have at least one dimension"));
        }
        if let Some(pos) = dims.iter().position(|&d| d == 0) {
            return Err(RuntimeError::shape(format!(
                "dimension {} of {:?} is zero",
                pos, dims
            )));
        }
        Ok(Self(dims))
    }

    /// One-dimensional shape of `n` neurons
    pub fn flat(n: usize) -> Result<Self> {
        Self::new(vec![n])
    }

    /// Dimension sizes
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Total number of neurons
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }
}

impl TryFrom<Vec<usize>> for Shape {
    type Error = RuntimeError;

    fn try_from(dims: Vec<usize>) -> Result<Self> {
        Self::new(dims)
    }
}

impl From<Shape> for Vec<usize> {
    fn from(shape: Shape) -> Self {
        shape.0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Initial value of a per-neuron variable, broadcast to the population
/// shape with trailing-dimension rules
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Init<T> {
    /// Same value for every neuron
    Scalar(T),
    /// One-dimensional values, broadcast along the last dimension
    List(Vec<T>),
    /// Row-major values with an explicit shape
    Array {
        /// Dimension sizes of `data`
        shape: Vec<usize>,
        /// Row-major values
        data: Vec<T>,
    },
}

impl<T: Default> Default for Init<T> {
    fn default() -> Self {
        Init::Scalar(T::default())
    }
}

impl<T> From<T> for Init<T> {
    fn from(value: T) -> Self {
        Init::Scalar(value)
    }
}

impl<T: Clone> Init<T> {
    /// Expand to one value per neuron in row-major order
    pub fn broadcast(&self, target: &Shape) -> Result<Vec<T>> {
        let (source, data): (Vec<usize>, &[T]) = match self {
            Init::Scalar(value) => return Ok(vec![value.clone(); target.size()]),
            Init::List(values) => (vec![values.len()], values.as_slice()),
            Init::Array { shape, data } => (shape.clone(), data.as_slice()),
        };

        let expected: usize = source.iter().product();
        if expected != data.len() {
            return Err(RuntimeError::shape(format!(
                "array of shape {:?} needs {} values, got {}",
                source,
                expected,
                data.len()
            )));
        }
        if source.len() > target.ndim() {
            return Err(RuntimeError::shape(format!(
                "cannot broadcast {:?} to {}",
                source, target
            )));
        }

        // Left-pad the source shape with ones so both have the same rank
        let pad = target.ndim() - source.len();
        let padded: Vec<usize> = core::iter::repeat(1)
            .take(pad)
            .chain(source.iter().copied())
            .collect();
        for (&s, &t) in padded.iter().zip(target.dims()) {
            if s != t && s != 1 {
                return Err(RuntimeError::shape(format!(
                    "cannot broadcast {:?} to {}",
                    source, target
                )));
            }
        }

        let source_strides = row_major_strides(&padded);
        let target_strides = row_major_strides(target.dims());
        let out = (0..target.size())
            .map(|flat| {
                let offset = padded
                    .iter()
                    .zip(&source_strides)
                    .zip(&target_strides)
                    .zip(target.dims())
                    .map(|(((&s, &src_stride), &dst_stride), &t)| {
                        let index = (flat / dst_stride) % t;
                        if s == 1 {
                            0
                        } else {
                            index * src_stride
                        }
                    })
                    .sum::<usize>();
                data[offset].clone()
            })
            .collect();
        Ok(out)
    }

    /// Map the contained values, keeping the layout
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Init<U> {
        match self {
            Init::Scalar(value) => Init::Scalar(f(value)),
            Init::List(values) => Init::List(values.iter().map(f).collect()),
            Init::Array { shape, data } => Init::Array {
                shape: shape.clone(),
                data: data.iter().map(f).collect(),
            },
        }
    }

    /// Map the contained values with a fallible conversion
    pub fn try_map<U>(&self, mut f: impl FnMut(&T) -> Result<U>) -> Result<Init<U>> {
        Ok(match self {
            Init::Scalar(value) => Init::Scalar(f(value)?),
            Init::List(values) => Init::List(values.iter().map(f).collect::<Result<_>>()?),
            Init::Array { shape, data } => Init::Array {
                shape: shape.clone(),
                data: data.iter().map(f).collect::<Result<_>>()?,
            },
        })
    }

    /// Iterate the stored values, without broadcasting
    pub fn values(&self) -> impl Iterator<Item = &T> {
        let slice: &[T] = match self {
            Init::Scalar(value) => core::slice::from_ref(value),
            Init::List(values) => values.as_slice(),
            Init::Array { data, .. } => data.as_slice(),
        };
        slice.iter()
    }
}

fn row_major_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}
