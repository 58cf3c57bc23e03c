//! Typed raster sample arrays.
//!
//! Raster codecs hand out band data in the sample type stored on disk, and user
//! transformations are free to change it. [`RasterBuffer`] keeps one variant per
//! supported sample type around an [`ndarray`] array of any dimensionality, so a
//! single band ([`BandArray`]) and a stack of slices ([`CubeArray`]) share the
//! same conversion and inspection code.

use std::fmt;

use ndarray::{Array, Array3, Axis, Dimension, Ix2, Ix3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric type of the samples held by a raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// IEEE single precision float
    Float32,
    /// IEEE double precision float
    Float64,
}

impl SampleType {
    /// Returns the string representation of this sample type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleType::UInt8 => "UInt8",
            SampleType::UInt16 => "UInt16",
            SampleType::UInt32 => "UInt32",
            SampleType::UInt64 => "UInt64",
            SampleType::Int8 => "Int8",
            SampleType::Int16 => "Int16",
            SampleType::Int32 => "Int32",
            SampleType::Int64 => "Int64",
            SampleType::Float32 => "Float32",
            SampleType::Float64 => "Float64",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when combining raster buffers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RasterBufferError {
    /// The two buffers hold different sample types
    #[error("sample type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Sample type of the destination
        expected: SampleType,
        /// Sample type of the offending buffer
        found: SampleType,
    },

    /// The buffer shape does not fit the destination
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// Shape required by the destination
        expected: Vec<usize>,
        /// Shape of the offending buffer
        found: Vec<usize>,
    },

    /// A slice index past the end of the cube
    #[error("slice index {index} out of bounds for {count} slices")]
    SliceOutOfBounds {
        /// Requested slice
        index: usize,
        /// Number of slices in the cube
        count: usize,
    },

    /// Stacking requires at least one band
    #[error("cannot stack an empty list of bands")]
    Empty,
}

/// A typed n-dimensional sample array.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterBuffer<D: Dimension> {
    UInt8(Array<u8, D>),
    UInt16(Array<u16, D>),
    UInt32(Array<u32, D>),
    UInt64(Array<u64, D>),
    Int8(Array<i8, D>),
    Int16(Array<i16, D>),
    Int32(Array<i32, D>),
    Int64(Array<i64, D>),
    Float32(Array<f32, D>),
    Float64(Array<f64, D>),
}

/// A single 2-D band indexed as `[row][column]`.
pub type BandArray = RasterBuffer<Ix2>;

/// A stack of bands indexed as `[slice][row][column]`.
pub type CubeArray = RasterBuffer<Ix3>;

/// Evaluates `$body` with `$array` bound to the inner array, whatever its type.
#[macro_export]
macro_rules! for_each_buffer {
    ($buffer:expr, $array:ident => $body:expr) => {
        match $buffer {
            $crate::raster::RasterBuffer::UInt8($array) => $body,
            $crate::raster::RasterBuffer::UInt16($array) => $body,
            $crate::raster::RasterBuffer::UInt32($array) => $body,
            $crate::raster::RasterBuffer::UInt64($array) => $body,
            $crate::raster::RasterBuffer::Int8($array) => $body,
            $crate::raster::RasterBuffer::Int16($array) => $body,
            $crate::raster::RasterBuffer::Int32($array) => $body,
            $crate::raster::RasterBuffer::Int64($array) => $body,
            $crate::raster::RasterBuffer::Float32($array) => $body,
            $crate::raster::RasterBuffer::Float64($array) => $body,
        }
    };
}

/// Like [`for_each_buffer!`] but rewraps the result in the same variant.
macro_rules! map_buffer {
    ($buffer:expr, $array:ident => $body:expr) => {
        match $buffer {
            RasterBuffer::UInt8($array) => RasterBuffer::UInt8($body),
            RasterBuffer::UInt16($array) => RasterBuffer::UInt16($body),
            RasterBuffer::UInt32($array) => RasterBuffer::UInt32($body),
            RasterBuffer::UInt64($array) => RasterBuffer::UInt64($body),
            RasterBuffer::Int8($array) => RasterBuffer::Int8($body),
            RasterBuffer::Int16($array) => RasterBuffer::Int16($body),
            RasterBuffer::Int32($array) => RasterBuffer::Int32($body),
            RasterBuffer::Int64($array) => RasterBuffer::Int64($body),
            RasterBuffer::Float32($array) => RasterBuffer::Float32($body),
            RasterBuffer::Float64($array) => RasterBuffer::Float64($body),
        }
    };
}

/// Matches two buffers of the same variant, falling back when they differ.
macro_rules! zip_buffers {
    ($left:expr, $right:expr, ($l:ident, $r:ident) => $body:expr; $fallback:expr) => {
        match ($left, $right) {
            (RasterBuffer::UInt8($l), RasterBuffer::UInt8($r)) => $body,
            (RasterBuffer::UInt16($l), RasterBuffer::UInt16($r)) => $body,
            (RasterBuffer::UInt32($l), RasterBuffer::UInt32($r)) => $body,
            (RasterBuffer::UInt64($l), RasterBuffer::UInt64($r)) => $body,
            (RasterBuffer::Int8($l), RasterBuffer::Int8($r)) => $body,
            (RasterBuffer::Int16($l), RasterBuffer::Int16($r)) => $body,
            (RasterBuffer::Int32($l), RasterBuffer::Int32($r)) => $body,
            (RasterBuffer::Int64($l), RasterBuffer::Int64($r)) => $body,
            (RasterBuffer::Float32($l), RasterBuffer::Float32($r)) => $body,
            (RasterBuffer::Float64($l), RasterBuffer::Float64($r)) => $body,
            _ => $fallback,
        }
    };
}

impl<D: Dimension> RasterBuffer<D> {
    /// Returns the sample type of the wrapped array.
    #[must_use]
    pub fn sample_type(&self) -> SampleType {
        match self {
            RasterBuffer::UInt8(_) => SampleType::UInt8,
            RasterBuffer::UInt16(_) => SampleType::UInt16,
            RasterBuffer::UInt32(_) => SampleType::UInt32,
            RasterBuffer::UInt64(_) => SampleType::UInt64,
            RasterBuffer::Int8(_) => SampleType::Int8,
            RasterBuffer::Int16(_) => SampleType::Int16,
            RasterBuffer::Int32(_) => SampleType::Int32,
            RasterBuffer::Int64(_) => SampleType::Int64,
            RasterBuffer::Float32(_) => SampleType::Float32,
            RasterBuffer::Float64(_) => SampleType::Float64,
        }
    }

    /// Returns the array shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        for_each_buffer!(self, array => array.shape())
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        for_each_buffer!(self, array => array.len())
    }

    /// Returns `true` when the array holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts every sample to `f32`. Wider types lose precision.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn to_float32(&self) -> Self {
        RasterBuffer::Float32(for_each_buffer!(self, array => array.mapv(|v| v as f32)))
    }

    /// Converts every sample to `f64`. 64-bit integers beyond 2^53 lose precision.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_float64(&self) -> Self {
        RasterBuffer::Float64(for_each_buffer!(self, array => array.mapv(|v| v as f64)))
    }
}

impl RasterBuffer<Ix2> {
    /// Returns `(rows, columns)`.
    #[must_use]
    pub fn dim(&self) -> (usize, usize) {
        for_each_buffer!(self, array => array.dim())
    }
}

impl RasterBuffer<Ix3> {
    /// Allocates a zero-filled cube of the given sample type.
    #[must_use]
    pub fn zeros(sample_type: SampleType, shape: (usize, usize, usize)) -> Self {
        match sample_type {
            SampleType::UInt8 => RasterBuffer::UInt8(Array3::zeros(shape)),
            SampleType::UInt16 => RasterBuffer::UInt16(Array3::zeros(shape)),
            SampleType::UInt32 => RasterBuffer::UInt32(Array3::zeros(shape)),
            SampleType::UInt64 => RasterBuffer::UInt64(Array3::zeros(shape)),
            SampleType::Int8 => RasterBuffer::Int8(Array3::zeros(shape)),
            SampleType::Int16 => RasterBuffer::Int16(Array3::zeros(shape)),
            SampleType::Int32 => RasterBuffer::Int32(Array3::zeros(shape)),
            SampleType::Int64 => RasterBuffer::Int64(Array3::zeros(shape)),
            SampleType::Float32 => RasterBuffer::Float32(Array3::zeros(shape)),
            SampleType::Float64 => RasterBuffer::Float64(Array3::zeros(shape)),
        }
    }

    /// Returns `(slices, rows, columns)`.
    #[must_use]
    pub fn dim(&self) -> (usize, usize, usize) {
        for_each_buffer!(self, array => array.dim())
    }

    /// Number of slices along the first axis.
    #[must_use]
    pub fn slice_count(&self) -> usize {
        self.dim().0
    }

    /// Copies out the band at `index`, or `None` past the last slice.
    #[must_use]
    pub fn slice(&self, index: usize) -> Option<BandArray> {
        if index >= self.slice_count() {
            return None;
        }
        Some(map_buffer!(self, array => array.index_axis(Axis(0), index).to_owned()))
    }

    /// Overwrites the slice at `index` with `band`.
    ///
    /// # Errors
    ///
    /// Fails when `index` is out of bounds or when `band` differs in sample type
    /// or row/column shape.
    pub fn assign_slice(
        &mut self,
        index: usize,
        band: &BandArray,
    ) -> Result<(), RasterBufferError> {
        let (count, rows, cols) = self.dim();
        if index >= count {
            return Err(RasterBufferError::SliceOutOfBounds { index, count });
        }
        let (band_rows, band_cols) = band.dim();
        if (band_rows, band_cols) != (rows, cols) {
            return Err(RasterBufferError::ShapeMismatch {
                expected: vec![rows, cols],
                found: vec![band_rows, band_cols],
            });
        }

        let expected = self.sample_type();
        let found = band.sample_type();
        zip_buffers!(self, band, (cube, plane) => {
            cube.index_axis_mut(Axis(0), index).assign(plane);
            Ok(())
        }; Err(RasterBufferError::TypeMismatch { expected, found }))
    }

    /// Stacks bands of identical type and shape into a cube, in order.
    ///
    /// # Errors
    ///
    /// Fails on an empty list or on any type or shape disagreement with the
    /// first band.
    pub fn stack(bands: &[BandArray]) -> Result<Self, RasterBufferError> {
        let first = bands.first().ok_or(RasterBufferError::Empty)?;
        let (rows, cols) = first.dim();
        let mut cube = Self::zeros(first.sample_type(), (bands.len(), rows, cols));
        for (index, band) in bands.iter().enumerate() {
            cube.assign_slice(index, band)?;
        }
        Ok(cube)
    }
}
