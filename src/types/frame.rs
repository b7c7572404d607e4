//! Decoded frame types

use serde::Serialize;

use super::{DType, Element, Value};
use crate::DecodeError;

/// Frame metadata carried in the first message part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameHeader {
    /// Element type of the payload
    pub dtype: DType,

    /// (rows, cols), both positive
    pub shape: (usize, usize),

    /// Producer frame number, when the producer sends one
    #[serde(rename = "frame_num", skip_serializing_if = "Option::is_none")]
    pub frame_number: Option<u64>,

    /// Header keys the decoder does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FrameHeader {
    /// Create a header with no frame number and no extra keys.
    pub fn new(dtype: DType, rows: usize, cols: usize) -> Self {
        Self { dtype, shape: (rows, cols), frame_number: None, extra: serde_json::Map::new() }
    }

    /// Attach a producer frame number.
    pub fn with_frame_number(mut self, frame_number: u64) -> Self {
        self.frame_number = Some(frame_number);
        self
    }

    pub fn rows(&self) -> usize {
        self.shape.0
    }

    pub fn cols(&self) -> usize {
        self.shape.1
    }

    /// Number of elements, or `None` on overflow.
    pub fn element_count(&self) -> Option<usize> {
        self.shape.0.checked_mul(self.shape.1)
    }

    /// Expected payload size in bytes, or `None` on overflow.
    pub fn payload_len(&self) -> Option<usize> {
        self.element_count()?.checked_mul(self.dtype.size())
    }
}

/// Row-major element buffer, one variant per element type.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameData {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! each_variant {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            FrameData::Int8($values) => $body,
            FrameData::UInt8($values) => $body,
            FrameData::Int16($values) => $body,
            FrameData::UInt16($values) => $body,
            FrameData::Int32($values) => $body,
            FrameData::UInt32($values) => $body,
            FrameData::Int64($values) => $body,
            FrameData::UInt64($values) => $body,
            FrameData::Float32($values) => $body,
            FrameData::Float64($values) => $body,
        }
    };
}

impl FrameData {
    /// Element type held by this buffer.
    pub fn dtype(&self) -> DType {
        match self {
            FrameData::Int8(_) => DType::Int8,
            FrameData::UInt8(_) => DType::UInt8,
            FrameData::Int16(_) => DType::Int16,
            FrameData::UInt16(_) => DType::UInt16,
            FrameData::Int32(_) => DType::Int32,
            FrameData::UInt32(_) => DType::UInt32,
            FrameData::Int64(_) => DType::Int64,
            FrameData::UInt64(_) => DType::UInt64,
            FrameData::Float32(_) => DType::Float32,
            FrameData::Float64(_) => DType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at a flat row-major index.
    pub fn get(&self, index: usize) -> Option<Value> {
        each_variant!(self, values => values.get(index).map(|v| v.into_value()))
    }

    /// Serialize in native byte order.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.dtype().size());
        each_variant!(self, values => {
            for value in values {
                value.write_ne(&mut out);
            }
        });
        out
    }

    /// Every element widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        each_variant!(self, values => values.iter().map(|v| v.into_value().as_f64()).collect())
    }
}

/// One decoded 2-D frame.
///
/// Constructed fresh per successful decode and handed to exactly one sink; the
/// receiver keeps no reference to it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: FrameHeader,
    pub data: FrameData,
}

impl Frame {
    /// Pair a header with a buffer, checking they agree.
    pub fn new(header: FrameHeader, data: FrameData) -> Result<Self, DecodeError> {
        if header.dtype != data.dtype() {
            return Err(DecodeError::invalid_shape(format!(
                "header declares {} but buffer holds {}",
                header.dtype,
                data.dtype()
            )));
        }

        if header.rows() == 0 || header.cols() == 0 {
            return Err(DecodeError::invalid_shape(format!(
                "dimensions must be positive, got {:?}",
                header.shape
            )));
        }

        let expected = header.element_count().ok_or_else(|| {
            DecodeError::invalid_shape(format!("{:?} overflows element count", header.shape))
        })?;
        if expected != data.len() {
            return Err(DecodeError::invalid_shape(format!(
                "{:?} needs {} elements, buffer holds {}",
                header.shape,
                expected,
                data.len()
            )));
        }

        Ok(Self { header, data })
    }

    /// Build a frame from a typed row-major buffer.
    pub fn from_vec<T: Element>(rows: usize, cols: usize, values: Vec<T>) -> Result<Self, DecodeError> {
        Self::new(FrameHeader::new(T::DTYPE, rows, cols), T::into_data(values))
    }

    pub fn dtype(&self) -> DType {
        self.header.dtype
    }

    pub fn shape(&self) -> (usize, usize) {
        self.header.shape
    }

    pub fn rows(&self) -> usize {
        self.header.rows()
    }

    pub fn cols(&self) -> usize {
        self.header.cols()
    }

    /// Element at (row, col).
    pub fn value(&self, row: usize, col: usize) -> Option<Value> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        self.data.get(row * self.cols() + col)
    }

    /// Borrow the buffer as `&[T]` when `T` matches the frame's element type.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::view(&self.data)
    }

    /// One row as `&[T]`.
    pub fn row<T: Element>(&self, row: usize) -> Option<&[T]> {
        let cols = self.cols();
        self.as_slice::<T>()?.get(row * cols..(row + 1) * cols)
    }

    /// Smallest and largest element as `f64`, ignoring NaN.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.data.to_f64_vec().into_iter().filter(|v| !v.is_nan()).fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}
