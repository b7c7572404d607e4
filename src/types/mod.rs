//! Core types for frame data representation.
//!
//! - [`DType`] names the element type and its size; [`DType::parse_tag`] understands
//!   numpy names and array-protocol type strings
//! - [`Element`] decodes typed elements from payload bytes without `unsafe`
//! - [`FrameHeader`] is the metadata part of a wire message
//! - [`FrameData`] is an owned row-major buffer, one variant per element type
//! - [`Frame`] pairs the two and guarantees `rows * cols == data.len()`
//!
//! ## Usage Example
//!
//! ```rust
//! use liveview::types::{DType, Frame, Value};
//!
//! let frame = Frame::from_vec(2, 2, vec![1u16, 2, 3, 4]).unwrap();
//! assert_eq!(frame.dtype(), DType::UInt16);
//! assert_eq!(frame.value(1, 0), Some(Value::UInt16(3)));
//! assert_eq!(frame.row::<u16>(0), Some(&[1u16, 2][..]));
//! ```

mod dtype;
mod element;
mod frame;
mod update_rate;

pub use dtype::{ByteOrder, DType, Value};
pub use element::Element;
pub use frame::{Frame, FrameData, FrameHeader};
pub use update_rate::UpdateRate;
