//! Frame codec: (header, payload) message pairs to and from [`Frame`]s.
//!
//! The header part is a JSON record with at least `dtype` and `shape`:
//!
//! ```json
//! {"dtype": "uint16", "shape": ["512", "256"], "frame_num": 17, "acquisition_id": "run1"}
//! ```
//!
//! Shape entries may be integers or decimal strings. `frame_num` is optional and
//! every other key is kept in [`FrameHeader::extra`]. The payload part must be
//! exactly `rows * cols * dtype.size()` bytes, row-major.
//!
//! Decoding has no side effects and never returns a partially built frame.

use serde::Deserialize;
use serde_json::Value as Json;

use crate::DecodeError;
use crate::types::{ByteOrder, DType, Element, Frame, FrameData, FrameHeader};

/// One two-part wire message as it comes off the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
}

impl RawMessage {
    pub fn new(header: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self { header: header.into(), payload: payload.into() }
    }

    /// Decode this message into a frame.
    pub fn decode(&self) -> Result<Frame, DecodeError> {
        decode_frame(&self.header, &self.payload)
    }
}

#[derive(Deserialize)]
struct WireHeader {
    dtype: String,
    shape: Vec<Json>,
    #[serde(default, alias = "frame_number")]
    frame_num: Option<Json>,
    #[serde(flatten)]
    extra: serde_json::Map<String, Json>,
}

/// Parse the header part, returning the header and the payload byte order.
pub fn parse_header(header: &[u8]) -> Result<(FrameHeader, ByteOrder), DecodeError> {
    let wire: WireHeader = serde_json::from_slice(header).map_err(DecodeError::Header)?;

    let (dtype, order) = DType::parse_tag(&wire.dtype)
        .ok_or_else(|| DecodeError::UnsupportedDType { tag: wire.dtype.clone() })?;

    let [rows, cols] = wire.shape.as_slice() else {
        return Err(DecodeError::invalid_shape(format!(
            "expected 2 dimensions, got {}",
            wire.shape.len()
        )));
    };
    let shape = (dimension(rows)?, dimension(cols)?);

    // Frame numbers are informational; an unreadable one is dropped, not fatal
    let frame_number = wire.frame_num.as_ref().and_then(as_u64);

    let header = FrameHeader { dtype, shape, frame_number, extra: wire.extra };
    Ok((header, order))
}

/// Decode a header/payload pair into a [`Frame`].
pub fn decode_frame(header: &[u8], payload: &[u8]) -> Result<Frame, DecodeError> {
    let (header, order) = parse_header(header)?;

    let expected = header.payload_len().ok_or_else(|| {
        DecodeError::invalid_shape(format!("{:?} of {} overflows", header.shape, header.dtype))
    })?;
    if payload.len() != expected {
        return Err(DecodeError::PayloadLength { expected, actual: payload.len() });
    }

    let data = match header.dtype {
        DType::Int8 => decode_as::<i8>(payload, order),
        DType::UInt8 => decode_as::<u8>(payload, order),
        DType::Int16 => decode_as::<i16>(payload, order),
        DType::UInt16 => decode_as::<u16>(payload, order),
        DType::Int32 => decode_as::<i32>(payload, order),
        DType::UInt32 => decode_as::<u32>(payload, order),
        DType::Int64 => decode_as::<i64>(payload, order),
        DType::UInt64 => decode_as::<u64>(payload, order),
        DType::Float32 => decode_as::<f32>(payload, order),
        DType::Float64 => decode_as::<f64>(payload, order),
    };

    Ok(Frame { header, data })
}

/// Encode a frame as a wire message (native byte order).
pub fn encode_frame(frame: &Frame) -> serde_json::Result<RawMessage> {
    let header = serde_json::to_vec(&frame.header)?;
    Ok(RawMessage { header, payload: frame.data.to_ne_bytes() })
}

fn decode_as<T: Element>(payload: &[u8], order: ByteOrder) -> FrameData {
    T::into_data(T::decode_slice(payload, order))
}

fn dimension(value: &Json) -> Result<usize, DecodeError> {
    let parsed = match value {
        Json::Number(n) => n.as_u64(),
        Json::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed.and_then(|n| usize::try_from(n).ok()) {
        Some(0) => Err(DecodeError::invalid_shape("dimensions must be positive")),
        Some(n) => Ok(n),
        None => Err(DecodeError::invalid_shape(format!("'{}' is not a positive integer", value))),
    }
}

fn as_u64(value: &Json) -> Option<u64> {
    match value {
        Json::Number(n) => n.as_u64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
