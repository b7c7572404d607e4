//! Test helpers: frame builders, wire messages and a recording sink
//!
//! Shared by unit tests and benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::{Arc, Mutex, PoisonError};

use crate::codec::{RawMessage, decode_frame, encode_frame};
use crate::sink::FrameSink;
use crate::types::{DType, Frame};

/// `rows x cols` uint16 frame holding `0, 1, 2, ...` in row-major order.
pub fn ramp_frame(rows: usize, cols: usize) -> Frame {
    let values: Vec<u16> = (0..rows * cols).map(|i| i as u16).collect();
    Frame::from_vec(rows, cols, values).unwrap()
}

/// Frame of any element type with a deterministic byte pattern.
pub fn patterned_frame(dtype: DType, rows: usize, cols: usize) -> Frame {
    let message = patterned_message(dtype, rows, cols);
    decode_frame(&message.header, &message.payload).unwrap()
}

/// Well-formed wire message for a `rows x cols` frame of `dtype`.
pub fn patterned_message(dtype: DType, rows: usize, cols: usize) -> RawMessage {
    let header = serde_json::json!({ "dtype": dtype.as_str(), "shape": [rows, cols] });
    // Small values so float patterns stay finite
    let payload = (0..rows * cols * dtype.size())
        .map(|i| if i % dtype.size() == 0 { (i % 97) as u8 } else { 0 })
        .collect::<Vec<u8>>();
    RawMessage::new(serde_json::to_vec(&header).unwrap(), payload)
}

/// Wire message for an existing frame.
pub fn message_for(frame: &Frame) -> RawMessage {
    encode_frame(frame).unwrap()
}

/// Message whose payload is one byte short of what the header declares.
pub fn truncated_message(dtype: DType, rows: usize, cols: usize) -> RawMessage {
    let mut message = patterned_message(dtype, rows, cols);
    message.payload.pop();
    message
}

/// Sink that records every emission. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    emissions: Arc<Mutex<Vec<Option<Frame>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every emission so far, `None` included
    pub fn emissions(&self) -> Vec<Option<Frame>> {
        self.emissions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Only the emitted frames
    pub fn frames(&self) -> Vec<Frame> {
        self.emissions().into_iter().flatten().collect()
    }

    pub fn len(&self) -> usize {
        self.emissions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FrameSink for RecordingSink {
    fn emit(&mut self, frame: Option<Frame>) {
        self.emissions.lock().unwrap_or_else(PoisonError::into_inner).push(frame);
    }
}
