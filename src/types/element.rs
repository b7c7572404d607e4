//! Typed element parsing from raw payload bytes

use super::{ByteOrder, DType, FrameData, Value};

/// Primitive types that can be stored as frame elements.
pub trait Element: Copy + Send + Sync + 'static {
    /// Element type tag for this primitive.
    const DTYPE: DType;

    /// Decode a payload of whole elements.
    ///
    /// The caller guarantees `bytes.len()` is a multiple of `DTYPE.size()`.
    fn decode_slice(bytes: &[u8], order: ByteOrder) -> Vec<Self>;

    /// Append this element to `out` in native byte order.
    fn write_ne(self, out: &mut Vec<u8>);

    /// Wrap as a runtime [`Value`].
    fn into_value(self) -> Value;

    /// Wrap an owned buffer as [`FrameData`].
    fn into_data(values: Vec<Self>) -> FrameData;

    /// Borrow the buffer if `data` holds this element type.
    fn view(data: &FrameData) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:ident, $size:expr) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn decode_slice(bytes: &[u8], order: ByteOrder) -> Vec<Self> {
                bytes
                    .chunks_exact($size)
                    .map(|chunk| {
                        let mut raw = [0u8; $size];
                        raw.copy_from_slice(chunk);
                        match order {
                            ByteOrder::Little => <$ty>::from_le_bytes(raw),
                            ByteOrder::Big => <$ty>::from_be_bytes(raw),
                        }
                    })
                    .collect()
            }

            fn write_ne(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }

            fn into_value(self) -> Value {
                Value::$dtype(self)
            }

            fn into_data(values: Vec<Self>) -> FrameData {
                FrameData::$dtype(values)
            }

            fn view(data: &FrameData) -> Option<&[Self]> {
                match data {
                    FrameData::$dtype(values) => Some(values),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(i8, Int8, 1);
impl_element!(u8, UInt8, 1);
impl_element!(i16, Int16, 2);
impl_element!(u16, UInt16, 2);
impl_element!(i32, Int32, 4);
impl_element!(u32, UInt32, 4);
impl_element!(i64, Int64, 8);
impl_element!(u64, UInt64, 8);
impl_element!(f32, Float32, 4);
impl_element!(f64, Float64, 8);
