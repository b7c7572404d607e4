//! Frame element type definitions

use serde::{Deserialize, Serialize};

/// Supported frame element types.
///
/// Serializes as the numpy-style lowercase name (`"uint16"`, `"float32"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 8-bit signed integer
    Int8,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit signed integer
    Int16,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit signed integer
    Int32,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
}

/// Byte order of a payload as declared by the header tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the running platform.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") { ByteOrder::Big } else { ByteOrder::Little }
    }
}

impl DType {
    /// All supported element types.
    pub const ALL: [DType; 10] = [
        DType::Int8,
        DType::UInt8,
        DType::Int16,
        DType::UInt16,
        DType::Int32,
        DType::UInt32,
        DType::Int64,
        DType::UInt64,
        DType::Float32,
        DType::Float64,
    ];

    /// Returns the size in bytes of one element.
    pub const fn size(&self) -> usize {
        match self {
            DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 => 8,
        }
    }

    /// Canonical numpy-style name, as written by the encoder.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::UInt8 => "uint8",
            DType::Int16 => "int16",
            DType::UInt16 => "uint16",
            DType::Int32 => "int32",
            DType::UInt32 => "uint32",
            DType::Int64 => "int64",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    /// Parse a header `dtype` tag.
    ///
    /// Accepts numpy names (`"uint16"`, `"double"`) which are native byte order,
    /// and array-protocol type strings such as `"<f4"`, `">u2"` or `"|u1"`.
    /// Returns `None` for anything unrecognized.
    pub fn parse_tag(tag: &str) -> Option<(DType, ByteOrder)> {
        let tag = tag.trim();
        if let Some(dtype) = Self::from_name(tag) {
            return Some((dtype, ByteOrder::native()));
        }

        let (order, rest) = match tag.as_bytes().first()? {
            b'<' => (Some(ByteOrder::Little), &tag[1..]),
            b'>' => (Some(ByteOrder::Big), &tag[1..]),
            b'=' => (Some(ByteOrder::native()), &tag[1..]),
            b'|' => (None, &tag[1..]),
            _ => (Some(ByteOrder::native()), tag),
        };

        let mut chars = rest.chars();
        let kind = chars.next()?;

        // Width must be the exact digit; "u02" or "u+2" are not type strings
        let dtype = match (kind, chars.as_str()) {
            ('i', "1") => DType::Int8,
            ('u', "1") => DType::UInt8,
            ('i', "2") => DType::Int16,
            ('u', "2") => DType::UInt16,
            ('i', "4") => DType::Int32,
            ('u', "4") => DType::UInt32,
            ('i', "8") => DType::Int64,
            ('u', "8") => DType::UInt64,
            ('f', "4") => DType::Float32,
            ('f', "8") => DType::Float64,
            _ => return None,
        };

        // '|' means byte order does not apply, which only holds for single bytes
        match order {
            Some(order) => Some((dtype, order)),
            None if dtype.size() == 1 => Some((dtype, ByteOrder::native())),
            None => None,
        }
    }

    fn from_name(name: &str) -> Option<DType> {
        let dtype = match name {
            "int8" => DType::Int8,
            "uint8" => DType::UInt8,
            "int16" => DType::Int16,
            "uint16" => DType::UInt16,
            "int32" => DType::Int32,
            "uint32" => DType::UInt32,
            "int64" => DType::Int64,
            "uint64" => DType::UInt64,
            "float32" | "single" => DType::Float32,
            "float64" | "float" | "double" => DType::Float64,
            _ => return None,
        };
        Some(dtype)
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime value of a single frame element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl Value {
    /// Widen to `f64` (lossy for 64-bit integers beyond 2^53).
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Int8(v) => v as f64,
            Value::UInt8(v) => v as f64,
            Value::Int16(v) => v as f64,
            Value::UInt16(v) => v as f64,
            Value::Int32(v) => v as f64,
            Value::UInt32(v) => v as f64,
            Value::Int64(v) => v as f64,
            Value::UInt64(v) => v as f64,
            Value::Float32(v) => v as f64,
            Value::Float64(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_canonical_names_parse_back(dtype in prop::sample::select(DType::ALL.to_vec())) {
            let (parsed, order) = DType::parse_tag(dtype.as_str()).expect("canonical name parses");
            prop_assert_eq!(parsed, dtype);
            prop_assert_eq!(order, ByteOrder::native());
        }

        #[test]
        fn prop_unknown_tags_rejected(tag in "[a-z]{1,3}[0-9]{2,3}") {
            // Widths of two or more digits are never valid element sizes.
            prop_assume!(DType::from_name(&tag).is_none());
            prop_assert!(DType::parse_tag(&tag).is_none());
        }
    }

    #[test]
    fn dtype_size_returns_correct_values() {
        assert_eq!(DType::Int8.size(), 1);
        assert_eq!(DType::UInt8.size(), 1);
        assert_eq!(DType::Int16.size(), 2);
        assert_eq!(DType::UInt16.size(), 2);
        assert_eq!(DType::Int32.size(), 4);
        assert_eq!(DType::UInt32.size(), 4);
        assert_eq!(DType::Float32.size(), 4);
        assert_eq!(DType::Int64.size(), 8);
        assert_eq!(DType::UInt64.size(), 8);
        assert_eq!(DType::Float64.size(), 8);
    }

    #[test]
    fn array_protocol_tags() {
        assert_eq!(DType::parse_tag("<u2"), Some((DType::UInt16, ByteOrder::Little)));
        assert_eq!(DType::parse_tag(">f8"), Some((DType::Float64, ByteOrder::Big)));
        assert_eq!(DType::parse_tag("|u1"), Some((DType::UInt8, ByteOrder::native())));
        assert_eq!(DType::parse_tag("i4"), Some((DType::Int32, ByteOrder::native())));
        assert_eq!(DType::parse_tag("=f4"), Some((DType::Float32, ByteOrder::native())));
        assert_eq!(DType::parse_tag("double"), Some((DType::Float64, ByteOrder::native())));
    }

    #[test]
    fn rejects_unsupported_tags() {
        assert_eq!(DType::parse_tag(""), None);
        assert_eq!(DType::parse_tag("complex64"), None);
        assert_eq!(DType::parse_tag("<c8"), None);
        assert_eq!(DType::parse_tag("|u2"), None);
        assert_eq!(DType::parse_tag("f16"), None);
        assert_eq!(DType::parse_tag("bool"), None);
    }

    #[test]
    fn rejects_padded_or_signed_widths() {
        for tag in ["u01", "i08", "f04", "u+2", "<i04", ">f+8", "|u01"] {
            assert_eq!(DType::parse_tag(tag), None, "{tag} should not parse");
        }
    }

    #[test]
    fn serializes_as_lowercase_name() {
        let json = serde_json::to_string(&DType::UInt16).unwrap();
        assert_eq!(json, "\"uint16\"");
        let back: DType = serde_json::from_str("\"float64\"").unwrap();
        assert_eq!(back, DType::Float64);
    }

    #[test]
    fn value_widens_to_f64() {
        assert_eq!(Value::UInt16(512).as_f64(), 512.0);
        assert_eq!(Value::Int8(-3).as_f64(), -3.0);
        assert_eq!(Value::Float32(1.5).as_f64(), 1.5);
    }
}
