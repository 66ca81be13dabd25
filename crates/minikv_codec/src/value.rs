//! Typed value model.

use serde::Serialize;
use std::fmt;

/// Discriminant of a [`TypedValue`].
///
/// The numeric value is both the on-disk tag byte and the type token the
/// C ABI hands to hosts, so the discriminants are fixed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// 32-bit signed integer.
    I32 = 0,
    /// UTF-8 string.
    Str = 1,
    /// Boolean.
    Bool = 2,
    /// 64-bit signed integer.
    I64 = 3,
    /// 32-bit float.
    F32 = 4,
    /// 64-bit float.
    F64 = 5,
    /// Raw bytes.
    ByteArray = 6,
    /// Array of `i32`.
    I32Array = 7,
    /// Array of `i64`.
    I64Array = 8,
    /// Array of `f32`.
    F32Array = 9,
    /// Array of `f64`.
    F64Array = 10,
}

impl ValueType {
    /// Every value type in tag order.
    pub const ALL: [ValueType; 11] = [
        ValueType::I32,
        ValueType::Str,
        ValueType::Bool,
        ValueType::I64,
        ValueType::F32,
        ValueType::F64,
        ValueType::ByteArray,
        ValueType::I32Array,
        ValueType::I64Array,
        ValueType::F32Array,
        ValueType::F64Array,
    ];

    /// Parses a tag byte.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    /// Returns the tag byte.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Element width in bytes for array types, `None` for everything else.
    #[must_use]
    pub const fn element_width(self) -> Option<usize> {
        match self {
            ValueType::ByteArray => Some(1),
            ValueType::I32Array | ValueType::F32Array => Some(4),
            ValueType::I64Array | ValueType::F64Array => Some(8),
            _ => None,
        }
    }

    /// Lowercase name used in logs and CLI output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::I32 => "i32",
            ValueType::Str => "str",
            ValueType::Bool => "bool",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::ByteArray => "byte_array",
            ValueType::I32Array => "i32_array",
            ValueType::I64Array => "i64_array",
            ValueType::F32Array => "f32_array",
            ValueType::F64Array => "f64_array",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value stored under a key. Exactly one variant at a time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    /// Boolean.
    Bool(bool),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 32-bit float, preserved bit-exact.
    F32(f32),
    /// 64-bit float, preserved bit-exact.
    F64(f64),
    /// UTF-8 string.
    Str(String),
    /// Raw bytes.
    ByteArray(Vec<u8>),
    /// Array of `i32`.
    I32Array(Vec<i32>),
    /// Array of `i64`.
    I64Array(Vec<i64>),
    /// Array of `f32`.
    F32Array(Vec<f32>),
    /// Array of `f64`.
    F64Array(Vec<f64>),
}

impl TypedValue {
    /// Returns the discriminant.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::Bool(_) => ValueType::Bool,
            TypedValue::I32(_) => ValueType::I32,
            TypedValue::I64(_) => ValueType::I64,
            TypedValue::F32(_) => ValueType::F32,
            TypedValue::F64(_) => ValueType::F64,
            TypedValue::Str(_) => ValueType::Str,
            TypedValue::ByteArray(_) => ValueType::ByteArray,
            TypedValue::I32Array(_) => ValueType::I32Array,
            TypedValue::I64Array(_) => ValueType::I64Array,
            TypedValue::F32Array(_) => ValueType::F32Array,
            TypedValue::F64Array(_) => ValueType::F64Array,
        }
    }

    /// Compares two values by their stored representation, so `NaN`
    /// payloads and negative zero compare bit-exact.
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypedValue::F32(a), TypedValue::F32(b)) => a.to_bits() == b.to_bits(),
            (TypedValue::F64(a), TypedValue::F64(b)) => a.to_bits() == b.to_bits(),
            (TypedValue::F32Array(a), TypedValue::F32Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (TypedValue::F64Array(a), TypedValue::F64Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => self == other,
        }
    }
}

/// Rust types that can be stored under a key.
///
/// Each implementor maps to exactly one [`ValueType`]; reading a key stored
/// with another type is a type mismatch, never a conversion.
pub trait Storable: Sized {
    /// The tag this type is stored under.
    const VALUE_TYPE: ValueType;

    /// Wraps the value.
    fn into_value(self) -> TypedValue;

    /// Unwraps a value of the matching variant.
    fn from_value(value: TypedValue) -> Option<Self>;
}

macro_rules! impl_storable {
    ($($ty:ty => $variant:ident;)+) => {
        $(
            impl Storable for $ty {
                const VALUE_TYPE: ValueType = ValueType::$variant;

                fn into_value(self) -> TypedValue {
                    TypedValue::$variant(self)
                }

                fn from_value(value: TypedValue) -> Option<Self> {
                    match value {
                        TypedValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for TypedValue {
                fn from(value: $ty) -> Self {
                    TypedValue::$variant(value)
                }
            }
        )+
    };
}

impl_storable! {
    bool => Bool;
    i32 => I32;
    i64 => I64;
    f32 => F32;
    f64 => F64;
    String => Str;
    Vec<u8> => ByteArray;
    Vec<i32> => I32Array;
    Vec<i64> => I64Array;
    Vec<f32> => F32Array;
    Vec<f64> => F64Array;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_positions() {
        for (index, ty) in ValueType::ALL.iter().enumerate() {
            assert_eq!(usize::from(ty.tag()), index);
            assert_eq!(ValueType::from_tag(ty.tag()), Some(*ty));
        }
        assert_eq!(ValueType::from_tag(11), None);
    }

    #[test]
    fn value_type_follows_variant() {
        assert_eq!(TypedValue::from(true).value_type(), ValueType::Bool);
        assert_eq!(TypedValue::from(vec![1u8]).value_type(), ValueType::ByteArray);
        assert_eq!(
            TypedValue::from(String::from("x")).value_type(),
            ValueType::Str
        );
    }

    #[test]
    fn storable_rejects_other_variants() {
        assert_eq!(i32::from_value(TypedValue::I64(1)), None);
        assert_eq!(i64::from_value(TypedValue::I64(1)), Some(1));
    }

    #[test]
    fn bit_eq_distinguishes_signed_zero_and_matches_nan() {
        let nan = TypedValue::F64(f64::NAN);
        assert!(nan.bit_eq(&nan.clone()));
        assert!(!TypedValue::F32(0.0).bit_eq(&TypedValue::F32(-0.0)));
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&TypedValue::I32Array(vec![1, 2])).unwrap();
        assert_eq!(json, r#"{"type":"i32_array","value":[1,2]}"#);
    }
}
