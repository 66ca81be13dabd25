//! # minikv codec
//!
//! The typed value model shared by the engine, the C ABI and the host
//! binding, plus the payload encoding the journal stores.
//!
//! Every stored value carries a [`ValueType`] tag. Payloads are
//! little-endian; strings and arrays carry a `u32` length prefix. Floats are
//! stored through `to_bits`, so every bit pattern (negative zero, `NaN`
//! payloads) survives a round trip.
//!
//! ```
//! use minikv_codec::{decode_payload, encode_payload, TypedValue};
//!
//! let value = TypedValue::Str("hello".into());
//! let bytes = encode_payload(&value).unwrap();
//! assert_eq!(decode_payload(value.value_type(), &bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{decode_payload, PayloadDecoder};
pub use encoder::{encode_payload, PayloadEncoder};
pub use error::{CodecError, CodecResult};
pub use value::{Storable, TypedValue, ValueType};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = TypedValue> {
        prop_oneof![
            any::<bool>().prop_map(TypedValue::Bool),
            any::<i32>().prop_map(TypedValue::I32),
            any::<i64>().prop_map(TypedValue::I64),
            any::<u32>().prop_map(|b| TypedValue::F32(f32::from_bits(b))),
            any::<u64>().prop_map(|b| TypedValue::F64(f64::from_bits(b))),
            ".*".prop_map(TypedValue::Str),
            prop::collection::vec(any::<u8>(), 0..64).prop_map(TypedValue::ByteArray),
            prop::collection::vec(any::<i32>(), 0..32).prop_map(TypedValue::I32Array),
            prop::collection::vec(any::<i64>(), 0..32).prop_map(TypedValue::I64Array),
            prop::collection::vec(any::<u32>().prop_map(f32::from_bits), 0..32)
                .prop_map(TypedValue::F32Array),
            prop::collection::vec(any::<u64>().prop_map(f64::from_bits), 0..32)
                .prop_map(TypedValue::F64Array),
        ]
    }

    proptest! {
        #[test]
        fn payloads_are_bit_exact(value in arb_value()) {
            let bytes = encode_payload(&value).unwrap();
            let decoded = decode_payload(value.value_type(), &bytes).unwrap();
            prop_assert!(decoded.bit_eq(&value), "{:?} != {:?}", decoded, value);
        }

        #[test]
        fn truncated_payloads_never_decode(value in arb_value(), cut in 1usize..8) {
            let bytes = encode_payload(&value).unwrap();
            let keep = bytes.len().saturating_sub(cut);
            prop_assume!(keep < bytes.len());
            prop_assert!(decode_payload(value.value_type(), &bytes[..keep]).is_err());
        }
    }
}
