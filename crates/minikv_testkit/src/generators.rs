//! Property-based test generators using proptest.

use minikv_codec::{TypedValue, ValueType};
use proptest::prelude::*;

/// Keys drawn from a small alphabet so sequences revisit them.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-d]{1,2}").expect("valid regex")
}

/// Arbitrary keys, including non-ASCII text.
pub fn any_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_.é日-]{1,24}").expect("valid regex")
}

/// Any value type.
pub fn value_type_strategy() -> impl Strategy<Value = ValueType> {
    prop::sample::select(ValueType::ALL.to_vec())
}

/// Any float bit pattern, NaN payloads and subnormals included.
fn f32_bits() -> impl Strategy<Value = f32> {
    any::<u32>().prop_map(f32::from_bits)
}

fn f64_bits() -> impl Strategy<Value = f64> {
    any::<u64>().prop_map(f64::from_bits)
}

/// A value of any type with arbitrary contents.
pub fn typed_value_strategy() -> impl Strategy<Value = TypedValue> {
    let len = 0..32usize;
    prop_oneof![
        any::<bool>().prop_map(TypedValue::Bool),
        any::<i32>().prop_map(TypedValue::I32),
        any::<i64>().prop_map(TypedValue::I64),
        f32_bits().prop_map(TypedValue::F32),
        f64_bits().prop_map(TypedValue::F64),
        any::<String>().prop_map(TypedValue::Str),
        prop::collection::vec(any::<u8>(), len.clone()).prop_map(TypedValue::ByteArray),
        prop::collection::vec(any::<i32>(), len.clone()).prop_map(TypedValue::I32Array),
        prop::collection::vec(any::<i64>(), len.clone()).prop_map(TypedValue::I64Array),
        prop::collection::vec(f32_bits(), len.clone()).prop_map(TypedValue::F32Array),
        prop::collection::vec(f64_bits(), len).prop_map(TypedValue::F64Array),
    ]
}

/// Boundary values for every type: integer MIN/MAX/0, float MIN_POSITIVE,
/// MAX, negative zero, infinities and NaN payloads, empty strings and
/// arrays.
pub fn extreme_values() -> Vec<TypedValue> {
    let quiet_nan32 = f32::from_bits(0x7fc0_0001);
    let signal_nan32 = f32::from_bits(0x7f80_0001);
    let quiet_nan64 = f64::from_bits(0x7ff8_0000_0000_0001);
    let signal_nan64 = f64::from_bits(0x7ff0_0000_0000_0001);
    vec![
        TypedValue::Bool(false),
        TypedValue::Bool(true),
        TypedValue::I32(i32::MIN),
        TypedValue::I32(0),
        TypedValue::I32(i32::MAX),
        TypedValue::I64(i64::MIN),
        TypedValue::I64(0),
        TypedValue::I64(i64::MAX),
        TypedValue::F32(f32::MIN_POSITIVE),
        TypedValue::F32(f32::MAX),
        TypedValue::F32(f32::MIN),
        TypedValue::F32(-0.0),
        TypedValue::F32(f32::INFINITY),
        TypedValue::F32(quiet_nan32),
        TypedValue::F32(signal_nan32),
        TypedValue::F64(f64::MIN_POSITIVE),
        TypedValue::F64(f64::MAX),
        TypedValue::F64(f64::MIN),
        TypedValue::F64(-0.0),
        TypedValue::F64(f64::NEG_INFINITY),
        TypedValue::F64(quiet_nan64),
        TypedValue::F64(signal_nan64),
        TypedValue::Str(String::new()),
        TypedValue::Str("日本語 ✓ \u{0}".to_owned()),
        TypedValue::ByteArray(Vec::new()),
        TypedValue::ByteArray(vec![0, 0xff, 0x80]),
        TypedValue::I32Array(vec![i32::MIN, 0, i32::MAX]),
        TypedValue::I64Array(vec![i64::MIN, 0, i64::MAX]),
        TypedValue::F32Array(vec![f32::MIN_POSITIVE, -0.0, f32::MAX, quiet_nan32]),
        TypedValue::F64Array(vec![f64::MIN_POSITIVE, -0.0, f64::MAX, signal_nan64]),
        TypedValue::F64Array(Vec::new()),
    ]
}

/// One step of a random accessor sequence.
#[derive(Debug, Clone)]
pub enum KvOp {
    /// Store a value.
    Put {
        /// Target key.
        key: String,
        /// Value to store.
        value: TypedValue,
    },
    /// Read a key as the given type.
    Get {
        /// Target key.
        key: String,
        /// Requested type, which may not match the stored one.
        value_type: ValueType,
    },
    /// Remove a key.
    Delete {
        /// Target key.
        key: String,
    },
    /// Close the store.
    Close,
    /// Open the store again.
    Reopen,
}

/// A single operation, weighted towards puts and gets.
pub fn op_strategy() -> impl Strategy<Value = KvOp> {
    prop_oneof![
        4 => (key_strategy(), typed_value_strategy())
            .prop_map(|(key, value)| KvOp::Put { key, value }),
        4 => (key_strategy(), value_type_strategy())
            .prop_map(|(key, value_type)| KvOp::Get { key, value_type }),
        2 => key_strategy().prop_map(|key| KvOp::Delete { key }),
        1 => Just(KvOp::Close),
        1 => Just(KvOp::Reopen),
    ]
}

/// A sequence of up to `max_len` operations.
pub fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<KvOp>> {
    prop::collection::vec(op_strategy(), 0..max_len)
}
