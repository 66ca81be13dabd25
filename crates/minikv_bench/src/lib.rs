//! Benchmark utilities.

#![warn(missing_docs)]

use minikv_codec::TypedValue;
use rand::Rng;

/// Random bytes.
pub fn random_bytes(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Random doubles.
pub fn random_f64s(count: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen()).collect()
}

/// Keys `prefix0`, `prefix1`, ...
pub fn keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}

/// One value of each shape at the given array length.
pub fn sample_values(len: usize) -> Vec<(&'static str, TypedValue)> {
    vec![
        ("bool", TypedValue::Bool(true)),
        ("i64", TypedValue::I64(i64::MAX)),
        ("f64", TypedValue::F64(std::f64::consts::PI)),
        ("str", TypedValue::Str("x".repeat(len))),
        ("byte_array", TypedValue::ByteArray(random_bytes(len))),
        ("f64_array", TypedValue::F64Array(random_f64s(len))),
    ]
}
