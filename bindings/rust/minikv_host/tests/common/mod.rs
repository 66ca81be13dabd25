//! Dispatch helpers mapping `TypedValue` onto the typed accessors.

use minikv_codec::{TypedValue, ValueType};
use minikv_host::{Kv, KvResult};

pub fn put(kv: &Kv, key: &str, value: &TypedValue) -> KvResult<()> {
    match value {
        TypedValue::Bool(v) => kv.put_bool(key, *v),
        TypedValue::I32(v) => kv.put_i32(key, *v),
        TypedValue::I64(v) => kv.put_i64(key, *v),
        TypedValue::F32(v) => kv.put_f32(key, *v),
        TypedValue::F64(v) => kv.put_f64(key, *v),
        TypedValue::Str(v) => kv.put_str(key, v),
        TypedValue::ByteArray(v) => kv.put_byte_array(key, v),
        TypedValue::I32Array(v) => kv.put_i32_array(key, v),
        TypedValue::I64Array(v) => kv.put_i64_array(key, v),
        TypedValue::F32Array(v) => kv.put_f32_array(key, v),
        TypedValue::F64Array(v) => kv.put_f64_array(key, v),
    }
}

pub fn get_as(kv: &Kv, key: &str, value_type: ValueType) -> KvResult<TypedValue> {
    Ok(match value_type {
        ValueType::Bool => TypedValue::Bool(kv.get_bool(key)?),
        ValueType::I32 => TypedValue::I32(kv.get_i32(key)?),
        ValueType::I64 => TypedValue::I64(kv.get_i64(key)?),
        ValueType::F32 => TypedValue::F32(kv.get_f32(key)?),
        ValueType::F64 => TypedValue::F64(kv.get_f64(key)?),
        ValueType::Str => TypedValue::Str(kv.get_str(key)?),
        ValueType::ByteArray => TypedValue::ByteArray(kv.get_byte_array(key)?),
        ValueType::I32Array => TypedValue::I32Array(kv.get_i32_array(key)?),
        ValueType::I64Array => TypedValue::I64Array(kv.get_i64_array(key)?),
        ValueType::F32Array => TypedValue::F32Array(kv.get_f32_array(key)?),
        ValueType::F64Array => TypedValue::F64Array(kv.get_f64_array(key)?),
    })
}
