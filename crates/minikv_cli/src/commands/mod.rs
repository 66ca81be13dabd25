//! CLI command implementations.

pub mod clear;
pub mod compact;
pub mod dump;
pub mod get;
pub mod inspect;

use minikv_codec::TypedValue;

/// How a command prints its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Renders a value for text output.
pub fn display_value(value: &TypedValue) -> String {
    match value {
        TypedValue::Bool(v) => v.to_string(),
        TypedValue::I32(v) => v.to_string(),
        TypedValue::I64(v) => v.to_string(),
        TypedValue::F32(v) => format!("{v:?}"),
        TypedValue::F64(v) => format!("{v:?}"),
        TypedValue::Str(v) => format!("{v:?}"),
        TypedValue::ByteArray(v) => format!("0x{}", hex::encode(v)),
        TypedValue::I32Array(v) => format!("{v:?}"),
        TypedValue::I64Array(v) => format!("{v:?}"),
        TypedValue::F32Array(v) => format!("{v:?}"),
        TypedValue::F64Array(v) => format!("{v:?}"),
    }
}

/// Formats a byte count.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_rendering() {
        assert_eq!(display_value(&TypedValue::Str("a\"b".into())), r#""a\"b""#);
        assert_eq!(display_value(&TypedValue::ByteArray(vec![0, 255])), "0x00ff");
        assert_eq!(display_value(&TypedValue::F64(-0.0)), "-0.0");
        assert_eq!(display_value(&TypedValue::I32Array(vec![1, 2])), "[1, 2]");
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(10), "10 B");
        assert_eq!(format_size(1536), "1.5 KB");
    }
}
