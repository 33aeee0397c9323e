const HEX: &[u8; 16] = b"0123456789abcdef";

#[inline]
pub(crate) fn push_json_string_escaped(out: &mut String, value: &str) {
    let bytes = value.as_bytes();
    if bytes.iter().all(|&b| b >= 0x20 && b != b'"' && b != b'\\') {
        out.push('"');
        out.push_str(value);
        out.push('"');
        return;
    }

    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c <= '\u{1f}' => {
                let control = c as u8;
                out.push_str("\\u00");
                out.push(char::from(HEX[(control >> 4) as usize]));
                out.push(char::from(HEX[(control & 0x0f) as usize]));
            }
            _ => out.push(ch),
        }
    }
    out.push('"');
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
