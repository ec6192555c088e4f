//! Go literal and identifier rendering.

/// Quote `value` as a Go interpreted string literal.
///
/// Printable ASCII is kept, the usual escapes are used for tabs, newlines,
/// quotes and backslashes, and every other byte becomes `\xNN`. Multi-byte
/// UTF-8 therefore survives byte for byte.
pub fn go_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for byte in value.bytes() {
        match byte {
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{byte:02x}")),
        }
    }
    out.push('"');
    out
}

/// Go identifier for a Ruby local or parameter.
///
/// Ruby method-style suffixes are not valid in Go identifiers, so they are
/// swapped for look-alike letters.
pub fn local_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| match c {
            '?' => 'ʔ',
            '!' => 'ǃ',
            '=' => 'ǂ',
            c => c,
        })
        .collect();
    format!("µ{mapped}")
}
