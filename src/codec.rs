//! Typed value codec shared between the ZooKeeper view and the Kafka
//! subsystem (§4.1). Encodes/decodes the small set of primitive types a
//! `zget`/`zput` literal can carry.

use crate::error::{Error, Result};

/// The tag carried alongside a literal on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bytes,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Json,
}

impl ValueType {
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "bytes" => Ok(ValueType::Bytes),
            "char" => Ok(ValueType::Char),
            "short" => Ok(ValueType::Short),
            "int" => Ok(ValueType::Int),
            "long" => Ok(ValueType::Long),
            "float" => Ok(ValueType::Float),
            "double" => Ok(ValueType::Double),
            "string" | "text" => Ok(ValueType::String),
            "json" => Ok(ValueType::Json),
            other => Err(Error::InvalidType(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Bytes => "bytes",
            ValueType::Char => "char",
            ValueType::Short => "short",
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::Json => "json",
        }
    }
}

/// Encode a literal `text` as `ty` into its wire bytes.
pub fn encode(text: &str, ty: ValueType) -> Result<Vec<u8>> {
    match ty {
        ValueType::Bytes => encode_dotted_hex(text),
        ValueType::Char => {
            let c = text
                .chars()
                .next()
                .ok_or_else(|| Error::InvalidLiteral(text.to_string()))?;
            let unit = c as u16;
            Ok(unit.to_be_bytes().to_vec())
        }
        ValueType::Short => {
            let v: i16 = text
                .parse()
                .map_err(|_| Error::InvalidLiteral(text.to_string()))?;
            Ok(v.to_be_bytes().to_vec())
        }
        ValueType::Int => {
            let v: i32 = text
                .parse()
                .map_err(|_| Error::InvalidLiteral(text.to_string()))?;
            Ok(v.to_be_bytes().to_vec())
        }
        ValueType::Long => {
            let v: i64 = text
                .parse()
                .map_err(|_| Error::InvalidLiteral(text.to_string()))?;
            Ok(v.to_be_bytes().to_vec())
        }
        ValueType::Float => {
            let v: f32 = text
                .parse()
                .map_err(|_| Error::InvalidLiteral(text.to_string()))?;
            Ok(v.to_be_bytes().to_vec())
        }
        ValueType::Double => {
            let v: f64 = text
                .parse()
                .map_err(|_| Error::InvalidLiteral(text.to_string()))?;
            Ok(v.to_be_bytes().to_vec())
        }
        ValueType::String => Ok(unescape(text).into_bytes()),
        ValueType::Json => {
            let value: serde_json::Value = serde_json::from_str(text)
                .map_err(|_| Error::InvalidLiteral(text.to_string()))?;
            let pretty = serde_json::to_string_pretty(&value)
                .map_err(|e| Error::Internal(e.to_string()))?;
            Ok(pretty.into_bytes())
        }
    }
}

/// Decode wire bytes of type `ty` back into a display string.
pub fn decode(bytes: &[u8], ty: ValueType) -> Result<String> {
    match ty {
        ValueType::Bytes => Ok(bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(".")),
        ValueType::Char => {
            let arr: [u8; 2] = bytes
                .try_into()
                .map_err(|_| Error::InvalidLiteral("char requires 2 bytes".to_string()))?;
            let unit = u16::from_be_bytes(arr);
            Ok(char::from_u32(unit as u32)
                .map(|c| c.to_string())
                .unwrap_or_default())
        }
        ValueType::Short => {
            let arr: [u8; 2] = bytes
                .try_into()
                .map_err(|_| Error::InvalidLiteral("short requires 2 bytes".to_string()))?;
            Ok(i16::from_be_bytes(arr).to_string())
        }
        ValueType::Int => {
            let arr: [u8; 4] = bytes
                .try_into()
                .map_err(|_| Error::InvalidLiteral("int requires 4 bytes".to_string()))?;
            Ok(i32::from_be_bytes(arr).to_string())
        }
        ValueType::Long => {
            let arr: [u8; 8] = bytes
                .try_into()
                .map_err(|_| Error::InvalidLiteral("long requires 8 bytes".to_string()))?;
            Ok(i64::from_be_bytes(arr).to_string())
        }
        ValueType::Float => {
            let arr: [u8; 4] = bytes
                .try_into()
                .map_err(|_| Error::InvalidLiteral("float requires 4 bytes".to_string()))?;
            Ok(f32::from_be_bytes(arr).to_string())
        }
        ValueType::Double => {
            let arr: [u8; 8] = bytes
                .try_into()
                .map_err(|_| Error::InvalidLiteral("double requires 8 bytes".to_string()))?;
            Ok(f64::from_be_bytes(arr).to_string())
        }
        ValueType::String => Ok(String::from_utf8_lossy(bytes).to_string()),
        ValueType::Json => {
            let text = String::from_utf8_lossy(bytes);
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|_| Error::InvalidLiteral(text.to_string()))?;
            serde_json::to_string_pretty(&value).map_err(|e| Error::Internal(e.to_string()))
        }
    }
}

fn encode_dotted_hex(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for token in text.split('.') {
        if token.is_empty() {
            return Err(Error::InvalidLiteral(text.to_string()));
        }
        let byte = u8::from_str_radix(token, 16)
            .map_err(|_| Error::InvalidLiteral(text.to_string()))?;
        out.push(byte);
    }
    Ok(out)
}

fn is_dotted_hex(text: &str) -> bool {
    if text.is_empty() || !text.contains('.') {
        return false;
    }
    let tokens: Vec<&str> = text.split('.').collect();
    let shape_ok = tokens
        .iter()
        .all(|tok| !tok.is_empty() && tok.len() <= 2 && tok.chars().all(|c| c.is_ascii_hexdigit()));
    if !shape_ok {
        return false;
    }
    // A run of purely decimal digit groups (e.g. "3.14.15") reads as a
    // version string, not a byte literal; require at least one token that
    // is not all-decimal to treat it as hex.
    tokens.iter().any(|tok| !tok.chars().all(|c| c.is_ascii_digit()))
}

/// Unescape a shell-style string literal: `\n`, `\t`, `\r`, `\\`, `\"`, `\'`
/// are recognized; any other backslash sequence keeps the escaped character
/// literally.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Guess the type of an untagged `zput` literal (§4.1). Order matters:
/// double, then long, then dotted-hex, then string.
pub fn guess_type(text: &str) -> ValueType {
    if is_double(text) && text.contains('.') {
        ValueType::Double
    } else if is_long(text) {
        ValueType::Long
    } else if is_dotted_hex(text) {
        ValueType::Bytes
    } else if is_double(text) {
        ValueType::Double
    } else {
        ValueType::String
    }
}

fn is_long(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

fn is_double(text: &str) -> bool {
    let t = text.strip_prefix('-').unwrap_or(text);
    if t.is_empty() {
        return false;
    }
    let mut parts = t.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next();
    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    match frac_part {
        None => true,
        Some(f) => !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hello", ValueType::String)]
    #[case("short", ValueType::Short)]
    #[case("int", ValueType::Int)]
    #[case("long", ValueType::Long)]
    #[case("float", ValueType::Float)]
    #[case("double", ValueType::Double)]
    #[case("char", ValueType::Char)]
    #[case("json", ValueType::Json)]
    #[case("bytes", ValueType::Bytes)]
    fn parses_known_tags(#[case] tag: &str, #[case] expected: ValueType) {
        assert_eq!(ValueType::parse(tag).unwrap(), expected);
    }

    #[test]
    fn unknown_tag_is_invalid_type() {
        assert!(matches!(ValueType::parse("nope"), Err(Error::InvalidType(_))));
    }

    #[rstest]
    #[case(42i64, ValueType::Long)]
    #[case(-7i64, ValueType::Long)]
    fn long_round_trip(#[case] v: i64, #[case] ty: ValueType) {
        let bytes = encode(&v.to_string(), ty).unwrap();
        assert_eq!(decode(&bytes, ty).unwrap(), v.to_string());
    }

    #[test]
    fn double_round_trip() {
        let bytes = encode("-3.25", ValueType::Double).unwrap();
        assert_eq!(decode(&bytes, ValueType::Double).unwrap(), "-3.25");
    }

    #[test]
    fn string_round_trip_with_escapes() {
        let bytes = encode("hello\\nworld", ValueType::String).unwrap();
        assert_eq!(decode(&bytes, ValueType::String).unwrap(), "hello\nworld");
    }

    #[test]
    fn json_round_trip_is_minified_equivalent() {
        let bytes = encode(r#"{"a":1}"#, ValueType::Json).unwrap();
        let decoded = decode(&bytes, ValueType::Json).unwrap();
        let original: serde_json::Value = serde_json::from_str(r#"{"a":1}"#).unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&decoded).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn bytes_round_trip() {
        let bytes = encode("de.ad.be.ef", ValueType::Bytes).unwrap();
        assert_eq!(bytes, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode(&bytes, ValueType::Bytes).unwrap(), "DE.AD.BE.EF");
    }

    #[rstest]
    #[case("-3.14", ValueType::Double)]
    #[case("42", ValueType::Long)]
    #[case("de.ad.be.ef", ValueType::Bytes)]
    #[case("hello", ValueType::String)]
    fn guesses_expected_type(#[case] text: &str, #[case] expected: ValueType) {
        assert_eq!(guess_type(text), expected);
    }

    #[test]
    fn guess_does_not_panic_on_multi_dot_numeric_and_falls_back_to_string() {
        assert_eq!(guess_type("3.14.15"), ValueType::String);
    }
}
