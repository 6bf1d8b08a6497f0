use kshell::codec::{self, ValueType};

#[test]
fn int_round_trips_through_encode_decode() {
    let ty = ValueType::parse("int").unwrap();
    let bytes = codec::encode("-42", ty).unwrap();
    assert_eq!(bytes.len(), 4);
    assert_eq!(codec::decode(&bytes, ty).unwrap(), "-42");
}

#[test]
fn bytes_round_trips_dotted_hex() {
    let ty = ValueType::parse("bytes").unwrap();
    let encoded = codec::encode("DE.AD.BE.EF", ty).unwrap();
    assert_eq!(encoded, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(codec::decode(&encoded, ty).unwrap(), "DE.AD.BE.EF");
}

#[test]
fn json_round_trips_pretty_printed() {
    let ty = ValueType::parse("json").unwrap();
    let encoded = codec::encode(r#"{"a":1}"#, ty).unwrap();
    let decoded = codec::decode(&encoded, ty).unwrap();
    assert!(decoded.contains("\"a\""));
    assert!(decoded.contains('1'));
}

#[test]
fn unknown_type_tag_is_rejected() {
    assert!(ValueType::parse("blob").is_err());
}

#[test]
fn string_encoding_honors_shell_escapes() {
    let ty = ValueType::parse("string").unwrap();
    let encoded = codec::encode(r"hello\tworld", ty).unwrap();
    assert_eq!(String::from_utf8(encoded).unwrap(), "hello\tworld");
}
