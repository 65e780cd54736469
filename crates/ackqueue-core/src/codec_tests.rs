use super::*;
use serde::Deserialize;

#[test]
fn test_raw_codec_is_identity() {
    let codec = RawCodec;
    let payload = vec![0u8, 159, 146, 150, 255];

    let encoded = codec.encode(&payload).unwrap();
    assert_eq!(encoded, payload);
    assert_eq!(codec.decode(&encoded).unwrap(), payload);
}

#[test]
fn test_text_codec_roundtrip() {
    let codec = TextCodec;
    let encoded = codec.encode(&"Hello World".to_string()).unwrap();
    assert_eq!(encoded, b"Hello World");
    assert_eq!(codec.decode(&encoded).unwrap(), "Hello World");
}

#[test]
fn test_text_codec_rejects_invalid_utf8() {
    let result = TextCodec.decode(&[0xff, 0xfe]);
    assert!(matches!(result, Err(CodecError::InvalidUtf8)));
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Job {
    id: u32,
    name: String,
}

#[test]
fn test_json_codec_roundtrip() {
    let codec = JsonCodec::<Job>::new();
    let job = Job { id: 7, name: "resize".to_string() };

    let encoded = codec.encode(&job).unwrap();
    assert_eq!(encoded, br#"{"id":7,"name":"resize"}"#);
    assert_eq!(codec.decode(&encoded).unwrap(), job);
}

#[test]
fn test_json_codec_decode_error() {
    let codec = JsonCodec::<Job>::new();
    let result = codec.decode(b"not json");
    assert!(matches!(result, Err(CodecError::Json(_))));
}
