//! Record decoding seam for the query planner (§4.5). Only a `json` decoder
//! ships by default; any other name resolves to `Error::Internal`, the seam
//! where an Avro-backed implementation would plug in.

use crate::error::{Error, Result};

pub trait RecordDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value>;
}

pub struct JsonRecordDecoder;

impl RecordDecoder for JsonRecordDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value> {
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidLiteral(e.to_string()))
    }
}

pub fn resolve_decoder(name: &str) -> Result<Box<dyn RecordDecoder>> {
    match name {
        "json" => Ok(Box::new(JsonRecordDecoder)),
        other => Err(Error::Internal(format!("unknown decoder: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_decoder_parses_object() {
        let decoder = resolve_decoder("json").unwrap();
        let value = decoder.decode(br#"{"a":1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn unknown_decoder_is_internal_error() {
        assert!(matches!(resolve_decoder("avro"), Err(Error::Internal(_))));
    }
}
