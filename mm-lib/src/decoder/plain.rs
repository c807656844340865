use super::{decode_base64, encode_base64, DecodeStrategy, Envelope, Instruction};
use crate::constant::ENVELOPE_TAG_PLAIN;
use crate::operation::OperationKind;

use anyhow::{anyhow, Result};

/// `base64(0x02 || bcs(Envelope))`
pub struct PlainStrategy;

impl DecodeStrategy for PlainStrategy {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn enabled(&self, _version: i64) -> bool {
        true
    }

    fn decode(&self, memo: &str) -> Option<Instruction> {
        let bytes = decode_base64(memo)?;
        let (tag, body) = bytes.split_first()?;
        if *tag != ENVELOPE_TAG_PLAIN {
            return None;
        }

        let envelope: Envelope = bcs::from_bytes(body).ok()?;
        envelope.into_instruction()
    }
}

pub fn encode_envelope(kind: OperationKind, follow_id: &str, params: &[u8]) -> Result<Vec<u8>> {
    let envelope = Envelope {
        kind: kind.as_u16(),
        follow_id: follow_id.to_string(),
        params: params.to_vec(),
    };
    bcs::to_bytes(&envelope).map_err(|e| anyhow!("Failed to encode envelope: {}", e))
}

pub fn encode(kind: OperationKind, follow_id: &str, params: &[u8]) -> Result<String> {
    let mut bytes = vec![ENVELOPE_TAG_PLAIN];
    bytes.extend(encode_envelope(kind, follow_id, params)?);
    Ok(encode_base64(&bytes))
}
